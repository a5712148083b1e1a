//! Request/response mapping between `conduit_core::types` and the OpenAI
//! Chat Completions API wire format.
//!
//! Grounded on `neuron-provider-openai::lib`'s `build_request`/`parse_response`:
//! a system prompt becomes a leading `role: "system"` message, tool results
//! become standalone `role: "tool"` messages (not inline content parts —
//! OpenAI uses `role: "tool"` for tool results, not user messages), and
//! assistant tool-use parts are hoisted into the message's `tool_calls`
//! array with JSON-string-encoded arguments.

use conduit_core::{
    CompletedToolCall, ConduitError, ContentPart, FinishReason, GenerateConfig, GenerationResult,
    ImageRef, Message, Role, ToolChoice, ToolDefinition, UsageStats,
};

use crate::types::{
    OpenAiChoice, OpenAiContent, OpenAiContentPart, OpenAiFunction, OpenAiFunctionCall,
    OpenAiImageUrl, OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiTool, OpenAiToolCall,
};

const DEFAULT_MAX_TOKENS: Option<u32> = None;

/// Builds the OpenAI Chat Completions request body.
pub fn to_api_request(
    messages: &[Message],
    model: &str,
    config: &GenerateConfig,
    stream: bool,
) -> Result<OpenAiRequest, ConduitError> {
    Ok(OpenAiRequest {
        model: model.to_string(),
        messages: map_messages(messages)?,
        max_tokens: config.max_tokens.or(DEFAULT_MAX_TOKENS),
        temperature: config.temperature,
        top_p: config.top_p,
        tools: config.tools.iter().map(map_tool).collect(),
        tool_choice: config.tool_choice.as_ref().map(map_tool_choice),
        stop: config.stop_sequences.clone(),
        seed: config.seed,
        stream,
    })
}

fn map_messages(messages: &[Message]) -> Result<Vec<OpenAiMessage>, ConduitError> {
    let mut out = Vec::new();
    for message in messages {
        match message.role {
            Role::System => out.push(OpenAiMessage {
                role: "system".to_string(),
                content: Some(OpenAiContent::Text(message.text())),
                tool_calls: None,
                tool_call_id: None,
            }),
            Role::User => map_user_message(message, &mut out)?,
            Role::Tool => map_tool_role_message(message, &mut out),
            Role::Assistant => map_assistant_message(message, &mut out)?,
        }
    }
    Ok(out)
}

/// `conduit_core::Role::Tool` carries its own role variant (unlike
/// `neuron_types`, where tool results arrive as `Role::User` messages);
/// both map to OpenAI's `role: "tool"`.
fn map_tool_role_message(message: &Message, out: &mut Vec<OpenAiMessage>) {
    for part in &message.content {
        if let ContentPart::ToolResult {
            tool_call_id,
            content,
            ..
        } = part
        {
            out.push(OpenAiMessage {
                role: "tool".to_string(),
                content: Some(OpenAiContent::Text(content.clone())),
                tool_calls: None,
                tool_call_id: Some(tool_call_id.clone()),
            });
        }
    }
}

fn map_user_message(message: &Message, out: &mut Vec<OpenAiMessage>) -> Result<(), ConduitError> {
    let mut tool_results = Vec::new();
    let mut other_parts = Vec::new();
    for part in &message.content {
        match part {
            ContentPart::ToolResult {
                tool_call_id,
                content,
                ..
            } => tool_results.push((tool_call_id.clone(), content.clone())),
            other => other_parts.push(other),
        }
    }

    for (tool_call_id, content) in tool_results {
        out.push(OpenAiMessage {
            role: "tool".to_string(),
            content: Some(OpenAiContent::Text(content)),
            tool_calls: None,
            tool_call_id: Some(tool_call_id),
        });
    }

    if !other_parts.is_empty() {
        out.push(OpenAiMessage {
            role: "user".to_string(),
            content: Some(parts_to_openai_content(&other_parts)?),
            tool_calls: None,
            tool_call_id: None,
        });
    }
    Ok(())
}

fn map_assistant_message(
    message: &Message,
    out: &mut Vec<OpenAiMessage>,
) -> Result<(), ConduitError> {
    let mut tool_calls = Vec::new();
    let mut text_parts = Vec::new();
    for part in &message.content {
        match part {
            ContentPart::ToolCall {
                id,
                name,
                arguments,
            } => tool_calls.push(OpenAiToolCall {
                id: id.clone(),
                call_type: "function".to_string(),
                function: OpenAiFunctionCall {
                    name: name.clone(),
                    arguments: arguments.to_string(),
                },
            }),
            other => text_parts.push(other),
        }
    }

    let content = if text_parts.is_empty() {
        None
    } else {
        Some(parts_to_openai_content(&text_parts)?)
    };

    out.push(OpenAiMessage {
        role: "assistant".to_string(),
        content,
        tool_calls: if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        },
        tool_call_id: None,
    });
    Ok(())
}

fn parts_to_openai_content(parts: &[&ContentPart]) -> Result<OpenAiContent, ConduitError> {
    if let [ContentPart::Text(text)] = parts {
        return Ok(OpenAiContent::Text(text.clone()));
    }
    let mapped = parts
        .iter()
        .map(|part| content_part_to_openai_part(part))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(OpenAiContent::Parts(mapped))
}

fn content_part_to_openai_part(part: &ContentPart) -> Result<OpenAiContentPart, ConduitError> {
    match part {
        ContentPart::Text(text) => Ok(OpenAiContentPart::Text { text: text.clone() }),
        ContentPart::Image(image_ref) => Ok(OpenAiContentPart::ImageUrl {
            image_url: OpenAiImageUrl {
                url: match image_ref {
                    ImageRef::Url { url } => url.clone(),
                    ImageRef::Base64 { media_type, data } => {
                        format!("data:{media_type};base64,{data}")
                    }
                },
            },
        }),
        ContentPart::Audio(_) => Err(ConduitError::InvalidInput(
            "OpenAI Chat Completions does not accept audio content parts".to_string(),
        )),
        ContentPart::Blob { media_type, .. } => Err(ConduitError::InvalidInput(format!(
            "OpenAI Chat Completions cannot accept blob content of type {media_type}"
        ))),
        ContentPart::ToolCall { .. } | ContentPart::ToolResult { .. } => Err(
            ConduitError::InvalidInput("tool parts must not appear in plain content".to_string()),
        ),
    }
}

fn map_tool(tool: &ToolDefinition) -> OpenAiTool {
    OpenAiTool {
        tool_type: "function".to_string(),
        function: OpenAiFunction {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.input_schema.clone(),
        },
    }
}

fn map_tool_choice(choice: &ToolChoice) -> serde_json::Value {
    match choice {
        ToolChoice::Auto => serde_json::json!("auto"),
        ToolChoice::None => serde_json::json!("none"),
        ToolChoice::Required => serde_json::json!("required"),
        ToolChoice::ByName(name) => {
            serde_json::json!({ "type": "function", "function": { "name": name } })
        }
    }
}

/// Parses an OpenAI Chat Completions response into a `GenerationResult`.
///
/// `duration` is supplied by the caller, which owns the request timer.
pub fn from_api_response(
    response: OpenAiResponse,
    duration: std::time::Duration,
) -> Result<GenerationResult, ConduitError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ConduitError::ParseFailed("no choices in response".to_string()))?;

    let (text, tool_calls) = parse_choice_message(choice.message)?;
    let finish_reason = parse_finish_reason(&choice.finish_reason);
    let usage = parse_usage(&response.usage);

    Ok(GenerationResult {
        text,
        total_tokens: Some(usage.total_tokens()),
        duration,
        finish_reason,
        usage: Some(usage),
        tool_calls,
        reasoning: None,
    })
}

fn parse_choice_message(
    message: OpenAiMessage,
) -> Result<(String, Vec<CompletedToolCall>), ConduitError> {
    let mut text = String::new();
    if let Some(content) = message.content {
        match content {
            OpenAiContent::Text(t) => text.push_str(&t),
            OpenAiContent::Parts(parts) => {
                for part in parts {
                    if let OpenAiContentPart::Text { text: t } = part {
                        text.push_str(&t);
                    }
                }
            }
        }
    }

    let mut tool_calls = Vec::new();
    for tc in message.tool_calls.into_iter().flatten() {
        let arguments: serde_json::Value =
            serde_json::from_str(&tc.function.arguments).unwrap_or(serde_json::Value::Null);
        tool_calls.push(CompletedToolCall {
            id: tc.id,
            name: tc.function.name,
            arguments,
        });
    }

    Ok((text, tool_calls))
}

fn parse_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "tool_calls" => FinishReason::ToolCall,
        "length" => FinishReason::MaxTokens,
        "content_filter" => FinishReason::ContentFilter,
        "stop" => FinishReason::Stop,
        _ => FinishReason::Stop,
    }
}

fn parse_usage(usage: &crate::types::OpenAiUsage) -> UsageStats {
    UsageStats {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        cached_tokens: usage
            .prompt_tokens_details
            .as_ref()
            .and_then(|d| d.cached_tokens),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(prompt: u32, completion: u32) -> crate::types::OpenAiUsage {
        crate::types::OpenAiUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            prompt_tokens_details: None,
        }
    }

    #[test]
    fn system_message_becomes_leading_system_role() {
        let messages = vec![Message::system("Be concise."), Message::user("Hi")];
        let req = to_api_request(&messages, "gpt-4o-mini", &GenerateConfig::default(), false).unwrap();
        assert_eq!(req.messages[0].role, "system");
        assert_eq!(req.messages.len(), 2);
    }

    #[test]
    fn tool_result_message_becomes_tool_role() {
        let messages = vec![Message::tool("call_1", "42")];
        let req = to_api_request(&messages, "gpt-4o-mini", &GenerateConfig::default(), false).unwrap();
        assert_eq!(req.messages[0].role, "tool");
        assert_eq!(req.messages[0].tool_call_id, Some("call_1".to_string()));
    }

    #[test]
    fn assistant_tool_call_is_json_encoded() {
        let mut msg = Message::assistant("ignored");
        msg.content = vec![ContentPart::ToolCall {
            id: "call_1".into(),
            name: "search".into(),
            arguments: serde_json::json!({"q": "rust"}),
        }];
        let req = to_api_request(&[msg], "gpt-4o-mini", &GenerateConfig::default(), false).unwrap();
        let tool_calls = req.messages[0].tool_calls.as_ref().unwrap();
        assert_eq!(tool_calls[0].function.name, "search");
        assert!(tool_calls[0].function.arguments.contains("rust"));
    }

    #[test]
    fn audio_content_part_is_rejected() {
        let mut msg = Message::user("ignored");
        msg.content = vec![ContentPart::Audio(conduit_core::AudioRef::Url {
            url: "http://example.com/a.wav".into(),
        })];
        let err = to_api_request(&[msg], "gpt-4o-mini", &GenerateConfig::default(), false).unwrap_err();
        assert!(matches!(err, ConduitError::InvalidInput(_)));
    }

    #[test]
    fn tool_choice_by_name_maps_to_function_object() {
        let config = GenerateConfig::default().with_tool_choice(ToolChoice::ByName("search".into()));
        let req = to_api_request(&[Message::user("hi")], "gpt-4o-mini", &config, false).unwrap();
        let choice = req.tool_choice.unwrap();
        assert_eq!(choice["type"], "function");
        assert_eq!(choice["function"]["name"], "search");
    }

    #[test]
    fn parses_text_response() {
        let response = OpenAiResponse {
            choices: vec![OpenAiChoice {
                message: OpenAiMessage {
                    role: "assistant".to_string(),
                    content: Some(OpenAiContent::Text("Hello!".to_string())),
                    tool_calls: None,
                    tool_call_id: None,
                },
                finish_reason: "stop".to_string(),
            }],
            usage: usage(10, 5),
        };
        let result = from_api_response(response, std::time::Duration::from_secs(1)).unwrap();
        assert_eq!(result.text, "Hello!");
        assert_eq!(result.finish_reason, FinishReason::Stop);
    }

    #[test]
    fn parses_tool_call_response() {
        let response = OpenAiResponse {
            choices: vec![OpenAiChoice {
                message: OpenAiMessage {
                    role: "assistant".to_string(),
                    content: None,
                    tool_calls: Some(vec![OpenAiToolCall {
                        id: "call_1".to_string(),
                        call_type: "function".to_string(),
                        function: OpenAiFunctionCall {
                            name: "search".to_string(),
                            arguments: r#"{"q":"rust"}"#.to_string(),
                        },
                    }]),
                    tool_call_id: None,
                },
                finish_reason: "tool_calls".to_string(),
            }],
            usage: usage(10, 5),
        };
        let result = from_api_response(response, std::time::Duration::from_secs(1)).unwrap();
        assert_eq!(result.finish_reason, FinishReason::ToolCall);
        assert_eq!(result.tool_calls[0].name, "search");
    }

    #[test]
    fn missing_choices_fails_with_parse_failed() {
        let response = OpenAiResponse {
            choices: vec![],
            usage: usage(0, 0),
        };
        let err = from_api_response(response, std::time::Duration::from_secs(0)).unwrap_err();
        assert!(matches!(err, ConduitError::ParseFailed(_)));
    }
}

//! Request/response mapping between `conduit_core::types` and the Ollama
//! `/api/chat` wire format.
//!
//! Grounded on `neuron-provider-ollama::mapping`'s `to_api_request`/
//! `from_api_response`. Ollama has no distinct system-prompt field in the
//! request; a system message is just a leading `role: "system"` entry in
//! the same array (`conduit_core::Role::System` already covers this, so
//! there is no separate system-prompt hoisting step needed here).

use conduit_core::{
    CompletedToolCall, ConduitError, ContentPart, FinishReason, GenerateConfig, GenerationResult,
    Message, Role, ToolDefinition, UsageStats,
};

use crate::types::{
    OllamaFunction, OllamaFunctionCall, OllamaMessage, OllamaOptions, OllamaRequest, OllamaResponse,
    OllamaTool, OllamaToolCall,
};

/// Builds the Ollama `/api/chat` request body.
///
/// `tool_choice` and `response_schema` have no Ollama equivalent and are
/// silently dropped: Ollama has no `tool_choice` parameter, and ignores
/// unknown request fields gracefully rather than rejecting them.
pub fn to_api_request(
    messages: &[Message],
    model: &str,
    config: &GenerateConfig,
    keep_alive: Option<&str>,
    stream: bool,
) -> Result<OllamaRequest, ConduitError> {
    Ok(OllamaRequest {
        model: model.to_string(),
        messages: map_messages(messages)?,
        stream,
        tools: config.tools.iter().map(map_tool).collect(),
        keep_alive: keep_alive.map(str::to_string),
        options: Some(map_options(config)),
    })
}

fn map_options(config: &GenerateConfig) -> OllamaOptions {
    OllamaOptions {
        temperature: Some(f64::from(config.temperature)),
        num_predict: config.max_tokens,
        top_p: Some(f64::from(config.top_p)),
        top_k: config.top_k,
        seed: config.seed,
        stop: config.stop_sequences.clone(),
    }
}

fn map_messages(messages: &[Message]) -> Result<Vec<OllamaMessage>, ConduitError> {
    let mut out = Vec::new();
    for message in messages {
        match message.role {
            Role::System => out.push(OllamaMessage {
                role: "system".to_string(),
                content: Some(message.text()),
                tool_calls: None,
            }),
            Role::User => map_user_message(message, &mut out)?,
            Role::Tool => map_tool_role_message(message, &mut out),
            Role::Assistant => map_assistant_message(message, &mut out)?,
        }
    }
    Ok(out)
}

/// `conduit_core::Role::Tool` carries its own role variant; both it and a
/// `ToolResult` part embedded in a `User` message map to Ollama's
/// `role: "tool"` (Ollama, like OpenAI, has no `tool_call_id` field on tool
/// messages -- the result is matched back to its call by position).
fn map_tool_role_message(message: &Message, out: &mut Vec<OllamaMessage>) {
    for part in &message.content {
        if let ContentPart::ToolResult { content, .. } = part {
            out.push(OllamaMessage {
                role: "tool".to_string(),
                content: Some(content.clone()),
                tool_calls: None,
            });
        }
    }
}

fn map_user_message(message: &Message, out: &mut Vec<OllamaMessage>) -> Result<(), ConduitError> {
    let mut tool_results = Vec::new();
    let mut text = String::new();
    for part in &message.content {
        match part {
            ContentPart::ToolResult { content, .. } => tool_results.push(content.clone()),
            ContentPart::Text(t) => text.push_str(t),
            ContentPart::Image(_) | ContentPart::Audio(_) | ContentPart::Blob { .. } => {
                return Err(ConduitError::InvalidInput(
                    "Ollama's chat API does not accept media content parts in this mapping"
                        .to_string(),
                ));
            }
            ContentPart::ToolCall { .. } => {
                return Err(ConduitError::InvalidInput(
                    "tool calls must not appear in a user message".to_string(),
                ));
            }
        }
    }

    for content in tool_results {
        out.push(OllamaMessage {
            role: "tool".to_string(),
            content: Some(content),
            tool_calls: None,
        });
    }

    if !text.is_empty() {
        out.push(OllamaMessage {
            role: "user".to_string(),
            content: Some(text),
            tool_calls: None,
        });
    }
    Ok(())
}

fn map_assistant_message(
    message: &Message,
    out: &mut Vec<OllamaMessage>,
) -> Result<(), ConduitError> {
    let mut tool_calls = Vec::new();
    let mut text = String::new();
    for part in &message.content {
        match part {
            ContentPart::ToolCall { name, arguments, .. } => tool_calls.push(OllamaToolCall {
                function: OllamaFunctionCall {
                    name: name.clone(),
                    arguments: arguments.clone(),
                },
            }),
            ContentPart::Text(t) => text.push_str(t),
            _ => {}
        }
    }

    out.push(OllamaMessage {
        role: "assistant".to_string(),
        content: if text.is_empty() { None } else { Some(text) },
        tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
    });
    Ok(())
}

fn map_tool(tool: &ToolDefinition) -> OllamaTool {
    OllamaTool {
        tool_type: "function".to_string(),
        function: OllamaFunction {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.input_schema.clone(),
        },
    }
}

/// Parses an Ollama `/api/chat` response into a `GenerationResult`.
///
/// `duration` is supplied by the caller, which owns the request timer --
/// Ollama's own `total_duration` field is in nanoseconds from model load,
/// not wall-clock HTTP round trip, so it is not a substitute.
pub fn from_api_response(
    response: OllamaResponse,
    duration: std::time::Duration,
) -> Result<GenerationResult, ConduitError> {
    let text = response.message.content.clone().unwrap_or_default();
    let tool_calls = parse_tool_calls(&response.message);
    let finish_reason = parse_finish_reason(response.done_reason.as_deref(), !tool_calls.is_empty());
    let usage = parse_usage(&response);

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

fn parse_tool_calls(message: &OllamaMessage) -> Vec<CompletedToolCall> {
    message
        .tool_calls
        .iter()
        .flatten()
        .map(|tc| CompletedToolCall {
            // Ollama assigns no id to tool calls; synthesize one so
            // downstream tool-result correlation has something to match on.
            id: format!("ollama_{}", uuid::Uuid::new_v4()),
            name: tc.function.name.clone(),
            arguments: tc.function.arguments.clone(),
        })
        .collect()
}

fn parse_finish_reason(done_reason: Option<&str>, has_tool_calls: bool) -> FinishReason {
    match done_reason {
        Some("length") => FinishReason::MaxTokens,
        _ if has_tool_calls => FinishReason::ToolCall,
        _ => FinishReason::Stop,
    }
}

fn parse_usage(response: &OllamaResponse) -> UsageStats {
    UsageStats {
        prompt_tokens: response.prompt_eval_count.unwrap_or(0) as u32,
        completion_tokens: response.eval_count.unwrap_or(0) as u32,
        cached_tokens: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::ToolChoice;

    #[test]
    fn system_message_becomes_leading_system_role() {
        let messages = vec![Message::system("Be concise."), Message::user("Hi")];
        let req = to_api_request(&messages, "llama3.2", &GenerateConfig::default(), None, false).unwrap();
        assert_eq!(req.messages[0].role, "system");
        assert_eq!(req.messages.len(), 2);
    }

    #[test]
    fn tool_result_message_becomes_tool_role() {
        let messages = vec![Message::tool("call_1", "42")];
        let req = to_api_request(&messages, "llama3.2", &GenerateConfig::default(), None, false).unwrap();
        assert_eq!(req.messages[0].role, "tool");
        assert_eq!(req.messages[0].content.as_deref(), Some("42"));
    }

    #[test]
    fn assistant_tool_call_keeps_arguments_as_json_object() {
        let mut msg = Message::assistant("ignored");
        msg.content = vec![ContentPart::ToolCall {
            id: "call_1".into(),
            name: "search".into(),
            arguments: serde_json::json!({"q": "rust"}),
        }];
        let req = to_api_request(&[msg], "llama3.2", &GenerateConfig::default(), None, false).unwrap();
        let tool_calls = req.messages[0].tool_calls.as_ref().unwrap();
        assert_eq!(tool_calls[0].function.arguments["q"], "rust");
    }

    #[test]
    fn image_content_part_is_rejected() {
        let mut msg = Message::user("ignored");
        msg.content = vec![ContentPart::Image(conduit_core::ImageRef::Url {
            url: "http://example.com/a.png".into(),
        })];
        let err = to_api_request(&[msg], "llama3.2", &GenerateConfig::default(), None, false).unwrap_err();
        assert!(matches!(err, ConduitError::InvalidInput(_)));
    }

    #[test]
    fn tool_choice_is_silently_dropped() {
        let config = GenerateConfig::default().with_tool_choice(ToolChoice::ByName("search".into()));
        // Should not error; Ollama has no field for this.
        let req = to_api_request(&[Message::user("hi")], "llama3.2", &config, None, false).unwrap();
        assert_eq!(req.model, "llama3.2");
    }

    #[test]
    fn keep_alive_is_forwarded() {
        let req = to_api_request(
            &[Message::user("hi")],
            "llama3.2",
            &GenerateConfig::default(),
            Some("5m"),
            false,
        )
        .unwrap();
        assert_eq!(req.keep_alive.as_deref(), Some("5m"));
    }

    #[test]
    fn parses_text_response() {
        let response = OllamaResponse {
            model: "llama3.2".to_string(),
            message: OllamaMessage {
                role: "assistant".to_string(),
                content: Some("Hello!".to_string()),
                tool_calls: None,
            },
            done_reason: Some("stop".to_string()),
            prompt_eval_count: Some(10),
            eval_count: Some(5),
        };
        let result = from_api_response(response, std::time::Duration::from_secs(1)).unwrap();
        assert_eq!(result.text, "Hello!");
        assert_eq!(result.finish_reason, FinishReason::Stop);
        assert_eq!(result.usage.unwrap().total_tokens(), 15);
    }

    #[test]
    fn parses_tool_call_response_and_synthesizes_ids() {
        let response = OllamaResponse {
            model: "llama3.2".to_string(),
            message: OllamaMessage {
                role: "assistant".to_string(),
                content: None,
                tool_calls: Some(vec![OllamaToolCall {
                    function: OllamaFunctionCall {
                        name: "search".to_string(),
                        arguments: serde_json::json!({"q": "rust"}),
                    },
                }]),
            },
            done_reason: None,
            prompt_eval_count: Some(10),
            eval_count: Some(5),
        };
        let result = from_api_response(response, std::time::Duration::from_secs(1)).unwrap();
        assert_eq!(result.finish_reason, FinishReason::ToolCall);
        assert_eq!(result.tool_calls[0].name, "search");
        assert!(result.tool_calls[0].id.starts_with("ollama_"));
    }

    #[test]
    fn max_tokens_done_reason_maps_to_max_tokens() {
        let response = OllamaResponse {
            model: "llama3.2".to_string(),
            message: OllamaMessage {
                role: "assistant".to_string(),
                content: Some("partial".to_string()),
                tool_calls: None,
            },
            done_reason: Some("length".to_string()),
            prompt_eval_count: Some(10),
            eval_count: Some(256),
        };
        let result = from_api_response(response, std::time::Duration::from_secs(1)).unwrap();
        assert_eq!(result.finish_reason, FinishReason::MaxTokens);
    }
}

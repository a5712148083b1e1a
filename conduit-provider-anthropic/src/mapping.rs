//! Request/response mapping between `conduit_core::types` and the Anthropic
//! Messages API wire format.
//!
//! Grounded on `neuron-provider-anthropic::mapping`, adapted from
//! `neuron_types::{Message, ContentBlock}` to `conduit_core::{Message,
//! ContentPart}`.
//!
//! Reference: <https://docs.anthropic.com/en/api/messages>

use conduit_core::{
    CompletedToolCall, ConduitError, ContentPart, FinishReason, GenerateConfig, GenerationResult,
    ImageRef, Message, Role, ToolChoice, ToolDefinition, UsageStats,
};

/// The max_tokens Anthropic requires but `GenerateConfig` leaves optional.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Build the Anthropic Messages API request body. `stream` controls the
/// `"stream"` field; callers add it last since it is orthogonal to the rest
/// of the mapping.
#[must_use]
pub fn to_api_request(
    messages: &[Message],
    model: &str,
    config: &GenerateConfig,
    stream: bool,
) -> Result<serde_json::Value, ConduitError> {
    let system_text = system_prompt_text(messages);
    let mapped_messages = map_messages(messages)?;

    let mut body = serde_json::json!({
        "model": model,
        "messages": mapped_messages,
        "max_tokens": config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        "temperature": config.temperature,
        "top_p": config.top_p,
        "stream": stream,
    });

    if let Some(system) = system_text {
        body["system"] = serde_json::Value::String(system);
    }
    if let Some(top_k) = config.top_k {
        body["top_k"] = serde_json::Value::from(top_k);
    }
    if !config.stop_sequences.is_empty() {
        body["stop_sequences"] = serde_json::Value::from(config.stop_sequences.clone());
    }
    if !config.tools.is_empty() {
        body["tools"] = serde_json::Value::Array(config.tools.iter().map(map_tool).collect());
    }
    if let Some(choice) = &config.tool_choice {
        body["tool_choice"] = map_tool_choice(choice);
    }

    Ok(body)
}

/// Anthropic carries the system prompt as a top-level field, not inline in
/// `messages`. Concatenates every leading/embedded `Role::System` message's
/// text, in order.
fn system_prompt_text(messages: &[Message]) -> Option<String> {
    let text = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(Message::text)
        .collect::<Vec<_>>()
        .join("\n\n");
    if text.is_empty() { None } else { Some(text) }
}

fn map_messages(messages: &[Message]) -> Result<Vec<serde_json::Value>, ConduitError> {
    messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| {
            let role = match m.role {
                Role::User | Role::Tool => "user",
                Role::Assistant => "assistant",
                Role::System => unreachable!("filtered above"),
            };
            let content = map_content_parts(&m.content)?;
            Ok(serde_json::json!({ "role": role, "content": content }))
        })
        .collect()
}

fn map_content_parts(parts: &[ContentPart]) -> Result<Vec<serde_json::Value>, ConduitError> {
    parts.iter().map(map_content_part).collect()
}

fn map_content_part(part: &ContentPart) -> Result<serde_json::Value, ConduitError> {
    match part {
        ContentPart::Text(text) => Ok(serde_json::json!({ "type": "text", "text": text })),
        ContentPart::Image(image_ref) => Ok(serde_json::json!({
            "type": "image",
            "source": map_image_source(image_ref),
        })),
        ContentPart::Audio(_) => Err(ConduitError::InvalidInput(
            "Anthropic does not accept audio content parts".to_string(),
        )),
        ContentPart::Blob { media_type, data } => {
            if media_type == "application/pdf" {
                Ok(serde_json::json!({
                    "type": "document",
                    "source": { "type": "base64", "media_type": media_type, "data": data },
                }))
            } else {
                Err(ConduitError::InvalidInput(format!(
                    "Anthropic cannot accept blob content of type {media_type}"
                )))
            }
        }
        ContentPart::ToolCall {
            id,
            name,
            arguments,
        } => Ok(serde_json::json!({
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": arguments,
        })),
        ContentPart::ToolResult {
            tool_call_id,
            content,
            is_error,
        } => Ok(serde_json::json!({
            "type": "tool_result",
            "tool_use_id": tool_call_id,
            "content": content,
            "is_error": is_error,
        })),
    }
}

fn map_image_source(image_ref: &ImageRef) -> serde_json::Value {
    match image_ref {
        ImageRef::Base64 { media_type, data } => serde_json::json!({
            "type": "base64",
            "media_type": media_type,
            "data": data,
        }),
        ImageRef::Url { url } => serde_json::json!({ "type": "url", "url": url }),
    }
}

fn map_tool(tool: &ToolDefinition) -> serde_json::Value {
    serde_json::json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.input_schema,
    })
}

fn map_tool_choice(choice: &ToolChoice) -> serde_json::Value {
    match choice {
        ToolChoice::Auto => serde_json::json!({ "type": "auto" }),
        ToolChoice::None => serde_json::json!({ "type": "none" }),
        ToolChoice::Required => serde_json::json!({ "type": "any" }),
        ToolChoice::ByName(name) => serde_json::json!({ "type": "tool", "name": name }),
    }
}

/// Parses an Anthropic Messages API response body into a `GenerationResult`.
///
/// `duration` is supplied by the caller, which owns the request timer; the
/// wire response carries no timing information.
pub fn from_api_response(
    body: &serde_json::Value,
    duration: std::time::Duration,
) -> Result<GenerationResult, ConduitError> {
    let content = body["content"]
        .as_array()
        .ok_or_else(|| ConduitError::ParseFailed("missing 'content' array".to_string()))?;

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for block in content {
        match block["type"].as_str() {
            Some("text") => {
                text.push_str(block["text"].as_str().unwrap_or_default());
            }
            Some("tool_use") => {
                let id = block["id"]
                    .as_str()
                    .ok_or_else(|| {
                        ConduitError::ParseFailed("tool_use block missing 'id'".to_string())
                    })?
                    .to_string();
                let name = block["name"]
                    .as_str()
                    .ok_or_else(|| {
                        ConduitError::ParseFailed("tool_use block missing 'name'".to_string())
                    })?
                    .to_string();
                tool_calls.push(CompletedToolCall {
                    id,
                    name,
                    arguments: block["input"].clone(),
                });
            }
            _ => {}
        }
    }

    let usage = parse_usage(&body["usage"]);
    let finish_reason = body["stop_reason"]
        .as_str()
        .map(parse_stop_reason)
        .unwrap_or(FinishReason::Stop);

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

fn parse_usage(usage: &serde_json::Value) -> UsageStats {
    UsageStats {
        prompt_tokens: usage["input_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: usage["output_tokens"].as_u64().unwrap_or(0) as u32,
        cached_tokens: usage["cache_read_input_tokens"].as_u64().map(|n| n as u32),
    }
}

fn parse_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "tool_use" => FinishReason::ToolCall,
        "max_tokens" => FinishReason::MaxTokens,
        "stop_sequence" => FinishReason::StopSequence,
        _ => FinishReason::Stop,
    }
}

//! Decodes Anthropic Messages API streaming events into `RawDelta`s.
//!
//! Grounded on `neuron-provider-anthropic::streaming`'s event dispatch table
//! (`content_block_start`/`content_block_delta`/`content_block_stop`/
//! `message_delta`/`message_stop`), but without that module's line-buffering
//! and event-accumulation bookkeeping — `conduit_sse::SseParser` already
//! dispatches fully-formed `SseEvent`s, so this only maps one event to zero
//! or more deltas.

use conduit_core::{ConduitError, FinishReason, UsageStats};
use conduit_sse::SseEvent;
use conduit_streaming::{ChunkDecoder, RawDelta};
use std::collections::HashSet;

/// `conduit_streaming::ChunkDecoder` for the Anthropic Messages API SSE
/// format.
#[derive(Debug, Default)]
pub struct AnthropicChunkDecoder {
    /// Content-block indices that are `tool_use` blocks, so a
    /// `content_block_stop` knows whether to emit `ToolCallEnd`.
    tool_use_blocks: HashSet<usize>,
}

impl AnthropicChunkDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChunkDecoder for AnthropicChunkDecoder {
    fn decode_event(&mut self, event: &SseEvent) -> Vec<RawDelta> {
        match event.event.as_str() {
            "content_block_start" => self.handle_content_block_start(event),
            "content_block_delta" => self.handle_content_block_delta(event),
            "content_block_stop" => self.handle_content_block_stop(event),
            "message_delta" => self.handle_message_delta(event),
            "error" => self.handle_error(event),
            // "message_start", "message_stop", "ping" carry no assembler-relevant data.
            _ => Vec::new(),
        }
    }
}

impl AnthropicChunkDecoder {
    fn handle_content_block_start(&mut self, event: &SseEvent) -> Vec<RawDelta> {
        let Ok(data) = serde_json::from_str::<serde_json::Value>(&event.data) else {
            return Vec::new();
        };
        let Some(index) = data["index"].as_u64().map(|n| n as usize) else {
            return Vec::new();
        };
        let block = &data["content_block"];
        if block["type"].as_str() == Some("tool_use") {
            self.tool_use_blocks.insert(index);
            let id = block["id"].as_str().unwrap_or_default().to_string();
            let name = block["name"].as_str().unwrap_or_default().to_string();
            vec![RawDelta::ToolCallStart { index, id, name }]
        } else {
            Vec::new()
        }
    }

    fn handle_content_block_delta(&mut self, event: &SseEvent) -> Vec<RawDelta> {
        let Ok(data) = serde_json::from_str::<serde_json::Value>(&event.data) else {
            return Vec::new();
        };
        let Some(index) = data["index"].as_u64().map(|n| n as usize) else {
            return Vec::new();
        };
        let delta = &data["delta"];
        match delta["type"].as_str() {
            Some("text_delta") => {
                let text = delta["text"].as_str().unwrap_or_default().to_string();
                vec![RawDelta::Text(text)]
            }
            Some("input_json_delta") => {
                let partial_json = delta["partial_json"].as_str().unwrap_or_default().to_string();
                vec![RawDelta::ToolCallArgumentsDelta {
                    index,
                    partial_json,
                }]
            }
            // thinking_delta / signature_delta: conduit's streaming chunk model
            // carries no reasoning-delta field, so these are dropped in the
            // streaming path. Non-streaming `generate()` still surfaces
            // reasoning via `GenerationResult.reasoning`.
            _ => Vec::new(),
        }
    }

    fn handle_content_block_stop(&mut self, event: &SseEvent) -> Vec<RawDelta> {
        let Ok(data) = serde_json::from_str::<serde_json::Value>(&event.data) else {
            return Vec::new();
        };
        let Some(index) = data["index"].as_u64().map(|n| n as usize) else {
            return Vec::new();
        };
        if self.tool_use_blocks.remove(&index) {
            vec![RawDelta::ToolCallEnd { index }]
        } else {
            Vec::new()
        }
    }

    fn handle_message_delta(&mut self, event: &SseEvent) -> Vec<RawDelta> {
        let Ok(data) = serde_json::from_str::<serde_json::Value>(&event.data) else {
            return Vec::new();
        };
        let mut deltas = Vec::new();
        if let Some(usage) = data["usage"].as_object() {
            deltas.push(RawDelta::Usage(UsageStats {
                prompt_tokens: usage.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                completion_tokens: usage
                    .get("output_tokens")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as u32,
                cached_tokens: usage
                    .get("cache_read_input_tokens")
                    .and_then(|v| v.as_u64())
                    .map(|n| n as u32),
            }));
        }
        if let Some(stop_reason) = data["delta"]["stop_reason"].as_str() {
            deltas.push(RawDelta::Finish(match stop_reason {
                "tool_use" => FinishReason::ToolCall,
                "max_tokens" => FinishReason::MaxTokens,
                "stop_sequence" => FinishReason::StopSequence,
                _ => FinishReason::Stop,
            }));
        }
        deltas
    }

    fn handle_error(&mut self, event: &SseEvent) -> Vec<RawDelta> {
        let message = serde_json::from_str::<serde_json::Value>(&event.data)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| "Anthropic streaming error event".to_string());
        vec![RawDelta::Error(ConduitError::ServerError {
            status_code: 0,
            message: Some(message),
        })]
    }
}

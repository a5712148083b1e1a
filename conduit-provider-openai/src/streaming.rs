//! Decodes OpenAI Chat Completions streaming events into `RawDelta`s.
//!
//! OpenAI's streaming format is simpler than Anthropic's: each SSE event's
//! `data` is a full `chat.completion.chunk` object carrying
//! `choices[0].delta`, with no precedent in `neuron-provider-openai`
//! (which has no streaming support) — built following the same
//! `conduit_streaming::ChunkDecoder` shape as `conduit-provider-anthropic`'s
//! decoder, per OpenAI's documented chunk format.

use conduit_core::{ConduitError, FinishReason, UsageStats};
use conduit_sse::SseEvent;
use conduit_streaming::{ChunkDecoder, RawDelta};

/// `conduit_streaming::ChunkDecoder` for the OpenAI Chat Completions SSE
/// format.
#[derive(Debug, Default)]
pub struct OpenAiChunkDecoder {
    /// Tool call indices seen so far, to know which ones need a
    /// `ToolCallEnd` synthesized once the stream's `finish_reason` arrives.
    open_tool_calls: Vec<usize>,
}

impl OpenAiChunkDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChunkDecoder for OpenAiChunkDecoder {
    fn decode_event(&mut self, event: &SseEvent) -> Vec<RawDelta> {
        if event.data == "[DONE]" {
            return Vec::new();
        }
        let Ok(data) = serde_json::from_str::<serde_json::Value>(&event.data) else {
            return Vec::new();
        };

        let mut deltas = Vec::new();
        if let Some(choice) = data["choices"].get(0) {
            deltas.extend(self.decode_delta(&choice["delta"]));
            if let Some(reason) = choice["finish_reason"].as_str() {
                deltas.extend(self.finish_open_tool_calls());
                deltas.push(RawDelta::Finish(parse_finish_reason(reason)));
            }
        }
        if let Some(usage) = data.get("usage").filter(|u| !u.is_null()) {
            deltas.push(RawDelta::Usage(parse_usage(usage)));
        }
        deltas
    }
}

impl OpenAiChunkDecoder {
    fn decode_delta(&mut self, delta: &serde_json::Value) -> Vec<RawDelta> {
        let mut deltas = Vec::new();
        if let Some(text) = delta["content"].as_str() {
            deltas.push(RawDelta::Text(text.to_string()));
        }
        if let Some(tool_calls) = delta["tool_calls"].as_array() {
            for tc in tool_calls {
                let Some(index) = tc["index"].as_u64().map(|n| n as usize) else {
                    continue;
                };
                if let Some(id) = tc["id"].as_str() {
                    self.open_tool_calls.push(index);
                    deltas.push(RawDelta::ToolCallStart {
                        index,
                        id: id.to_string(),
                        name: tc["function"]["name"].as_str().unwrap_or_default().to_string(),
                    });
                }
                if let Some(partial_json) = tc["function"]["arguments"].as_str() {
                    deltas.push(RawDelta::ToolCallArgumentsDelta {
                        index,
                        partial_json: partial_json.to_string(),
                    });
                }
            }
        }
        deltas
    }

    /// OpenAI has no `content_block_stop`-equivalent per tool call; the
    /// whole response terminates with one `finish_reason`, so every open
    /// tool call ends at once.
    fn finish_open_tool_calls(&mut self) -> Vec<RawDelta> {
        std::mem::take(&mut self.open_tool_calls)
            .into_iter()
            .map(|index| RawDelta::ToolCallEnd { index })
            .collect()
    }
}

fn parse_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "tool_calls" => FinishReason::ToolCall,
        "length" => FinishReason::MaxTokens,
        "content_filter" => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

fn parse_usage(usage: &serde_json::Value) -> UsageStats {
    UsageStats {
        prompt_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
        cached_tokens: usage["prompt_tokens_details"]["cached_tokens"]
            .as_u64()
            .map(|n| n as u32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(data: serde_json::Value) -> SseEvent {
        SseEvent {
            event: String::new(),
            data: data.to_string(),
            id: None,
            retry: None,
        }
    }

    #[test]
    fn text_delta_emits_raw_text() {
        let mut decoder = OpenAiChunkDecoder::new();
        let deltas = decoder.decode_event(&event(serde_json::json!({
            "choices": [{ "delta": { "content": "hi" } }]
        })));
        assert!(matches!(&deltas[..], [RawDelta::Text(t)] if t == "hi"));
    }

    #[test]
    fn done_sentinel_emits_nothing() {
        let mut decoder = OpenAiChunkDecoder::new();
        let event = SseEvent {
            event: String::new(),
            data: "[DONE]".to_string(),
            id: None,
            retry: None,
        };
        assert!(decoder.decode_event(&event).is_empty());
    }

    #[test]
    fn tool_call_start_accumulates_and_ends_at_finish() {
        let mut decoder = OpenAiChunkDecoder::new();
        let start = decoder.decode_event(&event(serde_json::json!({
            "choices": [{ "delta": { "tool_calls": [
                { "index": 0, "id": "call_1", "function": { "name": "search", "arguments": "" } }
            ] } }]
        })));
        assert!(matches!(&start[..], [RawDelta::ToolCallStart { index: 0, .. }]));

        let arg_delta = decoder.decode_event(&event(serde_json::json!({
            "choices": [{ "delta": { "tool_calls": [
                { "index": 0, "function": { "arguments": "{\"q\":" } }
            ] } }]
        })));
        assert!(matches!(
            &arg_delta[..],
            [RawDelta::ToolCallArgumentsDelta { index: 0, .. }]
        ));

        let finish = decoder.decode_event(&event(serde_json::json!({
            "choices": [{ "delta": {}, "finish_reason": "tool_calls" }]
        })));
        assert!(matches!(finish[0], RawDelta::ToolCallEnd { index: 0 }));
        assert!(matches!(finish[1], RawDelta::Finish(FinishReason::ToolCall)));
    }

    #[test]
    fn usage_event_emits_usage_delta() {
        let mut decoder = OpenAiChunkDecoder::new();
        let deltas = decoder.decode_event(&event(serde_json::json!({
            "choices": [],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
        })));
        assert!(matches!(&deltas[..], [RawDelta::Usage(_)]));
    }

    #[test]
    fn malformed_json_is_ignored() {
        let mut decoder = OpenAiChunkDecoder::new();
        let event = SseEvent {
            event: String::new(),
            data: "not json".to_string(),
            id: None,
            retry: None,
        };
        assert!(decoder.decode_event(&event).is_empty());
    }
}

//! Decodes Ollama's newline-delimited JSON streaming format into `RawDelta`s.
//!
//! Ollama's `/api/chat` stream is NDJSON, not Server-Sent Events: each line
//! is a standalone JSON object with no `data:`/`event:` framing and no
//! blank-line terminator, confirmed against `neuron-provider-ollama::streaming`'s
//! hand-rolled `parse_ndjson_stream`/`NdjsonParserState` line buffer.
//!
//! Rather than duplicating `conduit-streaming`'s chunk-assembly pipeline for
//! a second wire format, [`ndjson_to_sse_bytes`] reframes each NDJSON line
//! as a minimal SSE `data:` event so the existing
//! `conduit_streaming::assemble_chunk_stream` can drive this provider too;
//! [`OllamaChunkDecoder`] only has to understand the NDJSON payload shape.

use bytes::Bytes;
use conduit_core::{ConduitError, FinishReason, UsageStats};
use conduit_sse::SseEvent;
use conduit_streaming::{ChunkDecoder, RawDelta};
use futures::{Stream, StreamExt};

/// Reframes a raw NDJSON byte stream (one JSON object per line) as an SSE
/// byte stream (`data: <line>\n\n` per event), buffering partial lines
/// across chunk boundaries the way `conduit_sse::LineBuffer` does.
pub fn ndjson_to_sse_bytes<S, E>(byte_stream: S) -> impl Stream<Item = Result<Bytes, E>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Send + 'static,
{
    async_stream::stream! {
        let mut buf = String::new();
        let mut stream = std::pin::pin!(byte_stream);
        while let Some(next) = stream.next().await {
            let chunk = match next {
                Ok(bytes) => bytes,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };
            buf.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(pos) = buf.find('\n') {
                let line = buf[..pos].trim().to_string();
                buf.drain(..=pos);
                if !line.is_empty() {
                    yield Ok(Bytes::from(format!("data: {line}\n\n")));
                }
            }
        }
        let trailing = buf.trim().to_string();
        if !trailing.is_empty() {
            yield Ok(Bytes::from(format!("data: {trailing}\n\n")));
        }
    }
}

/// `conduit_streaming::ChunkDecoder` for Ollama's NDJSON chat stream,
/// applied after [`ndjson_to_sse_bytes`] has reframed the wire bytes.
#[derive(Debug, Default)]
pub struct OllamaChunkDecoder {
    /// Ollama emits a tool call's full arguments in one line rather than
    /// streaming them incrementally; indices are synthesized since the
    /// wire format carries none.
    next_tool_index: usize,
}

impl OllamaChunkDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChunkDecoder for OllamaChunkDecoder {
    fn decode_event(&mut self, event: &SseEvent) -> Vec<RawDelta> {
        let Ok(data) = serde_json::from_str::<serde_json::Value>(&event.data) else {
            return Vec::new();
        };

        let mut deltas = Vec::new();

        if let Some(text) = data["message"]["content"].as_str() {
            if !text.is_empty() {
                deltas.push(RawDelta::Text(text.to_string()));
            }
        }

        if let Some(tool_calls) = data["message"]["tool_calls"].as_array() {
            for tc in tool_calls {
                let index = self.next_tool_index;
                self.next_tool_index += 1;
                let id = format!("ollama_{}", uuid::Uuid::new_v4());
                let name = tc["function"]["name"].as_str().unwrap_or_default().to_string();
                deltas.push(RawDelta::ToolCallStart { index, id, name });
                deltas.push(RawDelta::ToolCallArgumentsDelta {
                    index,
                    partial_json: tc["function"]["arguments"].to_string(),
                });
                deltas.push(RawDelta::ToolCallEnd { index });
            }
        }

        if data["done"].as_bool().unwrap_or(false) {
            deltas.push(RawDelta::Usage(parse_usage(&data)));
            deltas.push(RawDelta::Finish(parse_finish_reason(&data)));
        }

        deltas
    }
}

fn parse_finish_reason(data: &serde_json::Value) -> FinishReason {
    match data["done_reason"].as_str() {
        Some("length") => FinishReason::MaxTokens,
        _ if data["message"]["tool_calls"].as_array().is_some_and(|a| !a.is_empty()) => {
            FinishReason::ToolCall
        }
        _ => FinishReason::Stop,
    }
}

fn parse_usage(data: &serde_json::Value) -> UsageStats {
    UsageStats {
        prompt_tokens: data["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
        completion_tokens: data["eval_count"].as_u64().unwrap_or(0) as u32,
        cached_tokens: None,
    }
}

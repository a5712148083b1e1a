//! Assembles [`conduit_core::GenerationChunk`]s from a decoder's
//! [`RawDelta`]s, handling the cross-cutting concerns no single backend
//! owns: the single-terminal-chunk invariant, a rolling tokens-per-second
//! estimate, and keyed accumulation of in-flight tool-call arguments.

use std::collections::HashMap;
use std::time::Instant;

use conduit_core::{CompletedToolCall, FinishReason, GenerationChunk, PartialToolCall, UsageStats};
use conduit_sse::SseEvent;

use crate::delta::{ChunkDecoder, RawDelta};

/// Rough characters-per-token ratio used to estimate `tokens_in_chunk` when
/// the backend does not report per-chunk usage directly.
const CHARS_PER_TOKEN: f64 = 4.0;

/// Tracks an in-progress tool call's accumulated argument JSON.
struct PendingToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Stateful assembler: feed it SSE events via [`Self::feed`], get back zero
/// or more [`GenerationChunk`]s per event. Call [`Self::finish`] once the
/// underlying stream ends to obtain the terminal chunk if the decoder never
/// produced one itself.
pub struct ChunkAssembler<D> {
    decoder: D,
    started_at: Option<Instant>,
    cumulative_tokens: u64,
    pending_tool_calls: HashMap<usize, PendingToolCall>,
    usage: Option<UsageStats>,
    finished: bool,
}

impl<D: ChunkDecoder> ChunkAssembler<D> {
    /// Wraps a per-backend decoder.
    #[must_use]
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            started_at: None,
            cumulative_tokens: 0,
            pending_tool_calls: HashMap::new(),
            usage: None,
            finished: false,
        }
    }

    /// Feeds one SSE event, returning the chunks it produced. Returns an
    /// empty vec once [`Self::finish`] has already produced the terminal
    /// chunk.
    pub fn feed(&mut self, event: &SseEvent) -> Vec<GenerationChunk> {
        if self.finished {
            return Vec::new();
        }
        let deltas = self.decoder.decode_event(event);
        deltas.into_iter().filter_map(|d| self.apply(d)).collect()
    }

    /// Call once the event source is exhausted. If the decoder never
    /// produced a [`RawDelta::Finish`], synthesizes a terminal chunk with
    /// [`FinishReason::Stop`] so the single-terminal-chunk invariant holds.
    pub fn finish(&mut self) -> Option<GenerationChunk> {
        if self.finished {
            return None;
        }
        Some(self.terminal_chunk(FinishReason::Stop))
    }

    fn apply(&mut self, delta: RawDelta) -> Option<GenerationChunk> {
        self.started_at.get_or_insert_with(Instant::now);

        match delta {
            RawDelta::Text(text) => {
                let tokens = estimate_tokens(&text);
                self.cumulative_tokens += tokens as u64;
                Some(GenerationChunk {
                    delta_text: text,
                    tokens_in_chunk: tokens,
                    tokens_per_second: self.tokens_per_second(),
                    is_complete: false,
                    finish_reason: None,
                    usage: None,
                    partial_tool_call: None,
                    completed_tool_calls: Vec::new(),
                })
            }
            RawDelta::ToolCallStart { index, id, name } => {
                self.pending_tool_calls.insert(
                    index,
                    PendingToolCall {
                        id: id.clone(),
                        name: name.clone(),
                        arguments: String::new(),
                    },
                );
                Some(self.partial_tool_call_chunk(index))
            }
            RawDelta::ToolCallArgumentsDelta {
                index,
                partial_json,
            } => {
                if let Some(pending) = self.pending_tool_calls.get_mut(&index) {
                    pending.arguments.push_str(&partial_json);
                }
                Some(self.partial_tool_call_chunk(index))
            }
            RawDelta::ToolCallEnd { index } => {
                let completed = self.pending_tool_calls.remove(&index).map(|pending| {
                    let arguments = serde_json::from_str(&pending.arguments)
                        .unwrap_or(serde_json::Value::Null);
                    CompletedToolCall {
                        id: pending.id,
                        name: pending.name,
                        arguments,
                    }
                });
                completed.map(|call| GenerationChunk {
                    delta_text: String::new(),
                    tokens_in_chunk: 0,
                    tokens_per_second: self.tokens_per_second(),
                    is_complete: false,
                    finish_reason: None,
                    usage: None,
                    partial_tool_call: None,
                    completed_tool_calls: vec![call],
                })
            }
            RawDelta::Usage(usage) => {
                self.usage = Some(usage);
                None
            }
            RawDelta::Finish(reason) => Some(self.terminal_chunk(reason)),
            RawDelta::Error(_) => Some(self.terminal_chunk(FinishReason::Error)),
        }
    }

    fn partial_tool_call_chunk(&self, index: usize) -> GenerationChunk {
        let pending = &self.pending_tool_calls[&index];
        GenerationChunk {
            delta_text: String::new(),
            tokens_in_chunk: 0,
            tokens_per_second: self.tokens_per_second(),
            is_complete: false,
            finish_reason: None,
            usage: None,
            partial_tool_call: Some(PartialToolCall {
                id: pending.id.clone(),
                name: pending.name.clone(),
                arguments_so_far: pending.arguments.clone(),
            }),
            completed_tool_calls: Vec::new(),
        }
    }

    fn terminal_chunk(&mut self, reason: FinishReason) -> GenerationChunk {
        self.finished = true;
        GenerationChunk {
            delta_text: String::new(),
            tokens_in_chunk: 0,
            tokens_per_second: self.tokens_per_second(),
            is_complete: true,
            finish_reason: Some(reason),
            usage: self.usage.take(),
            partial_tool_call: None,
            completed_tool_calls: Vec::new(),
        }
    }

    fn tokens_per_second(&self) -> f64 {
        match self.started_at {
            Some(start) => {
                let elapsed = start.elapsed().as_secs_f64();
                if elapsed <= 0.0 {
                    0.0
                } else {
                    self.cumulative_tokens as f64 / elapsed
                }
            }
            None => 0.0,
        }
    }
}

/// Rough token estimate for a chunk of freshly generated text, used when a
/// backend doesn't report per-delta usage.
fn estimate_tokens(text: &str) -> u32 {
    ((text.len() as f64 / CHARS_PER_TOKEN).ceil() as u32).max(if text.is_empty() { 0 } else { 1 })
}

//! The normalized shape a per-backend decoder extracts from one SSE event,
//! before [`crate::assembler::ChunkAssembler`] turns it into
//! [`conduit_core::GenerationChunk`]s.

use conduit_core::{ConduitError, FinishReason, UsageStats};

/// One unit of information pulled out of a single SSE event's `data`
/// payload. A decoder may produce zero, one, or several of these per event
/// (e.g. Anthropic's `content_block_delta` maps to exactly one; a backend
/// batching several fields into one event could map to more).
#[derive(Debug, Clone, PartialEq)]
pub enum RawDelta {
    /// A chunk of generated text.
    Text(String),
    /// A tool call has started; `index` keys subsequent argument deltas.
    ToolCallStart {
        /// Position of this tool call within the response (stable across
        /// the stream's lifetime, not necessarily a small integer).
        index: usize,
        /// Call identifier, assigned by the backend.
        id: String,
        /// Tool name.
        name: String,
    },
    /// Additional raw JSON for the arguments of the tool call at `index`.
    ToolCallArgumentsDelta {
        /// Matches the `index` from a prior [`Self::ToolCallStart`].
        index: usize,
        /// A fragment to append to the accumulated arguments buffer.
        partial_json: String,
    },
    /// The tool call at `index` has finished streaming its arguments.
    ToolCallEnd {
        /// Matches the `index` from a prior [`Self::ToolCallStart`].
        index: usize,
    },
    /// Usage statistics, typically reported once near stream end.
    Usage(UsageStats),
    /// The stream has reached its terminal chunk.
    Finish(FinishReason),
    /// An unrecoverable error occurred mid-stream.
    Error(ConduitError),
}

/// Converts per-backend SSE events into [`RawDelta`]s.
///
/// Implementations hold whatever event-type dispatch table their backend's
/// wire format needs; `conduit-streaming` only consumes the normalized
/// output.
pub trait ChunkDecoder {
    /// Decode one SSE event, returning zero or more deltas it produced.
    fn decode_event(&mut self, event: &conduit_sse::SseEvent) -> Vec<RawDelta>;
}

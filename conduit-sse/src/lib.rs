#![doc = include_str!("../README.md")]

mod decode;
mod event;
mod line_buffer;

pub use decode::{decode_sse_stream, SseDecodeError};
pub use event::{SseEvent, SseParser};
pub use line_buffer::{LineBuffer, LineOutcome};

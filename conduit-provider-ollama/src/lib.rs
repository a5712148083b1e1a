#![doc = include_str!("../README.md")]

mod client;
mod error;
mod mapping;
mod streaming;
mod types;

pub use client::{Ollama, DEFAULT_MODEL};
pub use streaming::{ndjson_to_sse_bytes, OllamaChunkDecoder};

#![doc = include_str!("../README.md")]

mod client;
mod error;
mod mapping;
mod streaming;

pub use client::{Anthropic, DEFAULT_MODEL};
pub use streaming::AnthropicChunkDecoder;

#![doc = include_str!("../README.md")]

mod client;
mod error;
mod mapping;
mod streaming;
mod types;

pub use client::{OpenAi, DEFAULT_EMBEDDING_MODEL, DEFAULT_IMAGE_MODEL, DEFAULT_MODEL};
pub use streaming::OpenAiChunkDecoder;

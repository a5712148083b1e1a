#![doc = include_str!("../README.md")]

mod assembler;
mod delta;
mod pipeline;

pub use assembler::ChunkAssembler;
pub use delta::{ChunkDecoder, RawDelta};
pub use pipeline::assemble_chunk_stream;

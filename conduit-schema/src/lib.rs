#![doc = include_str!("../README.md")]

mod accumulator;
mod content;
mod generable;
mod schema;

pub use accumulator::{accumulate_structured, StructuredChunk};
pub use content::{ContentValue, GeneratedContent, GeneratedNumber};
pub use generable::{Generable, PartiallyGenerated};
pub use schema::{GenerationSchema, SchemaKind, SchemaNode};

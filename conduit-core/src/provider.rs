//! Capability contracts: the polymorphic interfaces providers implement piecewise.
//!
//! Each contract is a standalone trait so user code can be generic over the
//! single capability it needs (`fn summarize<G: TextGenerator>(g: &G)`)
//! while concrete providers implement as many as their backend supports.
//! Traits use RPITIT (Rust 2024 native async-in-trait) rather than
//! `async-trait`, matching the object-*unsafe*, generically-composed
//! capability family; dynamic dispatch across a fixed provider set is
//! expected to go through an enum of variants, not a trait object, per
//! `DESIGN.md`.

use std::future::Future;

use crate::error::ConduitError;
use crate::image::{GeneratedImage, ImageGenerationConfig};
use crate::stream::ChunkStream;
use crate::types::{EmbeddingResult, GenerateConfig, GenerationResult, Message, TokenCount};
use crate::wasm::{WasmCompatSend, WasmCompatSync};

/// Definition of a tool available to the model, carried on a `GenerateConfig`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// JSON Schema for the tool's arguments (a `conduit_schema::GenerationSchema`,
    /// serialized).
    pub input_schema: serde_json::Value,
}

/// Reports whether a provider can currently serve requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Ready to serve requests.
    Available,
    /// Not currently available, with a reason.
    Unavailable(String),
}

/// Text generation: the primary capability contract.
pub trait TextGenerator: WasmCompatSend + WasmCompatSync {
    /// Generate a full (non-streaming) result for a conversation.
    ///
    /// Fails with `ConduitError::InvalidInput` when `messages` is empty.
    fn generate(
        &self,
        messages: Vec<Message>,
        model_id: &str,
        config: &GenerateConfig,
    ) -> impl Future<Output = Result<GenerationResult, ConduitError>> + WasmCompatSend;

    /// Stream a conversation's generation as metadata-bearing chunks.
    fn stream_with_metadata(
        &self,
        messages: Vec<Message>,
        model_id: &str,
        config: &GenerateConfig,
    ) -> impl Future<Output = Result<ChunkStream, ConduitError>> + WasmCompatSend;

    /// Stream a conversation's generation as plain text fragments.
    ///
    /// The default implementation is equivalent to `stream_with_metadata`
    /// with metadata discarded, matching `spec.md §4.1`.
    fn stream(
        &self,
        messages: Vec<Message>,
        model_id: &str,
        config: &GenerateConfig,
    ) -> impl Future<Output = Result<ChunkStream, ConduitError>> + WasmCompatSend {
        self.stream_with_metadata(messages, model_id, config)
    }
}

/// Adds availability reporting and cancellation to a provider.
pub trait AIProvider: TextGenerator {
    /// Whether this provider can currently serve requests.
    fn availability(&self) -> impl Future<Output = Availability> + WasmCompatSend;

    /// Cancel the current in-flight generation, if any.
    fn cancel_generation(&self) -> impl Future<Output = ()> + WasmCompatSend;
}

/// Embedding generation.
pub trait EmbeddingGenerator: WasmCompatSend + WasmCompatSync {
    /// Embed a single text.
    fn embed(
        &self,
        text: &str,
        model_id: &str,
    ) -> impl Future<Output = Result<EmbeddingResult, ConduitError>> + WasmCompatSend;

    /// Embed a batch of texts.
    ///
    /// Dispatch may run concurrently; results are returned in input order
    /// regardless of completion order, per `spec.md §4.1`/§5.
    fn embed_batch(
        &self,
        texts: Vec<String>,
        model_id: &str,
    ) -> impl Future<Output = Result<Vec<EmbeddingResult>, ConduitError>> + WasmCompatSend;
}

/// Audio transcription.
pub trait Transcriber: WasmCompatSend + WasmCompatSync {
    /// Transcribe raw audio bytes (format given by `mime_type`) to text.
    fn transcribe(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
        model_id: &str,
    ) -> impl Future<Output = Result<String, ConduitError>> + WasmCompatSend;
}

/// Image generation.
pub trait ImageGenerator: WasmCompatSend + WasmCompatSync {
    /// Generate an image from a prompt.
    ///
    /// `negative_prompt` is ignored by backends that do not support it.
    fn generate_image(
        &self,
        prompt: &str,
        negative_prompt: Option<&str>,
        config: &ImageGenerationConfig,
        model_id: &str,
    ) -> impl Future<Output = Result<GeneratedImage, ConduitError>> + WasmCompatSend;
}

/// Token counting, exact or estimated.
pub trait TokenCounter: WasmCompatSend + WasmCompatSync {
    /// Count tokens in `text` for `model_id`.
    ///
    /// Providers without a real tokenizer set `TokenCount::is_estimate =
    /// true` and may use the ~4-chars-per-token heuristic from
    /// `conduit_context`, per `spec.md §4.1`/§9.
    fn count_tokens(
        &self,
        text: &str,
        model_id: &str,
    ) -> impl Future<Output = Result<TokenCount, ConduitError>> + WasmCompatSend;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_wasm_compat_send_sync<T: WasmCompatSend + WasmCompatSync>() {}

    #[test]
    fn capability_traits_are_wasm_compat() {
        // Compile-time check only: a concrete type implementing the trait
        // must remain Send + Sync on native targets.
        struct Dummy;
        impl TextGenerator for Dummy {
            async fn generate(
                &self,
                _messages: Vec<Message>,
                _model_id: &str,
                _config: &GenerateConfig,
            ) -> Result<GenerationResult, ConduitError> {
                unimplemented!()
            }
            async fn stream_with_metadata(
                &self,
                _messages: Vec<Message>,
                _model_id: &str,
                _config: &GenerateConfig,
            ) -> Result<ChunkStream, ConduitError> {
                unimplemented!()
            }
        }
        assert_wasm_compat_send_sync::<Dummy>();
    }
}

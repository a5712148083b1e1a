#![doc = include_str!("../README.md")]

pub use conduit_core;

#[cfg(feature = "context")]
pub use conduit_context;
#[cfg(feature = "embeddings")]
pub use conduit_embeddings;
#[cfg(feature = "schema")]
pub use conduit_json;
#[cfg(feature = "local")]
pub use conduit_local;
#[cfg(feature = "provider-anthropic")]
pub use conduit_provider_anthropic;
#[cfg(feature = "provider-kernel")]
pub use conduit_provider_kernel;
#[cfg(feature = "provider-ollama")]
pub use conduit_provider_ollama;
#[cfg(feature = "provider-openai")]
pub use conduit_provider_openai;
#[cfg(feature = "schema")]
pub use conduit_schema;
#[cfg(feature = "session")]
pub use conduit_session;
#[cfg(feature = "streaming")]
pub use conduit_sse;
#[cfg(feature = "streaming")]
pub use conduit_streaming;
#[cfg(feature = "tool")]
pub use conduit_tool;

/// Happy-path imports for composing conduit clients.
pub mod prelude {
    pub use conduit_core::{
        AIProvider, AudioRef, AuthMethod, ChunkStream, CompletedToolCall, ConduitError, ContentPart,
        EmbeddingGenerator, EmbeddingResult, ErrorCategory, GenerateConfig, GenerationChunk,
        GenerationResult, ImageGenerator, ImageRef, Message, Role, SecretValue, TextGenerator,
        ToolChoice, ToolDefinition, Transcriber,
    };

    #[cfg(feature = "streaming")]
    pub use conduit_streaming::{assemble_chunk_stream, ChunkDecoder, RawDelta};

    #[cfg(feature = "schema")]
    pub use conduit_schema::{Generable, GenerationSchema, PartiallyGenerated};

    #[cfg(feature = "tool")]
    pub use conduit_tool::{MissingToolPolicy, Tool, ToolExecutor, ToolRegistry};

    #[cfg(feature = "context")]
    pub use conduit_context::ContextStrategy;
    #[cfg(feature = "context")]
    pub use conduit_context::TokenCounter as ContextTokenCounter;

    #[cfg(feature = "embeddings")]
    pub use conduit_embeddings::*;

    #[cfg(feature = "local")]
    pub use conduit_local::{ModelLoader, ProviderRuntimePolicy};

    #[cfg(feature = "session")]
    pub use conduit_session::{ChatSession, SessionReply, SessionStorage};

    #[cfg(feature = "provider-openai")]
    pub use conduit_provider_openai::OpenAi;
    #[cfg(feature = "provider-anthropic")]
    pub use conduit_provider_anthropic::Anthropic;
    #[cfg(feature = "provider-ollama")]
    pub use conduit_provider_ollama::Ollama;
}

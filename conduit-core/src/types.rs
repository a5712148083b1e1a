//! The value model: messages, generation configuration, results, and chunks.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A system instruction.
    System,
    /// A human user.
    User,
    /// An AI assistant.
    Assistant,
    /// A tool-result turn.
    Tool,
}

/// A reference to an out-of-line image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageRef {
    /// Base64-encoded image data with a MIME type.
    Base64 {
        /// e.g. `"image/png"`.
        media_type: String,
        /// Base64-encoded bytes.
        data: String,
    },
    /// A URL the provider may fetch directly.
    Url {
        /// The image URL.
        url: String,
    },
}

/// A reference to an out-of-line audio clip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioRef {
    /// Base64-encoded audio data with a MIME type.
    Base64 {
        /// e.g. `"audio/wav"`.
        media_type: String,
        /// Base64-encoded bytes.
        data: String,
    },
    /// A URL the provider may fetch directly.
    Url {
        /// The audio URL.
        url: String,
    },
}

/// One part of a message's content.
///
/// A message's content is never a single opaque string in the wire model:
/// it is an ordered list of parts so that text, media references, tool
/// calls, and tool results can interleave within one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentPart {
    /// Plain text.
    Text(String),
    /// An image reference.
    Image(ImageRef),
    /// An audio reference.
    Audio(AudioRef),
    /// A provider-opaque typed blob (documents, etc.), tagged by MIME type.
    Blob {
        /// MIME type of the blob.
        media_type: String,
        /// Base64-encoded bytes.
        data: String,
    },
    /// A tool invocation requested by the assistant.
    ToolCall {
        /// Unique identifier for this call, stable across streaming deltas.
        id: String,
        /// Name of the tool to invoke.
        name: String,
        /// JSON arguments, assembled from streamed deltas if needed.
        arguments: serde_json::Value,
    },
    /// The result of a tool invocation, fed back to the model.
    ToolResult {
        /// References the `id` of the originating `ToolCall`.
        tool_call_id: String,
        /// Textual result content.
        content: String,
        /// Whether this result represents a tool execution failure.
        is_error: bool,
    },
}

impl ContentPart {
    /// Returns the text of this part, if it is a `Text` part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }
}

/// A message in a conversation.
///
/// Invariant: `content` is never logically empty for `User`/`Assistant`
/// turns outside of in-flight streaming assembly, where a single empty
/// `Text` placeholder part is permitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Stable identifier, assigned by the session that created the message.
    pub id: String,
    /// The role of the message author.
    pub role: Role,
    /// Ordered content parts.
    pub content: Vec<ContentPart>,
    /// Wall-clock time the message was created, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
    /// Free-form metadata attached by the caller.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Message {
    fn new(role: Role, content: Vec<ContentPart>) -> Self {
        Self {
            id: uuid_like_id(),
            role,
            content,
            timestamp: Some(chrono::Utc::now()),
            metadata: HashMap::new(),
        }
    }

    /// Create a user message with a single text part.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentPart::Text(text.into())])
    }

    /// Create an assistant message with a single text part.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentPart::Text(text.into())])
    }

    /// Create a system message with a single text part.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![ContentPart::Text(text.into())])
    }

    /// Create a tool-result message.
    #[must_use]
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(
            Role::Tool,
            vec![ContentPart::ToolResult {
                tool_call_id: tool_call_id.into(),
                content: content.into(),
                is_error: false,
            }],
        )
    }

    /// Concatenate the text of every `Text` part, in order.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    /// Collect any `ToolCall` parts in this message.
    #[must_use]
    pub fn tool_calls(&self) -> Vec<(&str, &str, &serde_json::Value)> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolCall {
                    id,
                    name,
                    arguments,
                } => Some((id.as_str(), name.as_str(), arguments)),
                _ => None,
            })
            .collect()
    }
}

/// Generates a low-collision identifier without pulling in a UUID dependency.
///
/// Not cryptographically random; identifiers are only used to correlate
/// messages and tool calls within a single process.
fn uuid_like_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);
    format!("msg_{nanos:x}_{n:x}")
}

/// Tool selection strategy requested of the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolChoice {
    /// Model decides whether to use a tool.
    Auto,
    /// Model must not use a tool.
    None,
    /// Model must use at least one tool.
    Required,
    /// Model must use the named tool.
    ByName(String),
}

/// Generation configuration.
///
/// All numeric fields are clamped to their valid range on assignment so a
/// `GenerateConfig` value is always internally consistent. Updates are
/// fluent and return a new value, leaving the receiver untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateConfig {
    /// Maximum tokens to generate, if bounded.
    pub max_tokens: Option<u32>,
    /// Sampling temperature, clamped to `[0.0, 2.0]`.
    pub temperature: f32,
    /// Nucleus sampling parameter, clamped to `(0.0, 1.0]`.
    pub top_p: f32,
    /// Top-k sampling cutoff, if the backend supports it.
    pub top_k: Option<u32>,
    /// Frequency penalty.
    pub frequency_penalty: f32,
    /// Presence penalty.
    pub presence_penalty: f32,
    /// Sequences that terminate generation.
    pub stop_sequences: Vec<String>,
    /// Deterministic sampling seed, if the backend supports it.
    pub seed: Option<i64>,
    /// Tools available to the model for this request.
    pub tools: Vec<crate::provider::ToolDefinition>,
    /// Tool selection strategy.
    pub tool_choice: Option<ToolChoice>,
    /// Structured-output schema, if this request wants typed JSON back.
    pub response_schema: Option<serde_json::Value>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self::preset_default()
    }
}

impl GenerateConfig {
    fn clamp_temperature(t: f32) -> f32 {
        t.clamp(0.0, 2.0)
    }

    fn clamp_top_p(p: f32) -> f32 {
        p.clamp(f32::EPSILON, 1.0)
    }

    /// The library default preset: `temperature = 0.7`, `top_p = 0.9`.
    #[must_use]
    pub fn preset_default() -> Self {
        Self {
            max_tokens: None,
            temperature: 0.7,
            top_p: 0.9,
            top_k: None,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop_sequences: Vec::new(),
            seed: None,
            tools: Vec::new(),
            tool_choice: None,
            response_schema: None,
        }
    }

    /// A higher-temperature preset for creative generation.
    #[must_use]
    pub fn preset_creative() -> Self {
        Self {
            temperature: 1.0,
            ..Self::preset_default()
        }
    }

    /// A low-temperature preset for precise, repeatable output.
    #[must_use]
    pub fn preset_precise() -> Self {
        Self {
            temperature: 0.3,
            ..Self::preset_default()
        }
    }

    /// A preset tuned for code generation.
    #[must_use]
    pub fn preset_code() -> Self {
        Self {
            temperature: 0.2,
            ..Self::preset_default()
        }
    }

    /// Fluent update: set `max_tokens`.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Fluent update: set `temperature`, clamped to `[0.0, 2.0]`.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Self::clamp_temperature(temperature);
        self
    }

    /// Fluent update: set `top_p`, clamped to `(0.0, 1.0]`.
    #[must_use]
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Self::clamp_top_p(top_p);
        self
    }

    /// Fluent update: set `top_k`.
    #[must_use]
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Fluent update: add a stop sequence.
    #[must_use]
    pub fn with_stop_sequence(mut self, seq: impl Into<String>) -> Self {
        self.stop_sequences.push(seq.into());
        self
    }

    /// Fluent update: set the sampling seed.
    #[must_use]
    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Fluent update: set the tools available to the model.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<crate::provider::ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Fluent update: set the tool choice strategy.
    #[must_use]
    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    /// Fluent update: set a structured-output schema.
    #[must_use]
    pub fn with_response_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// Why a generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model reached a natural stopping point.
    Stop,
    /// The max-token budget was exhausted.
    MaxTokens,
    /// A configured stop sequence was matched.
    StopSequence,
    /// The model requested a tool call.
    ToolCall,
    /// Content was filtered by the backend's safety system.
    ContentFilter,
    /// The caller cancelled the generation.
    Cancelled,
    /// The generation failed.
    Error,
}

/// Token usage for a single generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Tokens served from a provider-side cache, if reported.
    pub cached_tokens: Option<u32>,
}

impl UsageStats {
    /// Total tokens: prompt + completion.
    #[must_use]
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A completed tool call assembled from streaming deltas or returned whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedToolCall {
    /// Call identifier.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// JSON arguments.
    pub arguments: serde_json::Value,
}

/// The final, non-streaming result of a generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// The generated text.
    pub text: String,
    /// Total tokens consumed (prompt + completion), if known.
    pub total_tokens: Option<u32>,
    /// Wall-clock duration of the generation.
    pub duration: Duration,
    /// Why generation stopped.
    pub finish_reason: FinishReason,
    /// Detailed usage stats, if the backend reported them.
    pub usage: Option<UsageStats>,
    /// Tool calls requested by the model, if any.
    pub tool_calls: Vec<CompletedToolCall>,
    /// Extended-reasoning text, if the backend exposed it.
    pub reasoning: Option<String>,
}

impl GenerationResult {
    /// Tokens generated per second of wall-clock duration.
    ///
    /// Returns `0.0` when duration is zero or usage is unknown.
    #[must_use]
    pub fn tokens_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        match self.usage {
            Some(usage) => f64::from(usage.completion_tokens) / secs,
            None => 0.0,
        }
    }
}

/// One element of a streaming generation.
///
/// Invariant: at most one chunk in a stream carries `is_complete = true`,
/// and it is the last chunk produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationChunk {
    /// Incremental text for this chunk, may be empty.
    pub delta_text: String,
    /// Tokens newly produced in this chunk.
    pub tokens_in_chunk: u32,
    /// Rolling tokens-per-second estimate at this point in the stream.
    pub tokens_per_second: f64,
    /// Whether this is the terminal chunk of the stream.
    pub is_complete: bool,
    /// Set only on the terminal chunk.
    pub finish_reason: Option<FinishReason>,
    /// Usage stats, typically only populated on the terminal chunk.
    pub usage: Option<UsageStats>,
    /// An in-flight tool call whose arguments are still being streamed.
    pub partial_tool_call: Option<PartialToolCall>,
    /// Tool calls that completed as of this chunk.
    pub completed_tool_calls: Vec<CompletedToolCall>,
}

/// An in-progress tool call assembled from streamed argument fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialToolCall {
    /// Call identifier.
    pub id: String,
    /// Tool name, known from the call's start event.
    pub name: String,
    /// Arguments accumulated so far (a JSON fragment, not necessarily valid).
    pub arguments_so_far: String,
}

/// A single embedding result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResult {
    /// The embedding vector.
    pub vector: Vec<f32>,
    /// The source text that was embedded.
    pub source_text: String,
    /// The model identifier that produced this embedding.
    pub model: String,
    /// Token count for the source text, if known.
    pub token_count: Option<u32>,
}

impl EmbeddingResult {
    /// The dimensionality of the embedding vector.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }
}

/// A token count estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCount {
    /// The count itself.
    pub count: u32,
    /// Whether this count is an estimate rather than an exact tokenizer result.
    pub is_estimate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_text_concatenates_text_parts() {
        let msg = Message {
            content: vec![
                ContentPart::Text("hello ".into()),
                ContentPart::Image(ImageRef::Url {
                    url: "http://x".into(),
                }),
                ContentPart::Text("world".into()),
            ],
            ..Message::user("unused")
        };
        assert_eq!(msg.text(), "hello world");
    }

    #[test]
    fn generate_config_clamps_temperature() {
        let cfg = GenerateConfig::default().with_temperature(5.0);
        assert_eq!(cfg.temperature, 2.0);
        let cfg = GenerateConfig::default().with_temperature(-1.0);
        assert_eq!(cfg.temperature, 0.0);
    }

    #[test]
    fn generate_config_clamps_top_p() {
        let cfg = GenerateConfig::default().with_top_p(0.0);
        assert!(cfg.top_p > 0.0);
        let cfg = GenerateConfig::default().with_top_p(2.0);
        assert_eq!(cfg.top_p, 1.0);
    }

    #[test]
    fn presets_have_expected_temperature() {
        assert_eq!(GenerateConfig::preset_default().temperature, 0.7);
        assert_eq!(GenerateConfig::preset_creative().temperature, 1.0);
        assert_eq!(GenerateConfig::preset_precise().temperature, 0.3);
        assert_eq!(GenerateConfig::preset_code().temperature, 0.2);
    }

    #[test]
    fn tokens_per_second_is_zero_without_usage() {
        let result = GenerationResult {
            text: "hi".into(),
            total_tokens: None,
            duration: Duration::from_secs(1),
            finish_reason: FinishReason::Stop,
            usage: None,
            tool_calls: vec![],
            reasoning: None,
        };
        assert_eq!(result.tokens_per_second(), 0.0);
    }

    #[test]
    fn message_ids_are_unique() {
        let a = Message::user("a");
        let b = Message::user("b");
        assert_ne!(a.id, b.id);
    }
}

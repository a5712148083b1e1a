//! Heuristic token-count estimation for backends without a real tokenizer.
//!
//! Implements the estimator `spec.md §4.1`/§9 documents: roughly 4
//! characters per token, plus a small per-message overhead for role
//! framing. Drift against a real tokenizer can be large (the spec notes
//! ±50%); callers that need precision must route through a backend that
//! exposes one.

use conduit_core::{ContentPart, Message, TokenCount};

/// Default characters-per-token ratio.
const DEFAULT_CHARS_PER_TOKEN: f32 = 4.0;

/// Per-message overhead, in tokens, covering role markers and formatting.
const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// A fixed token cost attributed to non-text content `conduit-context`
/// cannot size directly (out-of-line image/audio references).
const MEDIA_REFERENCE_TOKENS: usize = 300;

/// Estimates token counts from text using a configurable chars-per-token
/// ratio.
///
/// This is a heuristic estimator, not a real tokenizer — see the module
/// docs for accuracy caveats.
#[derive(Debug, Clone, Copy)]
pub struct TokenCounter {
    chars_per_token: f32,
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounter {
    /// Creates a new counter at the default ratio of 4.0 chars/token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }

    /// Creates a counter with a custom chars-per-token ratio.
    #[must_use]
    pub fn with_ratio(chars_per_token: f32) -> Self {
        Self {
            chars_per_token: chars_per_token.max(f32::EPSILON),
        }
    }

    /// Estimates the token count of a bare string.
    #[must_use]
    pub fn estimate_text(&self, text: &str) -> usize {
        (text.len() as f32 / self.chars_per_token).ceil() as usize
    }

    /// Estimates the total token count of a slice of messages, including
    /// per-message role overhead.
    #[must_use]
    pub fn estimate_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }

    /// Produces a `TokenCount` marked as an estimate, for
    /// `conduit_core::TokenCounter` implementations backed by this type.
    #[must_use]
    pub fn count(&self, text: &str) -> TokenCount {
        TokenCount {
            count: self.estimate_text(text) as u32,
            is_estimate: true,
        }
    }

    fn estimate_message(&self, message: &Message) -> usize {
        let content_tokens: usize = message
            .content
            .iter()
            .map(|part| self.estimate_content_part(part))
            .sum();
        MESSAGE_OVERHEAD_TOKENS + content_tokens
    }

    fn estimate_content_part(&self, part: &ContentPart) -> usize {
        match part {
            ContentPart::Text(text) => self.estimate_text(text),
            ContentPart::Image(_) | ContentPart::Audio(_) => MEDIA_REFERENCE_TOKENS,
            ContentPart::Blob { data, .. } => self.estimate_text(data),
            ContentPart::ToolCall { name, arguments, .. } => {
                self.estimate_text(name) + self.estimate_text(&arguments.to_string())
            }
            ContentPart::ToolResult { content, .. } => self.estimate_text(content),
        }
    }
}

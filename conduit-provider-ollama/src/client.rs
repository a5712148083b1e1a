//! The `Ollama` provider: wires `conduit-provider-kernel`'s retry plumbing
//! and the NDJSON-to-SSE bridge in `streaming` to `mapping`/`error`.
//!
//! Grounded on `neuron-provider-ollama::client`'s `Ollama` struct and
//! builder (`new`/`.model`/`.base_url`/`.keep_alive`) -- notably, unlike
//! `Anthropic` and `OpenAi`, there is no `auth` field at all: Ollama serves
//! a local, unauthenticated API.

use std::sync::Arc;
use std::time::Instant;

use conduit_core::{
    AIProvider, Availability, ChunkStream, ConduitError, GenerateConfig, GenerationResult,
    Message, TextGenerator,
};
use conduit_provider_kernel::{dispatch_with_retry, RetryConfig};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{map_reqwest_error, refine_status_error};
use crate::mapping::{from_api_response, to_api_request};
use crate::streaming::{ndjson_to_sse_bytes, OllamaChunkDecoder};

/// Used when the caller does not pick a model explicitly.
pub const DEFAULT_MODEL: &str = "llama3.2";
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama local-inference provider.
#[derive(Clone)]
pub struct Ollama {
    model: String,
    base_url: String,
    keep_alive: Option<String>,
    client: reqwest::Client,
    retry: RetryConfig,
    cancellation: Arc<Mutex<CancellationToken>>,
}

impl Default for Ollama {
    fn default() -> Self {
        Self::new()
    }
}

impl Ollama {
    /// Creates a provider targeting [`DEFAULT_MODEL`] at the default local
    /// daemon address.
    #[must_use]
    pub fn new() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            keep_alive: None,
            client: reqwest::Client::new(),
            retry: RetryConfig::default(),
            cancellation: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    /// Overrides the default model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the daemon's base URL, e.g. for a remote Ollama host.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets how long the daemon should keep the model loaded after this
    /// request (e.g. `"5m"`, `"0"` to unload immediately).
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    /// Overrides the retry/backoff policy.
    #[must_use]
    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    async fn fresh_cancellation(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancellation.lock().await = token.clone();
        token
    }

    fn request(&self, body: &impl serde::Serialize) -> reqwest::RequestBuilder {
        self.client.post(self.chat_url()).json(body)
    }
}

impl TextGenerator for Ollama {
    async fn generate(
        &self,
        messages: Vec<Message>,
        model_id: &str,
        config: &GenerateConfig,
    ) -> Result<GenerationResult, ConduitError> {
        let model = if model_id.is_empty() { &self.model } else { model_id };
        let body = to_api_request(&messages, model, config, self.keep_alive.as_deref(), false)?;
        let cancellation = self.fresh_cancellation().await;

        let started = Instant::now();
        let response =
            dispatch_with_retry(&cancellation, &self.retry, |_attempt| self.request(&body).send())
                .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(refine_status_error(status.as_u16()));
        }

        let parsed = response
            .json::<crate::types::OllamaResponse>()
            .await
            .map_err(map_reqwest_error)?;
        from_api_response(parsed, started.elapsed())
    }

    async fn stream_with_metadata(
        &self,
        messages: Vec<Message>,
        model_id: &str,
        config: &GenerateConfig,
    ) -> Result<ChunkStream, ConduitError> {
        let model = if model_id.is_empty() { &self.model } else { model_id };
        let body = to_api_request(&messages, model, config, self.keep_alive.as_deref(), true)?;
        let cancellation = self.fresh_cancellation().await;

        let response =
            dispatch_with_retry(&cancellation, &self.retry, |_attempt| self.request(&body).send())
                .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(refine_status_error(status.as_u16()));
        }

        let byte_stream = ndjson_to_sse_bytes(response.bytes_stream());
        Ok(conduit_streaming::assemble_chunk_stream(
            byte_stream,
            OllamaChunkDecoder::new(),
            cancellation,
        ))
    }
}

impl AIProvider for Ollama {
    /// Ollama has no API key to check; availability instead means "the
    /// local daemon is reachable", which only a live request can answer,
    /// so this optimistically reports `Available` — matching
    /// `neuron-provider-ollama::Ollama`, which has no `availability` gate
    /// at all.
    async fn availability(&self) -> Availability {
        Availability::Available
    }

    async fn cancel_generation(&self) {
        self.cancellation.lock().await.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_and_base_url() {
        let provider = Ollama::new();
        assert_eq!(provider.model, DEFAULT_MODEL);
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn builder_overrides_model_base_url_and_keep_alive() {
        let provider = Ollama::new()
            .model("mistral")
            .base_url("http://localhost:9999/")
            .keep_alive("0");
        assert_eq!(provider.model, "mistral");
        assert_eq!(provider.chat_url(), "http://localhost:9999/api/chat");
        assert_eq!(provider.keep_alive.as_deref(), Some("0"));
    }

    #[test]
    fn default_impl_matches_new() {
        let provider = Ollama::default();
        assert_eq!(provider.model, DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn availability_is_always_available() {
        let provider = Ollama::new();
        assert!(matches!(provider.availability().await, Availability::Available));
    }

    #[tokio::test]
    async fn cancel_generation_cancels_current_token() {
        let provider = Ollama::new();
        let token = provider.fresh_cancellation().await;
        assert!(!token.is_cancelled());
        provider.cancel_generation().await;
        assert!(token.is_cancelled());
    }
}

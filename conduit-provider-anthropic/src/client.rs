//! The `Anthropic` provider: wires `conduit-provider-kernel`'s retry/auth
//! plumbing and `conduit-streaming`'s chunk assembler to `mapping`/`error`.
//!
//! Grounded on `neuron-provider-anthropic::client`'s builder pattern
//! (`new`/`.model`/`.base_url`) and its `Provider::complete`/`complete_stream`
//! split.

use std::sync::Arc;
use std::time::Instant;

use conduit_core::{
    AIProvider, AuthMethod, ChunkStream, ConduitError, Availability, GenerateConfig,
    GenerationResult, Message, TextGenerator,
};
use conduit_provider_kernel::{apply_auth, dispatch_with_retry, RetryConfig};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{map_reqwest_error, refine_status_error};
use crate::mapping::{from_api_response, to_api_request};
use crate::streaming::AnthropicChunkDecoder;

/// Used when the caller does not pick a model explicitly.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API text-generation provider.
///
/// Cheap to clone: the underlying `reqwest::Client` and cancellation state
/// are both internally reference-counted.
#[derive(Clone)]
pub struct Anthropic {
    auth: AuthMethod,
    model: String,
    base_url: String,
    client: reqwest::Client,
    retry: RetryConfig,
    cancellation: Arc<Mutex<CancellationToken>>,
}

impl Anthropic {
    /// Creates a provider using [`DEFAULT_MODEL`] and the public Anthropic
    /// API endpoint.
    #[must_use]
    pub fn new(auth: AuthMethod) -> Self {
        Self {
            auth,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
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

    /// Overrides the API base URL, e.g. to point at a proxy.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the retry/backoff policy.
    #[must_use]
    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    /// Installs a fresh cancellation token for a new call, returning it.
    async fn fresh_cancellation(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancellation.lock().await = token.clone();
        token
    }

    fn request(&self, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .post(self.messages_url())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body);
        apply_auth(builder, &self.auth)
    }
}

impl TextGenerator for Anthropic {
    async fn generate(
        &self,
        messages: Vec<Message>,
        model_id: &str,
        config: &GenerateConfig,
    ) -> Result<GenerationResult, ConduitError> {
        let model = if model_id.is_empty() { &self.model } else { model_id };
        let body = to_api_request(&messages, model, config, false)?;
        let cancellation = self.fresh_cancellation().await;

        let started = Instant::now();
        let response = dispatch_with_retry(&cancellation, &self.retry, |_attempt| {
            self.request(&body).send()
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(refine_status_error(status.as_u16()));
        }

        let json = response
            .json::<serde_json::Value>()
            .await
            .map_err(map_reqwest_error)?;
        from_api_response(&json, started.elapsed())
    }

    async fn stream_with_metadata(
        &self,
        messages: Vec<Message>,
        model_id: &str,
        config: &GenerateConfig,
    ) -> Result<ChunkStream, ConduitError> {
        let model = if model_id.is_empty() { &self.model } else { model_id };
        let body = to_api_request(&messages, model, config, true)?;
        let cancellation = self.fresh_cancellation().await;

        let response = dispatch_with_retry(&cancellation, &self.retry, |_attempt| {
            self.request(&body).send()
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(refine_status_error(status.as_u16()));
        }

        let byte_stream = response.bytes_stream();
        Ok(conduit_streaming::assemble_chunk_stream(
            byte_stream,
            AnthropicChunkDecoder::new(),
            cancellation,
        ))
    }
}

impl AIProvider for Anthropic {
    async fn availability(&self) -> Availability {
        match self.auth.resolve() {
            Some(_) => Availability::Available,
            None => Availability::Unavailable(
                "no Anthropic API key is configured for this provider".to_string(),
            ),
        }
    }

    async fn cancel_generation(&self) {
        self.cancellation.lock().await.cancel();
    }
}

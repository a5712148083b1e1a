//! The `OpenAi` provider: wires `conduit-provider-kernel`'s retry/auth
//! plumbing and `conduit-streaming`'s chunk assembler to `mapping`/`error`,
//! plus the Embeddings and Images endpoints.
//!
//! Grounded on `neuron-provider-openai::lib`'s builder pattern
//! (`new`/`.with_url`/`.with_org`) and `embeddings.rs`'s embeddings call.

use std::sync::Arc;
use std::time::Instant;

use conduit_core::{
    AIProvider, AuthMethod, Availability, ChunkStream, ConduitError, EmbeddingGenerator,
    EmbeddingResult, GenerateConfig, GeneratedImage, GeneratedImageMetadata, GenerationResult,
    ImageFormat, ImageGenerationConfig, ImageGenerator, Message, TextGenerator,
};
use base64::Engine;
use conduit_provider_kernel::{apply_auth, dispatch_with_retry, RetryConfig};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{map_reqwest_error, refine_status_error};
use crate::mapping::{from_api_response, to_api_request};
use crate::streaming::OpenAiChunkDecoder;

/// Used when the caller does not pick a model explicitly.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Used when the caller does not pick an embedding model explicitly.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// Used when the caller does not pick an image model explicitly.
pub const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI API provider: Chat Completions, Embeddings, and Images.
#[derive(Clone)]
pub struct OpenAi {
    auth: AuthMethod,
    organization: Option<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
    retry: RetryConfig,
    cancellation: Arc<Mutex<CancellationToken>>,
}

impl OpenAi {
    /// Creates a provider using [`DEFAULT_MODEL`] and the public OpenAI API
    /// endpoint.
    #[must_use]
    pub fn new(auth: AuthMethod) -> Self {
        Self {
            auth,
            organization: None,
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

    /// Sets the `OpenAI-Organization` header for multi-org accounts.
    #[must_use]
    pub fn organization(mut self, org_id: impl Into<String>) -> Self {
        self.organization = Some(org_id.into());
        self
    }

    /// Overrides the retry/backoff policy.
    #[must_use]
    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'))
    }

    fn images_url(&self) -> String {
        format!("{}/v1/images/generations", self.base_url.trim_end_matches('/'))
    }

    async fn fresh_cancellation(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancellation.lock().await = token.clone();
        token
    }

    fn request(&self, url: &str, body: &impl serde::Serialize) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(url).json(body);
        if let Some(org) = &self.organization {
            builder = builder.header("openai-organization", org);
        }
        apply_auth(builder, &self.auth)
    }
}

impl TextGenerator for OpenAi {
    async fn generate(
        &self,
        messages: Vec<Message>,
        model_id: &str,
        config: &GenerateConfig,
    ) -> Result<GenerationResult, ConduitError> {
        let model = if model_id.is_empty() { &self.model } else { model_id };
        let body = to_api_request(&messages, model, config, false)?;
        let cancellation = self.fresh_cancellation().await;
        let url = self.chat_completions_url();

        let started = Instant::now();
        let response =
            dispatch_with_retry(&cancellation, &self.retry, |_attempt| self.request(&url, &body).send())
                .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(refine_status_error(status.as_u16()));
        }

        let parsed = response
            .json::<crate::types::OpenAiResponse>()
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
        let body = to_api_request(&messages, model, config, true)?;
        let cancellation = self.fresh_cancellation().await;
        let url = self.chat_completions_url();

        let response =
            dispatch_with_retry(&cancellation, &self.retry, |_attempt| self.request(&url, &body).send())
                .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(refine_status_error(status.as_u16()));
        }

        let byte_stream = response.bytes_stream();
        Ok(conduit_streaming::assemble_chunk_stream(
            byte_stream,
            OpenAiChunkDecoder::new(),
            cancellation,
        ))
    }
}

impl AIProvider for OpenAi {
    async fn availability(&self) -> Availability {
        match self.auth.resolve() {
            Some(_) => Availability::Available,
            None => {
                Availability::Unavailable("no OpenAI API key is configured for this provider".to_string())
            }
        }
    }

    async fn cancel_generation(&self) {
        self.cancellation.lock().await.cancel();
    }
}

impl EmbeddingGenerator for OpenAi {
    async fn embed(&self, text: &str, model_id: &str) -> Result<EmbeddingResult, ConduitError> {
        let results = self.embed_batch(vec![text.to_string()], model_id).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| ConduitError::ParseFailed("embeddings response had no entries".to_string()))
    }

    async fn embed_batch(
        &self,
        texts: Vec<String>,
        model_id: &str,
    ) -> Result<Vec<EmbeddingResult>, ConduitError> {
        let model = if model_id.is_empty() {
            DEFAULT_EMBEDDING_MODEL
        } else {
            model_id
        };
        let body = serde_json::json!({
            "model": model,
            "input": texts,
            "encoding_format": "float",
        });
        let cancellation = self.fresh_cancellation().await;
        let url = self.embeddings_url();

        let response =
            dispatch_with_retry(&cancellation, &self.retry, |_attempt| self.request(&url, &body).send())
                .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(refine_status_error(status.as_u16()));
        }

        let json = response
            .json::<serde_json::Value>()
            .await
            .map_err(map_reqwest_error)?;
        parse_embeddings_response(&json, model, &texts)
    }
}

impl ImageGenerator for OpenAi {
    async fn generate_image(
        &self,
        prompt: &str,
        negative_prompt: Option<&str>,
        config: &ImageGenerationConfig,
        model_id: &str,
    ) -> Result<GeneratedImage, ConduitError> {
        conduit_core::validate_prompt_length(prompt, 4000)?;
        let model = if model_id.is_empty() { DEFAULT_IMAGE_MODEL } else { model_id };

        let mut full_prompt = prompt.to_string();
        if let Some(negative) = negative_prompt {
            full_prompt.push_str(&format!("\n\nAvoid: {negative}"));
        }

        let body = serde_json::json!({
            "model": model,
            "prompt": full_prompt,
            "size": format!("{}x{}", config.width, config.height),
            "quality": config.quality,
            "n": 1,
        });
        let cancellation = self.fresh_cancellation().await;
        let url = self.images_url();

        let response =
            dispatch_with_retry(&cancellation, &self.retry, |_attempt| self.request(&url, &body).send())
                .await?;

        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(conduit_core::classify_image_error(&text));
        }

        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|err| ConduitError::ParseFailed(format!("invalid JSON response: {err}")))?;
        parse_image_response(&json, model)
    }
}

fn parse_embeddings_response(
    json: &serde_json::Value,
    model: &str,
    texts: &[String],
) -> Result<Vec<EmbeddingResult>, ConduitError> {
    let data = json["data"]
        .as_array()
        .ok_or_else(|| ConduitError::ParseFailed("missing 'data' array".to_string()))?;

    data.iter()
        .zip(texts)
        .map(|(item, source_text)| {
            let vector = item["embedding"]
                .as_array()
                .ok_or_else(|| ConduitError::ParseFailed("missing 'embedding' array".to_string()))?
                .iter()
                .map(|v| {
                    v.as_f64()
                        .map(|f| f as f32)
                        .ok_or_else(|| ConduitError::ParseFailed("non-numeric embedding value".to_string()))
                })
                .collect::<Result<Vec<f32>, _>>()?;
            Ok(EmbeddingResult {
                vector,
                source_text: source_text.clone(),
                model: model.to_string(),
                token_count: None,
            })
        })
        .collect()
}

fn parse_image_response(json: &serde_json::Value, model: &str) -> Result<GeneratedImage, ConduitError> {
    let item = json["data"]
        .get(0)
        .ok_or_else(|| ConduitError::ParseFailed("missing 'data' array".to_string()))?;
    let b64 = item["b64_json"]
        .as_str()
        .ok_or_else(|| ConduitError::ParseFailed("missing 'b64_json' field".to_string()))?;
    let data = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|err| ConduitError::ParseFailed(format!("invalid base64 image data: {err}")))?;

    Ok(GeneratedImage {
        data,
        format: ImageFormat::Png,
        metadata: GeneratedImageMetadata {
            revised_prompt: item["revised_prompt"].as_str().map(str::to_string),
            created_at: None,
            model: Some(model.to_string()),
        },
    })
}

//! The error taxonomy shared across providers, tools, and sessions.

use std::time::Duration;

/// Category tag for grouping errors in user-facing UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Provider-level unavailability or capability mismatch.
    Provider,
    /// Generation-time failure (content, limits, cancellation).
    Generation,
    /// Transport/network failure.
    Network,
    /// Local resource exhaustion (memory, disk, download).
    Resource,
    /// Malformed caller input.
    Input,
    /// Tool invocation failure.
    Tool,
}

/// Why a provider is unavailable.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum UnavailableReason {
    /// The current device/runtime cannot host this provider.
    #[error("device not supported")]
    DeviceNotSupported,
    /// The host OS version is too old.
    #[error("OS version not met")]
    OsVersionNotMet,
    /// No API key was configured.
    #[error("API key missing")]
    ApiKeyMissing,
    /// No network connectivity.
    #[error("no network")]
    NoNetwork,
    /// Any other reason, given as free text.
    #[error("{0}")]
    Unknown(String),
}

/// The unified error type for all `conduit` operations.
///
/// Mirrors `spec.md §7`'s error kind union: every variant carries enough
/// information to render a human recovery suggestion and to classify
/// retryability without inspecting a wrapped string.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConduitError {
    // --- Provider ---
    /// The provider cannot currently serve requests.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(#[source] UnavailableReason),
    /// Authentication failed.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    /// The requested model does not exist for this provider.
    #[error("model not found: {0}")]
    ModelNotFound(String),
    /// The requested model exists but is not cached locally.
    #[error("model not cached: {0}")]
    ModelNotCached(String),
    /// The requested model is incompatible with this host for the given reasons.
    #[error("model {model_id} incompatible: {reasons:?}")]
    IncompatibleModel {
        /// The model identifier.
        model_id: String,
        /// Human-readable incompatibility reasons.
        reasons: Vec<String>,
    },

    // --- Generation ---
    /// Generation failed for a reason not otherwise classified.
    #[error("generation failed: {0}")]
    GenerationFailed(String),
    /// The response would exceed, or did exceed, a token budget.
    #[error("token limit exceeded: {count} > {limit}")]
    TokenLimitExceeded {
        /// The token count that was requested/produced.
        count: u32,
        /// The configured limit.
        limit: u32,
    },
    /// Content was filtered by the backend's safety system.
    #[error("content filtered: {0}")]
    ContentFiltered(String),
    /// The caller cancelled the operation.
    #[error("cancelled")]
    Cancelled,
    /// The operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    /// The backend does not support the requested language.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    // --- Network ---
    /// A network-level error occurred.
    #[error("network error: {0}")]
    NetworkError(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The backend returned a server error.
    #[error("server error {status_code}: {message:?}")]
    ServerError {
        /// HTTP status code.
        status_code: u16,
        /// Optional message from the response body.
        message: Option<String>,
    },
    /// The backend rate-limited this request.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested retry delay, if the backend provided one.
        retry_after: Option<Duration>,
    },

    // --- Resource ---
    /// Insufficient memory to complete the operation.
    #[error("insufficient memory: need {required}, have {available}")]
    InsufficientMemory {
        /// Bytes required.
        required: u64,
        /// Bytes available.
        available: u64,
    },
    /// Insufficient disk space to complete the operation.
    #[error("insufficient disk space: need {required}, have {available}")]
    InsufficientDiskSpace {
        /// Bytes required.
        required: u64,
        /// Bytes available.
        available: u64,
    },
    /// A model download failed.
    #[error("download failed: {0}")]
    DownloadFailed(String),
    /// A downloaded artifact's checksum did not match.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Expected checksum.
        expected: String,
        /// Actual checksum.
        actual: String,
    },

    // --- Input ---
    /// The caller supplied invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// An unsupported audio format was supplied.
    #[error("unsupported audio format: {0}")]
    UnsupportedAudioFormat(String),

    // --- Tool ---
    /// A tool invocation failed; see `conduit_tool::ToolError` for detail kinds.
    #[error("tool error: {0}")]
    Tool(#[source] Box<dyn std::error::Error + Send + Sync>),

    // --- Streaming (internal, surfaced per §4.6/§4.5) ---
    /// The partial-JSON engine or structured-output accumulator failed to parse.
    #[error("parse failed: {0}")]
    ParseFailed(String),
    /// A wire value failed to convert into a typed value.
    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    /// Catch-all for anything not otherwise classified.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ConduitError {
    /// Whether this error is likely transient and the operation may be retried.
    ///
    /// Matches `spec.md §7`: `RateLimited`, retryable `ServerError`s, `Timeout`,
    /// and a subset of `NetworkError` are retryable; everything else,
    /// including `Cancelled`, is terminal.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout(_) | Self::NetworkError(_) => true,
            Self::ServerError { status_code, .. } => is_retryable_status(*status_code),
            _ => false,
        }
    }

    /// The category tag for UI grouping.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderUnavailable(_)
            | Self::AuthenticationFailed(_)
            | Self::ModelNotFound(_)
            | Self::ModelNotCached(_)
            | Self::IncompatibleModel { .. } => ErrorCategory::Provider,
            Self::GenerationFailed(_)
            | Self::TokenLimitExceeded { .. }
            | Self::ContentFiltered(_)
            | Self::Cancelled
            | Self::Timeout(_)
            | Self::UnsupportedLanguage(_)
            | Self::ParseFailed(_)
            | Self::ConversionFailed(_) => ErrorCategory::Generation,
            Self::NetworkError(_) | Self::ServerError { .. } | Self::RateLimited { .. } => {
                ErrorCategory::Network
            }
            Self::InsufficientMemory { .. }
            | Self::InsufficientDiskSpace { .. }
            | Self::DownloadFailed(_)
            | Self::ChecksumMismatch { .. } => ErrorCategory::Resource,
            Self::InvalidInput(_) | Self::UnsupportedAudioFormat(_) => ErrorCategory::Input,
            Self::Tool(_) => ErrorCategory::Tool,
            Self::Other(_) => ErrorCategory::Generation,
        }
    }

    /// A short, human-readable recovery suggestion.
    #[must_use]
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable(_) => "check provider configuration and availability",
            Self::AuthenticationFailed(_) => "verify the API key or credential is valid",
            Self::ModelNotFound(_) => "check the model identifier is correct for this provider",
            Self::ModelNotCached(_) => "download the model before use",
            Self::IncompatibleModel { .. } => "choose a model compatible with this host",
            Self::GenerationFailed(_) => "retry the request or adjust the prompt",
            Self::TokenLimitExceeded { .. } => "shorten the input or raise the token limit",
            Self::ContentFiltered(_) => "adjust the prompt to satisfy content policy",
            Self::Cancelled => "the operation was cancelled; issue a new request if needed",
            Self::Timeout(_) => "retry with a longer timeout or smaller request",
            Self::UnsupportedLanguage(_) => "use a supported language or a different backend",
            Self::NetworkError(_) => "check network connectivity and retry",
            Self::ServerError { .. } => "retry later; this is a backend-side failure",
            Self::RateLimited { .. } => "wait for the suggested retry delay before retrying",
            Self::InsufficientMemory { .. } => "free memory or use a smaller model",
            Self::InsufficientDiskSpace { .. } => "free disk space before downloading",
            Self::DownloadFailed(_) => "retry the download",
            Self::ChecksumMismatch { .. } => "re-download the artifact",
            Self::InvalidInput(_) => "correct the request input",
            Self::UnsupportedAudioFormat(_) => "convert audio to a supported format",
            Self::Tool(_) => "inspect the tool error and retry if appropriate",
            Self::ParseFailed(_) => "the model output was not valid JSON for this schema",
            Self::ConversionFailed(_) => "check that the value matches the expected schema",
            Self::Other(_) => "see the underlying error for detail",
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 500..=599) && status != 501
}

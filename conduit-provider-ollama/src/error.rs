//! Refines the generic `ConduitError::ServerError` that
//! `conduit_provider_kernel::dispatch_with_retry` returns for non-retryable
//! status codes into Ollama-specific variants.
//!
//! Simpler than the cloud vendors' mapping: a local Ollama daemon has no
//! auth and no rate limiting, so there is nothing to special-case beyond
//! "model not found" and "bad request".

use conduit_core::ConduitError;

#[must_use]
pub fn refine_status_error(status_code: u16) -> ConduitError {
    match status_code {
        404 => ConduitError::ModelNotFound(format!("HTTP {status_code} from Ollama")),
        400 => ConduitError::InvalidInput("Ollama rejected the request (HTTP 400)".to_string()),
        _ => ConduitError::ServerError {
            status_code,
            message: None,
        },
    }
}

/// Maps a `reqwest` transport error (connect/build, not an HTTP status) to a
/// `ConduitError`.
///
/// A connection refused here usually means the local daemon isn't running,
/// which `conduit_core::AIProvider::availability` should surface instead;
/// this only covers errors encountered mid-request.
pub fn map_reqwest_error(err: reqwest::Error) -> ConduitError {
    if err.is_timeout() {
        ConduitError::Timeout(std::time::Duration::from_secs(0))
    } else {
        ConduitError::NetworkError(Box::new(err))
    }
}

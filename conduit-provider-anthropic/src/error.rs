//! Refines the generic `ConduitError::ServerError` that
//! `conduit_provider_kernel::dispatch_with_retry` returns for non-retryable,
//! non-429 status codes into Anthropic-specific variants.
//!
//! Reference: <https://docs.anthropic.com/en/api/errors>

use conduit_core::{ConduitError, UnavailableReason};

/// Re-classify a non-retryable HTTP status from the Anthropic Messages API.
///
/// `dispatch_with_retry` already handles 429 (rate limit) and retryable 5xx
/// (retry loop) before this is reached; this only narrows the terminal
/// `ServerError` case.
#[must_use]
pub fn refine_status_error(status_code: u16) -> ConduitError {
    match status_code {
        401 | 403 => ConduitError::AuthenticationFailed(format!(
            "Anthropic rejected the request credentials (HTTP {status_code})"
        )),
        404 => ConduitError::ModelNotFound(format!("HTTP {status_code} from Anthropic")),
        400 => ConduitError::InvalidInput("Anthropic rejected the request (HTTP 400)".to_string()),
        // 529 is Anthropic's "overloaded" status, distinct from a 5xx bug.
        529 => ConduitError::ProviderUnavailable(UnavailableReason::Unknown(
            "Anthropic reports the API is overloaded (HTTP 529)".to_string(),
        )),
        _ => ConduitError::ServerError {
            status_code,
            message: None,
        },
    }
}

/// Maps a `reqwest` transport error (connect/build, not an HTTP status) to a
/// `ConduitError`.
pub fn map_reqwest_error(err: reqwest::Error) -> ConduitError {
    if err.is_timeout() {
        ConduitError::Timeout(std::time::Duration::from_secs(0))
    } else {
        ConduitError::NetworkError(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_authentication_failed() {
        assert!(matches!(
            refine_status_error(401),
            ConduitError::AuthenticationFailed(_)
        ));
    }

    #[test]
    fn not_found_maps_to_model_not_found() {
        assert!(matches!(
            refine_status_error(404),
            ConduitError::ModelNotFound(_)
        ));
    }

    #[test]
    fn overloaded_maps_to_provider_unavailable() {
        assert!(matches!(
            refine_status_error(529),
            ConduitError::ProviderUnavailable(_)
        ));
    }

    #[test]
    fn unmapped_status_falls_back_to_server_error() {
        assert!(matches!(
            refine_status_error(502),
            ConduitError::ServerError {
                status_code: 502,
                ..
            }
        ));
    }
}

//! Attempt-numbered dispatch with capped exponential backoff, shared by
//! every remote provider (`spec.md §4.2`).

use std::future::Future;
use std::time::Duration;

use conduit_core::ConduitError;
use reqwest::Response;
use tokio_util::sync::CancellationToken;

/// Backoff parameters for [`dispatch_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Number of retries after the initial attempt (so `max_retries + 1`
    /// total attempts).
    pub max_retries: u32,
    /// Base delay for the exponential backoff, before the cap.
    pub base_delay: Duration,
    /// Hard cap on any single backoff sleep, per `spec.md §4.2`.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    /// Three retries, 500ms base delay, 60s cap.
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// The backoff delay for attempt `n` (0-indexed), `min(max_delay, base
    /// * 2^n)`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.saturating_mul(1u32 << attempt.min(31));
        scaled.min(self.max_delay)
    }
}

/// Whether an HTTP status code is in the retryable 5xx set.
///
/// `501 Not Implemented` is excluded: it indicates the backend will never
/// support the request, not a transient failure, matching
/// `conduit_core::ConduitError::is_retryable`'s `ServerError` handling.
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 500..=599) && status != 501
}

/// Dispatches `send` up to `config.max_retries + 1` times, honoring
/// `cancellation` before each attempt and during backoff sleeps.
///
/// `send` is called once per attempt (the attempt index, 0-based) and
/// should issue a fresh HTTP request each time (request bodies are not
/// reusable across attempts in `reqwest`). On a `2xx` response the response
/// is returned as-is for the caller to parse. Per `spec.md §4.2`: a `429`
/// fails immediately with `RateLimited` without being retried here; a
/// retryable `5xx` is retried; any other non-2xx status fails fast.
///
/// # Errors
///
/// Returns `ConduitError::Cancelled` if `cancellation` fires before or
/// during an attempt. Returns `ConduitError::RateLimited`,
/// `ConduitError::ServerError`, `ConduitError::Timeout`, or
/// `ConduitError::NetworkError` depending on how the final attempt failed.
pub async fn dispatch_with_retry<F, Fut>(
    cancellation: &CancellationToken,
    config: &RetryConfig,
    mut send: F,
) -> Result<Response, ConduitError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut last_error = ConduitError::GenerationFailed("no attempt was made".to_string());

    for attempt in 0..=config.max_retries {
        if cancellation.is_cancelled() {
            return Err(ConduitError::Cancelled);
        }

        if attempt > 0 {
            let delay = config.delay_for_attempt(attempt - 1);
            tracing::debug!(attempt, ?delay, "retrying after backoff");
            tokio::select! {
                biased;
                () = cancellation.cancelled() => return Err(ConduitError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }

        match send(attempt).await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                if status.as_u16() == 429 {
                    let retry_after = parse_retry_after(&response);
                    tracing::warn!(retry_after = ?retry_after, "rate limited");
                    return Err(ConduitError::RateLimited { retry_after });
                }
                if is_retryable_status(status.as_u16()) {
                    tracing::warn!(status = status.as_u16(), attempt, "retryable server error");
                    last_error = ConduitError::ServerError {
                        status_code: status.as_u16(),
                        message: None,
                    };
                    continue;
                }
                return Err(ConduitError::ServerError {
                    status_code: status.as_u16(),
                    message: None,
                });
            }
            Err(err) if err.is_timeout() => {
                tracing::warn!(attempt, "request timed out");
                last_error = ConduitError::Timeout(Duration::from_secs(0));
                continue;
            }
            Err(err) if err.is_connect() => {
                tracing::warn!(attempt, error = %err, "connection lost");
                last_error = ConduitError::NetworkError(Box::new(err));
                continue;
            }
            Err(err) => {
                return Err(ConduitError::NetworkError(Box::new(err)));
            }
        }
    }

    Err(last_error)
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_and_caps_at_max_delay() {
        let config = RetryConfig {
            max_retries: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(8));
    }

    #[test]
    fn delay_is_non_decreasing_until_capped() {
        let config = RetryConfig::default();
        let mut prev = Duration::from_secs(0);
        for attempt in 0..10 {
            let d = config.delay_for_attempt(attempt);
            assert!(d >= prev);
            assert!(d <= config.max_delay);
            prev = d;
        }
    }

    #[test]
    fn retryable_status_excludes_501() {
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(501));
        assert!(!is_retryable_status(404));
    }

    #[tokio::test]
    async fn cancellation_before_first_attempt_short_circuits() {
        let cancellation = CancellationToken::new();
        cancellation.cancel();
        let config = RetryConfig::default();
        let mut calls = 0;
        let result = dispatch_with_retry(&cancellation, &config, |_attempt| {
            calls += 1;
            async { unreachable!("send should never be called once cancelled") }
        })
        .await;
        assert!(matches!(result, Err(ConduitError::Cancelled)));
        assert_eq!(calls, 0);
    }
}

//! Tool error taxonomy and retry policy (`spec.md §7`'s Tool category).

/// Errors from tool registration, argument parsing, or invocation.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The JSON arguments didn't parse, or didn't match the tool's `Args`
    /// shape.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// No tool is registered under the requested name.
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    /// The tool ran and failed.
    #[error("tool execution failed: {0}")]
    ExecutionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The tool did not complete within its allotted time.
    #[error("tool call timed out")]
    Timeout,
    /// The tool call was cancelled before or during invocation.
    #[error("tool call was cancelled")]
    Cancelled,
}

impl ToolError {
    /// Whether a retry policy of [`RetryPolicy::RetryableErrors`] should
    /// count this as retryable. Only failures plausibly transient —
    /// execution failure and timeout — qualify; argument and lookup errors
    /// will fail identically on retry, and a cancellation should never be
    /// retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExecutionFailed(_) | Self::Timeout)
    }
}

/// How many times, and under what conditions, a failed tool invocation is
/// retried.
#[derive(Debug, Clone, Copy, Default)]
pub enum RetryPolicy {
    /// Never retry.
    #[default]
    None,
    /// Retry only errors [`ToolError::is_retryable`] reports as retryable,
    /// up to `max_attempts` total attempts.
    RetryableErrors {
        /// Total attempts, including the first.
        max_attempts: u32,
    },
    /// Retry any failure except [`ToolError::Cancelled`], up to
    /// `max_attempts` total attempts.
    AllExceptCancellation {
        /// Total attempts, including the first.
        max_attempts: u32,
    },
}

impl RetryPolicy {
    /// Whether `attempt` (1-based, the attempt that just failed with
    /// `error`) should be followed by another attempt.
    #[must_use]
    pub fn should_retry(&self, attempt: u32, error: &ToolError) -> bool {
        match self {
            Self::None => false,
            Self::RetryableErrors { max_attempts } => {
                attempt < *max_attempts && error.is_retryable()
            }
            Self::AllExceptCancellation { max_attempts } => {
                attempt < *max_attempts && !matches!(error, ToolError::Cancelled)
            }
        }
    }
}

/// What happens when a requested tool name isn't registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingToolPolicy {
    /// Fail the call with [`ToolError::ToolNotFound`].
    #[default]
    Throw,
    /// Succeed with a tool-result message carrying a formatted error.
    EmitFormattedError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors_policy_only_retries_retryable_kinds() {
        let policy = RetryPolicy::RetryableErrors { max_attempts: 3 };
        assert!(policy.should_retry(1, &ToolError::Timeout));
        assert!(!policy.should_retry(1, &ToolError::InvalidArguments("x".into())));
        assert!(!policy.should_retry(3, &ToolError::Timeout));
    }

    #[test]
    fn all_except_cancellation_retries_everything_but_cancelled() {
        let policy = RetryPolicy::AllExceptCancellation { max_attempts: 2 };
        assert!(policy.should_retry(1, &ToolError::InvalidArguments("x".into())));
        assert!(!policy.should_retry(1, &ToolError::Cancelled));
        assert!(!policy.should_retry(2, &ToolError::InvalidArguments("x".into())));
    }

    #[test]
    fn none_never_retries() {
        assert!(!RetryPolicy::None.should_retry(1, &ToolError::Timeout));
    }
}

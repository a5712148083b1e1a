#![doc = include_str!("../README.md")]

mod auth;
mod retry;

pub use auth::apply_auth;
pub use retry::{dispatch_with_retry, is_retryable_status, RetryConfig};

//! Warmup: forces JIT/shader kernel compilation by generating a handful of
//! throwaway tokens right after a model loads (`spec.md §4.11`).

use std::future::Future;

use conduit_core::ConduitError;

/// When warmup runs relative to a session's construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarmupPolicy {
    /// Warmup is deferred until the first real generation request.
    #[default]
    Lazy,
    /// Warmup runs immediately once the model is loaded.
    Eager,
}

/// Default number of throwaway tokens generated during warmup.
pub const DEFAULT_WARMUP_TOKENS: u32 = 5;

/// Runs `generate_fn` for `token_count` tokens and discards the output,
/// forcing the engine to compile any lazily-initialized kernels.
///
/// `generate_fn` is expected to perform a minimal real generation against
/// the already-loaded model (e.g. a one-token prompt) and return once
/// `token_count` tokens have been produced.
///
/// # Errors
///
/// Propagates whatever error `generate_fn` returns; a failed warmup does
/// not unload the model.
pub async fn warmup<F, Fut>(token_count: u32, generate_fn: F) -> Result<(), ConduitError>
where
    F: FnOnce(u32) -> Fut,
    Fut: Future<Output = Result<(), ConduitError>>,
{
    tracing::debug!(token_count, "running model warmup");
    generate_fn(token_count).await
}

//! The stream handle type returned by streaming capability contracts.

use std::fmt;
use std::pin::Pin;

use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::error::ConduitError;
use crate::types::GenerationChunk;

/// A boxed stream of chunks, with an attached cancellation handle.
///
/// `cancel()` propagates to the producing task: the provider kernel
/// (`conduit-provider-kernel`) watches this same token and aborts any
/// in-flight HTTP read or backoff sleep when it fires, per `spec.md §5`.
pub struct ChunkStream {
    inner: Pin<Box<dyn Stream<Item = Result<GenerationChunk, ConduitError>> + Send>>,
    cancellation: CancellationToken,
}

impl ChunkStream {
    /// Wrap a boxed stream together with the cancellation token that, when
    /// triggered, should cause the stream's producer to stop.
    #[must_use]
    pub fn new(
        inner: Pin<Box<dyn Stream<Item = Result<GenerationChunk, ConduitError>> + Send>>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            inner,
            cancellation,
        }
    }

    /// Signal cancellation to the producing task.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// The cancellation token backing this stream, for providers that need
    /// to share it with a retry/backoff loop.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}

impl Stream for ChunkStream {
    type Item = Result<GenerationChunk, ConduitError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkStream").finish_non_exhaustive()
    }
}

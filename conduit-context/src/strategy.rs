//! Context compaction strategies.
//!
//! Not named by any `spec.md` operation, but a natural adjacent capability
//! already provided by `neuron-context::strategies`; `conduit-session` uses
//! this only when a caller opts in, as a supplemented feature.

use std::future::Future;

use conduit_core::{Message, Role, WasmCompatSend};

use crate::counter::TokenCounter;

/// What a compaction pass decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionOutcome {
    /// The surviving messages, in original relative order.
    pub messages: Vec<Message>,
    /// How many messages were dropped.
    pub dropped: usize,
}

/// A strategy for keeping a conversation's estimated token count under a
/// budget.
pub trait ContextStrategy: WasmCompatSend {
    /// Whether `messages` currently needs compaction.
    fn should_compact(&self, messages: &[Message]) -> bool;

    /// Compact `messages`, returning the surviving set.
    fn compact(
        &self,
        messages: Vec<Message>,
    ) -> impl Future<Output = CompactionOutcome> + WasmCompatSend;

    /// The estimated token count of `messages` under this strategy's counter.
    fn token_estimate(&self, messages: &[Message]) -> usize;
}

/// A strategy that never compacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompaction;

impl ContextStrategy for NoCompaction {
    fn should_compact(&self, _messages: &[Message]) -> bool {
        false
    }

    async fn compact(&self, messages: Vec<Message>) -> CompactionOutcome {
        CompactionOutcome {
            messages,
            dropped: 0,
        }
    }

    fn token_estimate(&self, messages: &[Message]) -> usize {
        TokenCounter::new().estimate_messages(messages)
    }
}

/// Keeps any leading system message plus the most recent `window_size`
/// non-system messages; triggers when the estimated token count exceeds
/// `max_tokens`.
#[derive(Debug, Clone)]
pub struct SlidingWindowStrategy {
    window_size: usize,
    max_tokens: usize,
    counter: TokenCounter,
}

impl SlidingWindowStrategy {
    /// `window_size` bounds how many non-system messages survive a
    /// compaction; `max_tokens` is the estimated-token threshold that
    /// triggers one.
    #[must_use]
    pub fn new(window_size: usize, max_tokens: usize) -> Self {
        Self {
            window_size,
            max_tokens,
            counter: TokenCounter::new(),
        }
    }

    /// Like [`Self::new`] with a caller-supplied [`TokenCounter`].
    #[must_use]
    pub fn with_counter(window_size: usize, max_tokens: usize, counter: TokenCounter) -> Self {
        Self {
            window_size,
            max_tokens,
            counter,
        }
    }
}

impl ContextStrategy for SlidingWindowStrategy {
    fn should_compact(&self, messages: &[Message]) -> bool {
        self.token_estimate(messages) > self.max_tokens
    }

    async fn compact(&self, messages: Vec<Message>) -> CompactionOutcome {
        let original_len = messages.len();
        let (system, non_system): (Vec<_>, Vec<_>) =
            messages.into_iter().partition(|m| m.role == Role::System);

        let recent: Vec<Message> = non_system
            .into_iter()
            .rev()
            .take(self.window_size)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        let mut kept = system;
        let dropped = original_len - kept.len() - recent.len();
        kept.extend(recent);

        CompactionOutcome {
            messages: kept,
            dropped,
        }
    }

    fn token_estimate(&self, messages: &[Message]) -> usize {
        self.counter.estimate_messages(messages)
    }
}

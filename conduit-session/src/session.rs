//! The chat session orchestrator (`spec.md §4.8`).
//!
//! Grounded on `agent-runtime::session`'s state/storage separation and
//! `agent-loop::loop_impl::AgentLoop`'s generate → tool-execute → reinject
//! loop, generalized to `conduit_core::{TextGenerator, AIProvider}` and a
//! `conduit_tool::ToolExecutor` instead of a single hardcoded
//! provider/tool-registry pair.

use std::sync::Arc;

use conduit_context::ContextStrategy;
use conduit_core::{
    AIProvider, ConduitError, ContentPart, FinishReason, GenerateConfig, GenerationResult, Message,
    Role,
};
use conduit_local::WarmupPolicy;
use conduit_tool::ToolExecutor;
use futures::Stream;
use tokio::sync::Mutex;

/// Default cap on tool-calling turns within a single `send`/`stream` call,
/// guarding against a model that never stops requesting tools.
pub const DEFAULT_MAX_TOOL_TURNS: usize = 25;

/// A single exchange's outcome, returned by [`ChatSession::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReply {
    /// The final assistant text.
    pub text: String,
    /// How many generate/tool-execute turns the exchange took.
    pub turns: usize,
}

/// A mutex-guarded chat session: an ordered message log, a provider, and
/// an optional tool-calling loop.
///
/// `C` is an optional [`ContextStrategy`] applied before each generation;
/// defaults to [`conduit_context::NoCompaction`]. Every read or write of
/// the message log takes the same lock, matching `spec.md §4.8`'s
/// `withLock`-guarded state.
pub struct ChatSession<P: AIProvider, C: ContextStrategy = conduit_context::NoCompaction> {
    provider: P,
    model_id: String,
    config: GenerateConfig,
    tool_executor: Option<ToolExecutor>,
    warmup_policy: Option<WarmupPolicy>,
    context_strategy: C,
    max_tool_turns: usize,
    messages: Arc<Mutex<Vec<Message>>>,
}

impl<P: AIProvider> ChatSession<P, conduit_context::NoCompaction> {
    /// Creates a session with no context-compaction strategy.
    pub fn new(provider: P, model_id: impl Into<String>, config: GenerateConfig) -> Self {
        Self::with_context_strategy(
            provider,
            model_id,
            config,
            conduit_context::NoCompaction,
        )
    }
}

impl<P: AIProvider, C: ContextStrategy> ChatSession<P, C> {
    /// Creates a session using `context_strategy` to compact history before
    /// each generation.
    pub fn with_context_strategy(
        provider: P,
        model_id: impl Into<String>,
        config: GenerateConfig,
        context_strategy: C,
    ) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            config,
            tool_executor: None,
            warmup_policy: None,
            context_strategy,
            max_tool_turns: DEFAULT_MAX_TOOL_TURNS,
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Attaches a tool executor, enabling the generate/tool-execute loop.
    #[must_use]
    pub fn with_tool_executor(mut self, executor: ToolExecutor) -> Self {
        self.tool_executor = Some(executor);
        self
    }

    /// Sets the warmup policy, consulted by callers wiring a local-inference
    /// provider; this session does not invoke warmup itself, matching
    /// `spec.md §4.11`'s "eager sessions invoke warmup on construction"
    /// being the caller's (not the session's) responsibility once a model
    /// handle is available.
    #[must_use]
    pub fn with_warmup_policy(mut self, policy: WarmupPolicy) -> Self {
        self.warmup_policy = Some(policy);
        self
    }

    /// Caps how many generate/tool-execute turns a single `send`/`stream`
    /// call may take before failing with `ConduitError::GenerationFailed`.
    #[must_use]
    pub fn with_max_tool_turns(mut self, max_tool_turns: usize) -> Self {
        self.max_tool_turns = max_tool_turns;
        self
    }

    /// The configured warmup policy, if any.
    #[must_use]
    pub fn warmup_policy(&self) -> Option<WarmupPolicy> {
        self.warmup_policy
    }

    /// A snapshot of the current message log.
    pub async fn messages(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }

    /// Sets the system prompt: replaces an existing leading system message,
    /// or inserts one at index 0.
    pub async fn set_system_prompt(&self, text: impl Into<String>) {
        let mut messages = self.messages.lock().await;
        let system = Message::system(text);
        match messages.first_mut() {
            Some(first) if first.role == Role::System => *first = system,
            _ => messages.insert(0, system),
        }
    }

    /// Removes all messages except a leading system message, if present.
    pub async fn clear_history(&self) {
        let mut messages = self.messages.lock().await;
        let keep = messages.first().is_some_and(|m| m.role == Role::System) as usize;
        messages.truncate(keep);
    }

    /// Undoes the last exchange: pops a trailing assistant message, then a
    /// newly-trailing user message, if present.
    pub async fn undo_last_exchange(&self) {
        let mut messages = self.messages.lock().await;
        if messages.last().is_some_and(|m| m.role == Role::Assistant) {
            messages.pop();
        }
        if messages.last().is_some_and(|m| m.role == Role::User) {
            messages.pop();
        }
    }

    /// Merges an externally-supplied history into this session.
    ///
    /// If the session already carries a system message, it is kept as-is;
    /// otherwise a leading system message from `history` is adopted. Every
    /// non-system message in `history` is then appended, in order.
    pub async fn inject_history(&self, history: Vec<Message>) {
        let mut messages = self.messages.lock().await;
        let has_system = messages.first().is_some_and(|m| m.role == Role::System);

        let mut iter = history.into_iter().peekable();
        if !has_system {
            if iter.peek().is_some_and(|m| m.role == Role::System) {
                messages.insert(0, iter.next().expect("peeked Some"));
            }
        } else if iter.peek().is_some_and(|m| m.role == Role::System) {
            iter.next();
        }

        messages.extend(iter.filter(|m| m.role != Role::System));
    }

    /// Propagates cancellation to the provider.
    pub async fn cancel(&self) {
        self.provider.cancel_generation().await;
    }

    /// Appends `text` as a user message, runs the generate/tool loop to
    /// completion, and returns the final assistant text.
    ///
    /// # Errors
    ///
    /// Returns `ConduitError::GenerationFailed` if the tool loop exceeds
    /// `max_tool_turns`, or whatever error the provider/tool executor
    /// produced.
    pub async fn send(&self, text: impl Into<String>) -> Result<SessionReply, ConduitError> {
        {
            let mut messages = self.messages.lock().await;
            messages.push(Message::user(text.into()));
        }

        let mut turns = 0usize;
        loop {
            turns += 1;
            if turns > self.max_tool_turns {
                return Err(ConduitError::GenerationFailed(format!(
                    "exceeded max tool turns ({})",
                    self.max_tool_turns
                )));
            }

            let request_messages = self.compacted_messages().await;
            let result = self
                .provider
                .generate(request_messages, &self.model_id, &self.config)
                .await?;

            {
                let mut messages = self.messages.lock().await;
                messages.push(assistant_message_from_result(&result));
            }

            if !is_tool_turn(&result) {
                return Ok(SessionReply {
                    text: result.text,
                    turns,
                });
            }

            self.execute_tool_calls(&result).await?;
        }
    }

    /// Like [`Self::send`], but yields text fragments as they stream in.
    ///
    /// The tool loop is transparent: fragments from intermediate,
    /// tool-invoking turns are not yielded, only the final turn's text, per
    /// `spec.md §4.8`.
    ///
    /// # Errors
    ///
    /// The returned stream yields `Err` if the provider or tool executor
    /// fails, or if the tool loop exceeds `max_tool_turns`.
    pub async fn stream(
        &self,
        text: impl Into<String>,
    ) -> Result<impl Stream<Item = Result<String, ConduitError>> + Send + '_, ConduitError> {
        {
            let mut messages = self.messages.lock().await;
            messages.push(Message::user(text.into()));
        }

        Ok(async_stream::try_stream! {
            let mut turns = 0usize;
            loop {
                turns += 1;
                if turns > self.max_tool_turns {
                    Err(ConduitError::GenerationFailed(format!(
                        "exceeded max tool turns ({})",
                        self.max_tool_turns
                    )))?;
                }

                let request_messages = self.compacted_messages().await;
                let result = self
                    .provider
                    .generate(request_messages, &self.model_id, &self.config)
                    .await?;

                {
                    let mut messages = self.messages.lock().await;
                    messages.push(assistant_message_from_result(&result));
                }

                if !is_tool_turn(&result) {
                    yield result.text;
                    return;
                }

                self.execute_tool_calls(&result).await?;
            }
        })
    }

    async fn compacted_messages(&self) -> Vec<Message> {
        let current = self.messages.lock().await.clone();
        if !self.context_strategy.should_compact(&current) {
            return current;
        }
        let outcome = self.context_strategy.compact(current).await;
        tracing::debug!(dropped = outcome.dropped, "compacted session history");
        let mut messages = self.messages.lock().await;
        *messages = outcome.messages.clone();
        outcome.messages
    }

    async fn execute_tool_calls(&self, result: &GenerationResult) -> Result<(), ConduitError> {
        let executor = self.tool_executor.as_ref().ok_or_else(|| {
            ConduitError::GenerationFailed(
                "model requested a tool call but no tool executor is configured".to_string(),
            )
        })?;

        for call in &result.tool_calls {
            let tool_message = executor
                .execute(&call.id, &call.name, call.arguments.clone())
                .await
                .map_err(|e| ConduitError::Tool(Box::new(e)))?;
            self.messages.lock().await.push(tool_message);
        }
        Ok(())
    }
}

fn is_tool_turn(result: &GenerationResult) -> bool {
    result.finish_reason == FinishReason::ToolCall && !result.tool_calls.is_empty()
}

fn assistant_message_from_result(result: &GenerationResult) -> Message {
    let mut content = Vec::new();
    if !result.text.is_empty() {
        content.push(ContentPart::Text(result.text.clone()));
    }
    for call in &result.tool_calls {
        content.push(ContentPart::ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        });
    }
    if content.is_empty() {
        content.push(ContentPart::Text(String::new()));
    }
    Message {
        content,
        ..Message::assistant(String::new())
    }
}

//! Ties a [`ToolRegistry`] to a missing-tool policy and a retry policy,
//! producing the `Message::tool(...)` a chat session's tool loop injects
//! back into the conversation.

use conduit_core::Message;

use crate::error::{MissingToolPolicy, RetryPolicy, ToolError};
use crate::registry::ToolRegistry;
use crate::tool::Tool;

/// Executes completed tool calls against a [`ToolRegistry`], applying a
/// missing-tool policy and a retry policy.
pub struct ToolExecutor {
    registry: ToolRegistry,
    missing_tool_policy: MissingToolPolicy,
    retry_policy: RetryPolicy,
}

impl ToolExecutor {
    /// Creates an executor with an empty registry and no retries.
    #[must_use]
    pub fn new(missing_tool_policy: MissingToolPolicy) -> Self {
        Self {
            registry: ToolRegistry::new(),
            missing_tool_policy,
            retry_policy: RetryPolicy::None,
        }
    }

    /// Registers a tool.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.registry.register(tool);
    }

    /// Sets the retry policy applied to invocation failures.
    pub fn set_retry_policy(&mut self, policy: RetryPolicy) {
        self.retry_policy = policy;
    }

    /// Read access to the underlying registry, e.g. for `definitions()`.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Mutable access to the underlying registry, e.g. to add middleware.
    pub fn registry_mut(&mut self) -> &mut ToolRegistry {
        &mut self.registry
    }

    /// Executes `name` with `arguments`, returning the `Message::tool(...)`
    /// to inject into the conversation.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ToolNotFound`] when `name` isn't registered and
    /// the missing-tool policy is [`MissingToolPolicy::Throw`]; otherwise a
    /// missing tool succeeds with a formatted error message. Returns
    /// whatever error the retry policy ultimately gives up on.
    pub async fn execute(
        &self,
        call_id: &str,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<Message, ToolError> {
        if self.registry.get(name).is_none() {
            return match self.missing_tool_policy {
                MissingToolPolicy::Throw => Err(ToolError::ToolNotFound(name.to_string())),
                MissingToolPolicy::EmitFormattedError => Ok(Message::tool(
                    call_id,
                    format!("error: tool `{name}` not found"),
                )),
            };
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.registry.execute(name, arguments.clone()).await {
                Ok(output) => return Ok(Message::tool(call_id, output)),
                Err(err) => {
                    if self.retry_policy.should_retry(attempt, &err) {
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::{ContentPart, ConduitError, Role};
    use conduit_schema::{Generable, GeneratedContent, GenerationSchema, PartiallyGenerated, SchemaNode};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct NoArgs;
    #[derive(Debug, Clone, PartialEq, Default)]
    struct PartialNoArgs;

    impl Generable for NoArgs {
        type Partial = PartialNoArgs;
        fn generation_schema() -> GenerationSchema {
            GenerationSchema::single("NoArgs", SchemaNode::object(BTreeMap::new(), vec![]))
        }
        fn from_content(_content: &GeneratedContent) -> Result<Self, ConduitError> {
            Ok(Self)
        }
        fn to_content(&self) -> GeneratedContent {
            GeneratedContent::object(vec![])
        }
    }
    impl PartiallyGenerated for PartialNoArgs {
        fn from_partial_content(_content: &GeneratedContent) -> Result<Self, ConduitError> {
            Ok(Self)
        }
    }

    struct FlakyTool {
        failures_left: Arc<AtomicU32>,
    }

    impl Tool for FlakyTool {
        type Args = NoArgs;
        type Output = String;
        const NAME: &'static str = "flaky";
        fn description(&self) -> &str {
            "fails a fixed number of times, then succeeds"
        }
        async fn call(&self, _args: Self::Args) -> Result<Self::Output, ToolError> {
            if self.failures_left.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                if n > 0 { Some(n - 1) } else { None }
            }).is_ok() {
                Err(ToolError::ExecutionFailed("transient".into()))
            } else {
                Ok("done".to_string())
            }
        }
    }

    #[tokio::test]
    async fn missing_tool_throws_by_default() {
        let executor = ToolExecutor::new(MissingToolPolicy::Throw);
        let result = executor.execute("1", "missing", serde_json::json!({})).await;
        assert!(matches!(result, Err(ToolError::ToolNotFound(_))));
    }

    #[tokio::test]
    async fn missing_tool_emits_formatted_error_when_configured() {
        let executor = ToolExecutor::new(MissingToolPolicy::EmitFormattedError);
        let message = executor
            .execute("1", "missing", serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(message.role, Role::Tool);
        match &message.content[0] {
            ContentPart::ToolResult { content, .. } => assert!(content.contains("missing")),
            other => panic!("unexpected content part: {other:?}"),
        }
    }

    #[tokio::test]
    async fn retry_policy_retries_transient_failures_until_success() {
        let mut executor = ToolExecutor::new(MissingToolPolicy::Throw);
        executor.register(FlakyTool {
            failures_left: Arc::new(AtomicU32::new(2)),
        });
        executor.set_retry_policy(RetryPolicy::RetryableErrors { max_attempts: 5 });
        let message = executor.execute("1", "flaky", serde_json::json!({})).await.unwrap();
        match &message.content[0] {
            ContentPart::ToolResult { content, .. } => assert_eq!(content, "done"),
            other => panic!("unexpected content part: {other:?}"),
        }
    }

    #[tokio::test]
    async fn retry_policy_gives_up_after_max_attempts() {
        let mut executor = ToolExecutor::new(MissingToolPolicy::Throw);
        executor.register(FlakyTool {
            failures_left: Arc::new(AtomicU32::new(10)),
        });
        executor.set_retry_policy(RetryPolicy::RetryableErrors { max_attempts: 2 });
        let result = executor.execute("1", "flaky", serde_json::json!({})).await;
        assert!(matches!(result, Err(ToolError::ExecutionFailed(_))));
    }
}

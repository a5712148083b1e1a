//! Typed and type-erased tool traits.

use conduit_core::wasm::{WasmBoxedFuture, WasmCompatSend, WasmCompatSync};
use conduit_schema::{Generable, GeneratedContent};

use crate::error::ToolError;

/// Renders a tool's typed output into the string representation injected
/// back into the conversation.
pub trait PromptRepresentable {
    /// Render `self` as a prompt-safe string.
    fn to_prompt_string(&self) -> String;
}

impl PromptRepresentable for String {
    fn to_prompt_string(&self) -> String {
        self.clone()
    }
}

impl PromptRepresentable for serde_json::Value {
    fn to_prompt_string(&self) -> String {
        self.to_string()
    }
}

/// A tool with a typed argument and output shape.
///
/// Implement this for each tool; register it with a [`crate::ToolRegistry`],
/// which type-erases it behind [`ToolDyn`].
pub trait Tool: WasmCompatSend + WasmCompatSync {
    /// Parsed argument type, produced from the model's JSON arguments via
    /// [`Generable`].
    type Args: Generable;
    /// What a successful call produces, rendered to a string for the
    /// conversation via [`PromptRepresentable`].
    type Output: PromptRepresentable;

    /// The tool's unique name.
    const NAME: &'static str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// Invoke the tool with parsed arguments.
    fn call(
        &self,
        args: Self::Args,
    ) -> impl std::future::Future<Output = Result<Self::Output, ToolError>> + WasmCompatSend;
}

/// Object-safe form of [`Tool`], used for storage in [`crate::ToolRegistry`].
pub trait ToolDyn: WasmCompatSend + WasmCompatSync {
    /// The tool's unique name.
    fn name(&self) -> &str;
    /// Human-readable description shown to the model.
    fn description(&self) -> &str;
    /// JSON Schema for this tool's arguments.
    fn input_schema(&self) -> serde_json::Value;
    /// Parse `arguments`, invoke the tool, and render its output to a
    /// string.
    fn call_dyn(&self, arguments: serde_json::Value) -> WasmBoxedFuture<'_, Result<String, ToolError>>;
}

/// Type-erases a [`Tool`] into [`ToolDyn`].
pub struct ErasedTool<T>(T);

impl<T> ErasedTool<T> {
    /// Wrap `tool` for storage in a [`crate::ToolRegistry`].
    pub fn new(tool: T) -> Self {
        Self(tool)
    }
}

impl<T: Tool> ToolDyn for ErasedTool<T> {
    fn name(&self) -> &str {
        T::NAME
    }

    fn description(&self) -> &str {
        self.0.description()
    }

    fn input_schema(&self) -> serde_json::Value {
        T::Args::generation_schema().to_json()
    }

    fn call_dyn(
        &self,
        arguments: serde_json::Value,
    ) -> WasmBoxedFuture<'_, Result<String, ToolError>> {
        Box::pin(async move {
            let content = GeneratedContent::from_json_str(&arguments.to_string())
                .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
            let args = T::Args::from_content(&content)
                .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
            let output = self.0.call(args).await?;
            Ok(output.to_prompt_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::ConduitError;
    use conduit_schema::{GenerationSchema, PartiallyGenerated, SchemaNode};
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq)]
    struct EchoArgs {
        message: String,
    }

    #[derive(Debug, Clone, PartialEq, Default)]
    struct PartialEchoArgs {
        message: Option<String>,
    }

    impl Generable for EchoArgs {
        type Partial = PartialEchoArgs;

        fn generation_schema() -> GenerationSchema {
            let mut properties = BTreeMap::new();
            properties.insert("message".to_string(), SchemaNode::string());
            GenerationSchema::single(
                "EchoArgs",
                SchemaNode::object(properties, vec!["message".to_string()]),
            )
        }

        fn from_content(content: &GeneratedContent) -> Result<Self, ConduitError> {
            let message = content
                .get("message")
                .and_then(GeneratedContent::as_str)
                .ok_or_else(|| ConduitError::ConversionFailed("missing `message`".to_string()))?
                .to_string();
            Ok(Self { message })
        }

        fn to_content(&self) -> GeneratedContent {
            GeneratedContent::object(vec![(
                "message".to_string(),
                GeneratedContent::string(&self.message),
            )])
        }
    }

    impl PartiallyGenerated for PartialEchoArgs {
        fn from_partial_content(content: &GeneratedContent) -> Result<Self, ConduitError> {
            Ok(Self {
                message: content
                    .get("message")
                    .and_then(GeneratedContent::as_str)
                    .map(str::to_string),
            })
        }
    }

    struct EchoTool;

    impl Tool for EchoTool {
        type Args = EchoArgs;
        type Output = String;
        const NAME: &'static str = "echo";

        fn description(&self) -> &str {
            "Echoes the given message back"
        }

        async fn call(&self, args: Self::Args) -> Result<Self::Output, ToolError> {
            Ok(args.message)
        }
    }

    #[tokio::test]
    async fn erased_tool_parses_arguments_and_invokes() {
        let tool = ErasedTool::new(EchoTool);
        let output = tool
            .call_dyn(serde_json::json!({"message": "hi"}))
            .await
            .unwrap();
        assert_eq!(output, "hi");
    }

    #[tokio::test]
    async fn erased_tool_rejects_arguments_missing_a_required_field() {
        let tool = ErasedTool::new(EchoTool);
        let result = tool.call_dyn(serde_json::json!({})).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }

    #[test]
    fn erased_tool_exposes_the_generated_schema_as_input_schema() {
        let tool = ErasedTool::new(EchoTool);
        let schema = tool.input_schema();
        assert_eq!(schema["type"], "object");
    }
}

//! Name-keyed tool storage with an optional middleware chain per tool and
//! globally.

use std::collections::HashMap;
use std::sync::Arc;

use conduit_core::ToolDefinition;

use crate::error::ToolError;
use crate::middleware::{Next, ToolCall, ToolMiddleware};
use crate::tool::{ErasedTool, Tool, ToolDyn};

/// Registry of tools, keyed by unique name. Re-registering a name replaces
/// the prior entry.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDyn>>,
    global_middleware: Vec<Arc<dyn ToolMiddleware>>,
    tool_middleware: HashMap<String, Vec<Arc<dyn ToolMiddleware>>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a strongly-typed tool, type-erasing it. Replaces any
    /// existing tool registered under the same name.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools
            .insert(T::NAME.to_string(), Arc::new(ErasedTool::new(tool)));
    }

    /// Registers an already-erased tool.
    pub fn register_dyn(&mut self, tool: Arc<dyn ToolDyn>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolDyn>> {
        self.tools.get(name).cloned()
    }

    /// Definitions for every registered tool, e.g. to pass to a provider's
    /// `tools` field.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Adds middleware that wraps every tool's invocation.
    pub fn add_middleware(&mut self, m: impl ToolMiddleware + 'static) -> &mut Self {
        self.global_middleware.push(Arc::new(m));
        self
    }

    /// Adds middleware scoped to a single tool name.
    pub fn add_tool_middleware(
        &mut self,
        tool_name: &str,
        m: impl ToolMiddleware + 'static,
    ) -> &mut Self {
        self.tool_middleware
            .entry(tool_name.to_string())
            .or_default()
            .push(Arc::new(m));
        self
    }

    /// Runs `name` with `arguments` through its middleware chain (global
    /// middleware first, then per-tool middleware) and the tool itself.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ToolNotFound`] if no tool is registered under
    /// `name`.
    pub async fn execute(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))?;

        let call = ToolCall {
            id: String::new(),
            name: name.to_string(),
            arguments,
        };

        let mut chain: Vec<Arc<dyn ToolMiddleware>> = self.global_middleware.clone();
        if let Some(per_tool) = self.tool_middleware.get(name) {
            chain.extend(per_tool.iter().cloned());
        }

        Next::new(tool.as_ref(), &chain).run(&call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::PromptRepresentable;
    use conduit_core::ConduitError;
    use conduit_schema::{Generable, GeneratedContent, GenerationSchema, PartiallyGenerated, SchemaNode};
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq)]
    struct Args {
        x: i64,
    }

    #[derive(Debug, Clone, PartialEq, Default)]
    struct PartialArgs {
        x: Option<i64>,
    }

    impl Generable for Args {
        type Partial = PartialArgs;
        fn generation_schema() -> GenerationSchema {
            let mut properties = BTreeMap::new();
            properties.insert("x".to_string(), SchemaNode::integer());
            GenerationSchema::single(
                "Args",
                SchemaNode::object(properties, vec!["x".to_string()]),
            )
        }
        fn from_content(content: &GeneratedContent) -> Result<Self, ConduitError> {
            let x = content
                .get("x")
                .and_then(GeneratedContent::as_i64)
                .ok_or_else(|| ConduitError::ConversionFailed("missing `x`".to_string()))?;
            Ok(Self { x })
        }
        fn to_content(&self) -> GeneratedContent {
            GeneratedContent::object(vec![("x".to_string(), GeneratedContent::int(self.x))])
        }
    }

    impl PartiallyGenerated for PartialArgs {
        fn from_partial_content(content: &GeneratedContent) -> Result<Self, ConduitError> {
            Ok(Self {
                x: content.get("x").and_then(GeneratedContent::as_i64),
            })
        }
    }

    struct DoubleTool;

    impl Tool for DoubleTool {
        type Args = Args;
        type Output = String;
        const NAME: &'static str = "double";
        fn description(&self) -> &str {
            "doubles x"
        }
        async fn call(&self, args: Self::Args) -> Result<Self::Output, ToolError> {
            Ok((args.x * 2).to_string())
        }
    }

    #[test]
    fn register_replaces_existing_entry_with_the_same_name() {
        let mut registry = ToolRegistry::new();
        registry.register(DoubleTool);
        assert_eq!(registry.definitions().len(), 1);
        registry.register(DoubleTool);
        assert_eq!(registry.definitions().len(), 1);
    }

    #[tokio::test]
    async fn execute_runs_the_named_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(DoubleTool);
        let output = registry
            .execute("double", serde_json::json!({"x": 21}))
            .await
            .unwrap();
        assert_eq!(output, "42");
    }

    #[tokio::test]
    async fn execute_fails_for_an_unregistered_tool() {
        let registry = ToolRegistry::new();
        let result = registry.execute("missing", serde_json::json!({})).await;
        assert!(matches!(result, Err(ToolError::ToolNotFound(_))));
    }

    #[tokio::test]
    async fn global_middleware_applies_to_every_tool() {
        use crate::middleware::tool_middleware_fn;
        let mut registry = ToolRegistry::new();
        registry.register(DoubleTool);
        registry.add_middleware(tool_middleware_fn(|call, next| {
            let call = call.clone();
            Box::pin(async move {
                let output = next.run(&call).await?;
                Ok(format!("[{output}]"))
            })
        }));
        let output = registry
            .execute("double", serde_json::json!({"x": 5}))
            .await
            .unwrap();
        assert_eq!(output, "[10]");
    }

    #[test]
    fn prompt_representable_string_passes_through() {
        assert_eq!("hi".to_string().to_prompt_string(), "hi");
    }
}

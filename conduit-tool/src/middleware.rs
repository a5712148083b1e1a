//! Middleware wrapping tool invocation, in the style of `axum`'s `from_fn`:
//! each middleware receives a [`Next`] it can call to continue the chain,
//! or short-circuit by returning without calling it.

use std::sync::Arc;

use conduit_core::wasm::{WasmBoxedFuture, WasmCompatSend, WasmCompatSync};

use crate::error::ToolError;
use crate::tool::ToolDyn;

/// A tool call in flight through the middleware pipeline.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// The call identifier assigned by the model.
    pub id: String,
    /// The tool's registered name.
    pub name: String,
    /// Raw JSON arguments, not yet parsed.
    pub arguments: serde_json::Value,
}

/// Middleware that wraps tool execution.
pub trait ToolMiddleware: WasmCompatSend + WasmCompatSync {
    /// Process `call`, optionally delegating to `next` to continue the
    /// chain.
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        next: Next<'a>,
    ) -> WasmBoxedFuture<'a, Result<String, ToolError>>;
}

/// The remaining middleware chain plus the underlying tool. Consumed on
/// `run` to prevent double invocation.
pub struct Next<'a> {
    tool: &'a dyn ToolDyn,
    middleware: &'a [Arc<dyn ToolMiddleware>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(tool: &'a dyn ToolDyn, middleware: &'a [Arc<dyn ToolMiddleware>]) -> Self {
        Self { tool, middleware }
    }

    /// Continue the chain, eventually invoking the tool.
    pub async fn run(self, call: &'a ToolCall) -> Result<String, ToolError> {
        if let Some((head, tail)) = self.middleware.split_first() {
            let next = Next::new(self.tool, tail);
            head.process(call, next).await
        } else {
            self.tool.call_dyn(call.arguments.clone()).await
        }
    }
}

/// Wraps a closure as [`ToolMiddleware`], mirroring `axum::middleware::from_fn`.
struct MiddlewareFn<F> {
    f: F,
}

impl<F> ToolMiddleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a ToolCall, Next<'a>) -> WasmBoxedFuture<'a, Result<String, ToolError>>
        + Send
        + Sync,
{
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        next: Next<'a>,
    ) -> WasmBoxedFuture<'a, Result<String, ToolError>> {
        (self.f)(call, next)
    }
}

/// Builds middleware from a closure.
#[must_use]
pub fn tool_middleware_fn<F>(f: F) -> impl ToolMiddleware
where
    F: for<'a> Fn(&'a ToolCall, Next<'a>) -> WasmBoxedFuture<'a, Result<String, ToolError>>
        + Send
        + Sync,
{
    MiddlewareFn { f }
}

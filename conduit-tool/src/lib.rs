#![doc = include_str!("../README.md")]

mod error;
mod executor;
mod middleware;
mod registry;
mod tool;

pub use error::{MissingToolPolicy, RetryPolicy, ToolError};
pub use executor::ToolExecutor;
pub use middleware::{tool_middleware_fn, Next, ToolCall, ToolMiddleware};
pub use registry::ToolRegistry;
pub use tool::{ErasedTool, PromptRepresentable, Tool, ToolDyn};

#![doc = include_str!("../README.md")]

mod session;
mod storage;

pub use session::{ChatSession, SessionReply, DEFAULT_MAX_TOOL_TURNS};
pub use storage::{
    FileSessionStorage, InMemorySessionStorage, SessionSnapshot, SessionStorage, SessionSummary,
    StorageError,
};

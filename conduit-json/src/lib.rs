#![doc = include_str!("../README.md")]

mod completer;
mod decoder;
mod repairer;

pub use completer::{complete, CompleterError};
pub use decoder::{decode_incremental, DecodeOutcome};
pub use repairer::repair;

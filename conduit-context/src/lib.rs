#![doc = include_str!("../README.md")]

mod counter;
mod strategy;

pub use counter::TokenCounter;
pub use strategy::{CompactionOutcome, ContextStrategy, NoCompaction, SlidingWindowStrategy};

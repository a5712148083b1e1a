#![doc = include_str!("../README.md")]

mod detokenizer;
mod loader;
mod policy;
mod warmup;

pub use detokenizer::{StreamingDetokenizer, TokenDecoder};
pub use loader::{LoadedModel, ModelLoader};
pub use policy::{FeaturePolicy, ProviderRuntimePolicy, ProviderRuntimePolicyOverride};
pub use warmup::{warmup, WarmupPolicy, DEFAULT_WARMUP_TOKENS};

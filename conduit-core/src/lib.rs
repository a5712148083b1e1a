#![doc = include_str!("../README.md")]

pub mod auth;
pub mod error;
pub mod image;
pub mod provider;
pub mod stream;
pub mod types;
pub mod wasm;

pub use auth::*;
pub use error::*;
pub use image::*;
pub use provider::*;
pub use stream::*;
pub use types::*;
pub use wasm::*;

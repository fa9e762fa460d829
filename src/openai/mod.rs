//! Minimal client for OpenAI compatible chat completion APIs.
pub mod core;

pub use self::core::*;

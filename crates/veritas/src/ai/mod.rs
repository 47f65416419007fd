//! Inference backend access.

pub mod client;

pub use client::{ChatBackend, ChatMessage, InferenceError, OpenAiCompatClient, Role};

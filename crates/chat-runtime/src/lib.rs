//! # chat-runtime
//!
//! Concrete `LlmProvider` implementations for the support-chat backend.
//! Currently Gemini only; other backends slot in behind the same trait.

pub mod gemini;

pub use gemini::{GeminiConfig, GeminiProvider};

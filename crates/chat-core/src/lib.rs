//! # chat-core
//!
//! Conversation state, tool registry, and the tool-augmented reasoning
//! loop behind the support-chat backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Reasoning  │  │    Tool     │  │   LlmProvider       │  │
//! │  │    Loop     │──│   Registry  │──│   (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop has exactly two states, Inferring and Executing Tools, with
//! one conditional edge between them, a cycle cap, and an append-only
//! conversation as its accumulator. The `LlmProvider` trait keeps the loop
//! independent of any concrete model backend.

pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod session;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role, ToolCall};
pub use provider::LlmProvider;
pub use reasoning::{Agent, AgentConfig};
pub use session::{Session, SessionId, SessionStore};
pub use tool::{Tool, ToolRegistry, ToolResult, ToolSchema};

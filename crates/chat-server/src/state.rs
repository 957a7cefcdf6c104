//! Application State

use std::sync::Arc;

use chat_core::{reasoning::AgentConfig, LlmProvider, SessionStore, ToolRegistry};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// LLM provider (Gemini)
    pub provider: Arc<dyn LlmProvider>,

    /// Tool registry with all available tools
    pub tools: Arc<ToolRegistry>,

    /// Session store holding every live conversation
    pub sessions: Arc<SessionStore>,

    /// Agent configuration applied to every reasoning turn
    pub agent: AgentConfig,
}

//! Error Types

use thiserror::Error;

/// Result type alias for chat operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors raised by the reasoning loop and its collaborators
#[derive(Error, Debug)]
pub enum AgentError {
    /// Startup configuration error (missing credential etc.), fatal
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM provider returned an error response
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable, timed out, or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider rate limit hit
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool arguments failed validation
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed (upstream lookup error etc.)
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Tool call exceeded its per-call timeout
    #[error("Tool '{name}' timed out after {secs}s")]
    ToolTimeout { name: String, secs: u64 },

    /// The reasoning loop exceeded its tool-cycle cap
    #[error("Reasoning loop exceeded {0} tool cycles")]
    LoopLimit(usize),

    /// A message violated conversation invariants
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Session lookup failed
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::ProviderUnavailable(_) | AgentError::RateLimited(_)
        )
    }

    /// Whether the loop can absorb this failure as an error-carrying tool
    /// message and keep the turn going
    pub fn is_recoverable_in_turn(&self) -> bool {
        matches!(
            self,
            AgentError::ToolNotFound(_)
                | AgentError::ToolValidation(_)
                | AgentError::ToolTimeout { .. }
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Provider(msg) => format!("The AI service encountered an error: {}", msg),
            AgentError::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            AgentError::RateLimited(_) => {
                "You've made too many requests. Please wait a moment.".into()
            }
            AgentError::ToolNotFound(name) => format!("The tool '{}' is not available.", name),
            AgentError::ToolValidation(msg) => format!("Invalid tool input: {}", msg),
            AgentError::ToolExecution(msg) => format!("Tool error: {}", msg),
            AgentError::ToolTimeout { name, .. } => {
                format!("The '{}' lookup took too long. Please try again.", name)
            }
            AgentError::LoopLimit(_) => {
                "The request took too long to process. Please try a simpler question.".into()
            }
            AgentError::SessionNotFound(_) => "That chat session no longer exists.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}

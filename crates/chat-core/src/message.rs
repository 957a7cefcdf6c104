//! Conversation Messages
//!
//! Append-only message history shared by the session store and the
//! reasoning loop. Tool messages must reference a tool call emitted by an
//! earlier assistant message; `Conversation::push` enforces that linkage.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result, paired to an assistant tool call
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A model-issued request to invoke a named tool
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    pub arguments: HashMap<String, serde_json::Value>,

    /// Call ID linking the eventual tool message back to this request
    pub call_id: String,
}

impl ToolCall {
    /// Create a call with a fresh ID
    pub fn new(name: impl Into<String>, arguments: HashMap<String, serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
            call_id: format!("call_{}", short_id()),
        }
    }

    /// The free-text query argument every tool accepts
    pub fn query(&self) -> Option<&str> {
        self.arguments
            .get("query")
            .or_else(|| self.arguments.get("input"))
            .and_then(|v| v.as_str())
    }
}

fn short_id() -> String {
    uuid::Uuid::new_v4().to_string()[..8].to_string()
}

/// A single message in a conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier
    #[serde(default = "Message::fresh_id")]
    pub id: String,

    /// Message role
    pub role: Role,

    /// Text content
    pub content: String,

    /// Display name, or tool name for tool messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Tool calls requested by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// For tool messages: the call this result answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn fresh_id() -> String {
        format!("msg_{}", short_id())
    }

    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Self::fresh_id(),
            role,
            content: content.into(),
            name: None,
            timestamp: Utc::now(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an assistant message carrying tool call requests
    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::new(Role::Assistant, content);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Create a tool result message answering `call_id`
    pub fn tool(
        content: impl Into<String>,
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.tool_call_id = Some(call_id.into());
        msg.name = Some(tool_name.into());
        msg
    }

    /// Add a display name to the message
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Append-only conversation history
///
/// Insertion order is chronological order. Messages are never reordered or
/// rewritten; the only destructive operation is [`Conversation::reset`],
/// which truncates to a single greeting.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with a greeting message already in place
    pub fn with_greeting(greeting: Message) -> Self {
        Self {
            messages: vec![greeting],
        }
    }

    /// Append a message, validating tool-call linkage
    ///
    /// Fails only when a tool-role message has no `tool_call_id`, or the id
    /// does not match any tool call emitted by a prior assistant message.
    pub fn push(&mut self, message: Message) -> Result<()> {
        if message.role == Role::Tool {
            let Some(call_id) = message.tool_call_id.as_deref() else {
                return Err(AgentError::MalformedMessage(
                    "tool message without tool_call_id".into(),
                ));
            };
            if !self.has_tool_call(call_id) {
                return Err(AgentError::MalformedMessage(format!(
                    "tool message references unknown tool_call_id '{}'",
                    call_id
                )));
            }
        }
        self.messages.push(message);
        Ok(())
    }

    fn has_tool_call(&self, call_id: &str) -> bool {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .flat_map(|m| m.tool_calls.iter())
            .any(|tc| tc.call_id == call_id)
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Last `n` messages, for bounding the context sent to the model
    pub fn tail(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Truncate the history to a single fresh greeting message
    pub fn reset(&mut self, greeting: Message) {
        self.messages.clear();
        self.messages.push(greeting);
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

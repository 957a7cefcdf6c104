//! Tool System
//!
//! Every tool accepts a single free-text query and returns structured data
//! or plain text. The registry is populated at startup and then shared
//! behind an `Arc`; no tool is added or removed at runtime.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::message::ToolCall;

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Call ID (filled in by the loop)
    pub call_id: Option<String>,

    /// Whether execution succeeded
    pub success: bool,

    /// Output (summary text or error)
    pub output: String,

    /// Structured data (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            call_id: None,
            success: true,
            output: output.into(),
            data: None,
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            call_id: None,
            success: false,
            output: error.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// The payload appended to the conversation as the tool message body:
    /// structured data when present, plain output otherwise.
    pub fn payload(&self) -> String {
        match &self.data {
            Some(data) => serde_json::to_string(data).unwrap_or_else(|_| self.output.clone()),
            None => self.output.clone(),
        }
    }
}

/// Tool definition shown to the model
///
/// The input schema is fixed: one required free-text `query` field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the model)
    pub description: String,

    /// Description of the `query` argument
    pub query_description: String,
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for model function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with the free-text query
    async fn execute(&self, query: &str) -> Result<ToolResult>;
}

/// Registry of available tools, immutable once shared
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let schema = tool.schema();
        self.tools.insert(schema.name.clone(), Arc::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Execute a tool call
    ///
    /// Fails with `ToolNotFound` for unknown names and `ToolValidation` when
    /// the call carries no query argument; tool failures propagate as-is.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        let query = call
            .query()
            .ok_or_else(|| AgentError::ToolValidation("missing 'query' argument".into()))?;

        let mut result = tool.execute(query).await?;
        result.call_id = Some(call.call_id.clone());
        Ok(result)
    }

    /// Get all tool schemas (passed to the provider as function declarations)
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "echo".into(),
                description: "Echo the query back".into(),
                query_description: "Text to echo".into(),
            }
        }

        async fn execute(&self, query: &str) -> Result<ToolResult> {
            Ok(ToolResult::success("echo", query))
        }
    }

    fn call(name: &str, query: Option<&str>) -> ToolCall {
        let mut arguments = HashMap::new();
        if let Some(q) = query {
            arguments.insert("query".to_string(), serde_json::json!(q));
        }
        ToolCall::new(name, arguments)
    }

    #[tokio::test]
    async fn test_execute_known_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let c = call("echo", Some("hello"));
        let result = registry.execute(&c).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hello");
        assert_eq!(result.call_id.as_deref(), Some(c.call_id.as_str()));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.execute(&call("nope", Some("x"))).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_query_argument() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let err = registry.execute(&call("echo", None)).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation(_)));
    }

    #[test]
    fn test_payload_prefers_data() {
        let result = ToolResult::success("echo", "plain")
            .with_data(serde_json::json!({"total": 2}));
        assert_eq!(result.payload(), r#"{"total":2}"#);

        let plain = ToolResult::success("echo", "plain");
        assert_eq!(plain.payload(), "plain");
    }
}

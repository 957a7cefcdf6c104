//! Gemini LLM Provider
//!
//! Implementation of `LlmProvider` against the Gemini REST API
//! (`generateContent` / `streamGenerateContent`). Tool schemas are passed as
//! native function declarations, so tool calls come back as structured
//! `functionCall` parts rather than text to be parsed.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use chat_core::{
    error::{AgentError, Result},
    message::{Message, Role, ToolCall},
    provider::{Completion, CompletionStream, GenerationOptions, LlmProvider, StreamChunk},
    tool::ToolSchema,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider configuration
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API key (required)
    pub api_key: String,

    /// API base URL
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 30,
        }
    }

    /// Read configuration from the environment; a missing key is fatal.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| AgentError::Config("GEMINI_API_KEY is not set".into()))?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }
}

// ---- Wire types -----------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDeclarations>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: HashMap<String, serde_json::Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct FunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolDeclarations {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<Content>,
}

// ---- Provider -------------------------------------------------------------

/// Gemini LLM provider
pub struct GeminiProvider {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create from configuration
    pub fn from_config(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client build failed: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(GeminiConfig::from_env()?)
    }

    /// Convert chat messages to Gemini contents + system instruction.
    ///
    /// System messages are collected into a single `systemInstruction`;
    /// assistant tool calls become `functionCall` parts and tool results
    /// become `functionResponse` parts.
    fn convert_messages(messages: &[Message]) -> (Vec<Content>, Option<Content>) {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for message in messages {
            match message.role {
                Role::System => {
                    system_parts.push(Part {
                        text: Some(message.content.clone()),
                        ..Default::default()
                    });
                }
                Role::User => {
                    contents.push(Content {
                        role: Some("user".into()),
                        parts: vec![Part {
                            text: Some(message.content.clone()),
                            ..Default::default()
                        }],
                    });
                }
                Role::Assistant => {
                    let mut parts = Vec::new();
                    if !message.content.is_empty() {
                        parts.push(Part {
                            text: Some(message.content.clone()),
                            ..Default::default()
                        });
                    }
                    for call in &message.tool_calls {
                        parts.push(Part {
                            function_call: Some(FunctionCall {
                                name: call.name.clone(),
                                args: call.arguments.clone(),
                            }),
                            ..Default::default()
                        });
                    }
                    if parts.is_empty() {
                        continue;
                    }
                    contents.push(Content {
                        role: Some("model".into()),
                        parts,
                    });
                }
                Role::Tool => {
                    let name = message.name.clone().unwrap_or_else(|| "tool".into());
                    let response = serde_json::from_str(&message.content)
                        .unwrap_or_else(|_| serde_json::json!({ "output": message.content }));
                    contents.push(Content {
                        role: Some("user".into()),
                        parts: vec![Part {
                            function_response: Some(FunctionResponse { name, response }),
                            ..Default::default()
                        }],
                    });
                }
            }
        }

        let system_instruction = if system_parts.is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: system_parts,
            })
        };

        (contents, system_instruction)
    }

    /// Convert tool schemas to function declarations.
    ///
    /// Every tool takes the same shape: one required free-text `query`.
    fn convert_tools(tools: &[ToolSchema]) -> Option<Vec<ToolDeclarations>> {
        if tools.is_empty() {
            return None;
        }

        let declarations = tools
            .iter()
            .map(|schema| FunctionDeclaration {
                name: schema.name.clone(),
                description: schema.description.clone(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": schema.query_description,
                        }
                    },
                    "required": ["query"],
                }),
            })
            .collect();

        Some(vec![ToolDeclarations {
            function_declarations: declarations,
        }])
    }

    fn build_request(
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> GenerateRequest {
        let (contents, system_instruction) = Self::convert_messages(messages);
        GenerateRequest {
            contents,
            system_instruction,
            tools: Self::convert_tools(tools),
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
            },
        }
    }

    /// Extract text and tool calls from a response, generating a fresh
    /// call id per function call (the API supplies none).
    fn convert_completion(response: GenerateResponse, model: &str) -> Completion {
        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for candidate in response.candidates {
            let Some(candidate_content) = candidate.content else {
                continue;
            };
            for part in candidate_content.parts {
                if let Some(text) = part.text {
                    content.push_str(&text);
                }
                if let Some(call) = part.function_call {
                    tool_calls.push(ToolCall::new(call.name, call.args));
                }
            }
        }

        Completion {
            content,
            tool_calls,
            model: model.to_string(),
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.config.base_url, model, method, self.config.api_key
        )
    }

    fn map_request_error(err: reqwest::Error) -> AgentError {
        if err.is_timeout() || err.is_connect() {
            AgentError::ProviderUnavailable(err.to_string())
        } else {
            AgentError::Provider(err.to_string())
        }
    }

    async fn map_error_response(response: reqwest::Response) -> AgentError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            429 => AgentError::RateLimited(body),
            401 | 403 => AgentError::Config(format!("API key rejected ({status}): {body}")),
            s if s >= 500 => AgentError::ProviderUnavailable(format!("{status}: {body}")),
            _ => AgentError::Provider(format!("{status}: {body}")),
        }
    }
}

/// Parse one SSE line into a stream chunk, skipping non-data lines.
fn parse_sse_line(line: &str) -> Option<StreamChunk> {
    let payload = line.strip_prefix("data: ")?.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<GenerateResponse>(payload) {
        Ok(response) => {
            let completion = GeminiProvider::convert_completion(response, "");
            Some(StreamChunk {
                delta: completion.content,
                tool_calls: completion.tool_calls,
                done: false,
            })
        }
        Err(e) => {
            warn!("unparseable stream frame: {e}");
            None
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models?key={}", self.config.base_url, self.config.api_key);
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                warn!("Gemini health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = Self::build_request(messages, tools, options);
        let url = self.endpoint(&options.model, "generateContent");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if !response.status().is_success() {
            return Err(Self::map_error_response(response).await);
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("malformed response: {e}")))?;

        let completion = Self::convert_completion(body, &options.model);
        debug!(
            tool_calls = completion.tool_calls.len(),
            chars = completion.content.len(),
            "completion received"
        );
        Ok(completion)
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        let request = Self::build_request(messages, tools, options);
        let url = format!(
            "{}&alt=sse",
            self.endpoint(&options.model, "streamGenerateContent")
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if !response.status().is_success() {
            return Err(Self::map_error_response(response).await);
        }

        let (tx, rx) = mpsc::channel::<Result<StreamChunk>>(32);

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(item) = bytes.next().await {
                let chunk = match item {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(Err(AgentError::Provider(e.to_string()))).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Frames are newline-delimited; keep the trailing partial line
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim_end().to_string();
                    buffer.drain(..=newline);

                    if let Some(stream_chunk) = parse_sse_line(&line) {
                        if tx.send(Ok(stream_chunk)).await.is_err() {
                            return;
                        }
                    }
                }
            }

            if let Some(stream_chunk) = parse_sse_line(buffer.trim_end()) {
                let _ = tx.send(Ok(stream_chunk)).await;
            }
            let _ = tx
                .send(Ok(StreamChunk {
                    done: true,
                    ..Default::default()
                }))
                .await;
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

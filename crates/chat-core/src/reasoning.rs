//! Tool-Augmented Reasoning Loop
//!
//! Two states: Inferring and Executing Tools. The model is asked for the
//! next action; tool calls are executed in emission order with their
//! results appended, and the loop re-infers until the model answers with
//! no tool calls. A cycle cap closes the loop against models that never
//! stop asking for tools.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message, Role};
use crate::provider::{Completion, GenerationOptions, LlmProvider};
use crate::tool::ToolRegistry;

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt establishing the assistant persona and tool guidance
    pub system_prompt: String,

    /// How many trailing conversation messages are sent as context
    pub context_messages: usize,

    /// Maximum Inferring/Executing-Tools cycles before failing closed
    pub max_tool_cycles: usize,

    /// Per-call tool timeout; a timed-out call becomes an error payload
    pub tool_timeout: Duration,

    /// Generation options
    pub generation: GenerationOptions,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            context_messages: 20,
            max_tool_cycles: 8,
            tool_timeout: Duration::from_secs(15),
            generation: GenerationOptions::default(),
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful customer-support assistant. \
Use the available tools when you need product, order, or up-to-date web information; \
answer directly when you already know the answer. Be concise and accurate.";

/// The main agent: drives one reasoning turn over a conversation
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(provider, tools, AgentConfig::default())
    }

    /// Run one reasoning turn; the final assistant message is appended to
    /// the conversation and its text returned.
    pub async fn run(&self, conversation: &mut Conversation) -> Result<String> {
        self.drive(conversation, None).await
    }

    /// Streaming variant of [`run`]: newly generated text is forwarded to
    /// `deltas` as it arrives, but tool decisions still wait for the full
    /// model turn.
    pub async fn run_streaming(
        &self,
        conversation: &mut Conversation,
        deltas: mpsc::Sender<String>,
    ) -> Result<String> {
        self.drive(conversation, Some(&deltas)).await
    }

    async fn drive(
        &self,
        conversation: &mut Conversation,
        deltas: Option<&mpsc::Sender<String>>,
    ) -> Result<String> {
        let mut cycles = 0usize;

        loop {
            cycles += 1;
            if cycles > self.config.max_tool_cycles {
                tracing::warn!(
                    max = self.config.max_tool_cycles,
                    "reasoning loop exceeded tool-cycle cap"
                );
                return Err(AgentError::LoopLimit(self.config.max_tool_cycles));
            }

            // Inferring
            let context = self.assemble_context(conversation);
            let completion = match deltas {
                Some(tx) => self.infer_streaming(&context, tx).await?,
                None => self.infer(&context).await?,
            };

            if completion.tool_calls.is_empty() {
                // Done: final answer
                conversation.push(Message::assistant(&completion.content))?;
                tracing::debug!(cycles, "turn completed");
                return Ok(completion.content);
            }

            // Executing Tools
            conversation.push(Message::assistant_with_calls(
                &completion.content,
                completion.tool_calls.clone(),
            ))?;

            let mut turn_failure: Option<AgentError> = None;

            for call in &completion.tool_calls {
                tracing::debug!(tool = %call.name, call_id = %call.call_id, "executing tool");

                let outcome =
                    tokio::time::timeout(self.config.tool_timeout, self.tools.execute(call)).await;

                let payload = match outcome {
                    Ok(Ok(result)) => result.payload(),
                    Ok(Err(e)) if e.is_recoverable_in_turn() => {
                        tracing::warn!(tool = %call.name, error = %e, "tool call recovered");
                        error_payload(&e)
                    }
                    Ok(Err(e)) => {
                        tracing::error!(tool = %call.name, error = %e, "tool call failed");
                        let payload = error_payload(&e);
                        turn_failure.get_or_insert(e);
                        payload
                    }
                    Err(_) => {
                        let e = AgentError::ToolTimeout {
                            name: call.name.clone(),
                            secs: self.config.tool_timeout.as_secs(),
                        };
                        tracing::warn!(tool = %call.name, "tool call timed out");
                        error_payload(&e)
                    }
                };

                // One tool message per call, same order as emission
                conversation.push(Message::tool(payload, &call.call_id, &call.name))?;
            }

            if let Some(e) = turn_failure {
                // Pairing is preserved above; the caller decides whether to
                // retry the whole turn.
                return Err(e);
            }
        }
    }

    /// System messages plus the tail-bounded history
    fn assemble_context(&self, conversation: &Conversation) -> Vec<Message> {
        let mut messages = vec![
            Message::system(&self.config.system_prompt),
            Message::system(format!(
                "Additional context:\n- Current date: {}",
                Utc::now().format("%m-%Y")
            )),
        ];

        // The window must not open on a tool result whose requesting
        // assistant message was cut off; providers reject a tool response
        // with no preceding tool call.
        let mut tail = conversation.tail(self.config.context_messages);
        while tail.first().is_some_and(|m| m.role == Role::Tool) {
            tail = &tail[1..];
        }

        messages.extend_from_slice(tail);
        messages
    }

    async fn infer(&self, context: &[Message]) -> Result<Completion> {
        let mut attempt = 0u32;
        loop {
            match self
                .provider
                .complete(context, &self.tools.schemas(), &self.config.generation)
                .await
            {
                Ok(completion) => return Ok(completion),
                Err(e) if e.is_retryable() && attempt < self.config.generation.max_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "retrying model call");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn infer_streaming(
        &self,
        context: &[Message],
        deltas: &mpsc::Sender<String>,
    ) -> Result<Completion> {
        use futures::StreamExt;

        let mut attempt = 0u32;
        let mut stream = loop {
            match self
                .provider
                .complete_stream(context, &self.tools.schemas(), &self.config.generation)
                .await
            {
                Ok(stream) => break stream,
                Err(e) if e.is_retryable() && attempt < self.config.generation.max_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "retrying streaming model call");
                }
                Err(e) => return Err(e),
            }
        };

        let mut content = String::new();
        let mut tool_calls = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if !chunk.delta.is_empty() {
                content.push_str(&chunk.delta);
                // Receiver gone means the client went away; keep finishing
                // the turn so the conversation stays well-formed.
                let _ = deltas.send(chunk.delta).await;
            }
            tool_calls.extend(chunk.tool_calls);
        }

        Ok(Completion {
            content,
            tool_calls,
            model: self.config.generation.model.clone(),
        })
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

fn error_payload(e: &AgentError) -> String {
    serde_json::json!({ "error": e.to_string() }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Role, ToolCall};
    use crate::provider::{CompletionStream, StreamChunk};
    use crate::tool::{Tool, ToolResult, ToolSchema};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Provider that replays a fixed sequence of completions.
    struct ScriptedProvider {
        script: Mutex<Vec<Completion>>,
    }

    impl ScriptedProvider {
        fn new(mut script: Vec<Completion>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
            }
        }

        fn answer(text: &str) -> Completion {
            Completion {
                content: text.into(),
                tool_calls: vec![],
                model: "scripted".into(),
            }
        }

        fn tool_turn(calls: Vec<ToolCall>) -> Completion {
            Completion {
                content: String::new(),
                tool_calls: calls,
                model: "scripted".into(),
            }
        }

        fn next(&self) -> Completion {
            self.script
                .lock()
                .unwrap()
                .pop()
                .expect("script exhausted")
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolSchema],
            _options: &GenerationOptions,
        ) -> Result<Completion> {
            Ok(self.next())
        }

        async fn complete_stream(
            &self,
            _messages: &[Message],
            _tools: &[ToolSchema],
            _options: &GenerationOptions,
        ) -> Result<CompletionStream> {
            let completion = self.next();
            // Split the text in two chunks, tool calls arrive on the last.
            let mid = completion.content.len() / 2;
            let (a, b) = completion.content.split_at(mid);
            let chunks = vec![
                Ok(StreamChunk {
                    delta: a.to_string(),
                    tool_calls: vec![],
                    done: false,
                }),
                Ok(StreamChunk {
                    delta: b.to_string(),
                    tool_calls: completion.tool_calls,
                    done: true,
                }),
            ];
            Ok(Box::pin(futures::stream::iter(chunks)))
        }
    }

    struct LookupTool;

    #[async_trait]
    impl Tool for LookupTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "lookup".into(),
                description: "Look something up".into(),
                query_description: "What to look up".into(),
            }
        }

        async fn execute(&self, query: &str) -> Result<ToolResult> {
            Ok(ToolResult::success("lookup", format!("found: {}", query)))
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "broken".into(),
                description: "Always fails".into(),
                query_description: "Ignored".into(),
            }
        }

        async fn execute(&self, _query: &str) -> Result<ToolResult> {
            Err(AgentError::ToolExecution("backend unavailable".into()))
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut tools = ToolRegistry::new();
        tools.register(LookupTool);
        tools.register(BrokenTool);
        Arc::new(tools)
    }

    fn call(name: &str, query: &str) -> ToolCall {
        let mut arguments = HashMap::new();
        arguments.insert("query".to_string(), serde_json::json!(query));
        ToolCall::new(name, arguments)
    }

    fn agent(script: Vec<Completion>) -> Agent {
        Agent::with_defaults(Arc::new(ScriptedProvider::new(script)), registry())
    }

    #[tokio::test]
    async fn direct_answer_invokes_no_tools() {
        let agent = agent(vec![ScriptedProvider::answer("Hello there!")]);
        let mut conv = Conversation::new();
        conv.push(Message::user("hi")).unwrap();

        let answer = agent.run(&mut conv).await.unwrap();
        assert_eq!(answer, "Hello there!");

        // user + final assistant, nothing else
        assert_eq!(conv.len(), 2);
        assert!(conv.messages().iter().all(|m| m.role != Role::Tool));
    }

    #[tokio::test]
    async fn tool_calls_produce_paired_tool_messages_in_order() {
        let first = call("lookup", "alpha");
        let second = call("lookup", "beta");
        let ids = vec![first.call_id.clone(), second.call_id.clone()];

        let agent = agent(vec![
            ScriptedProvider::tool_turn(vec![first, second]),
            ScriptedProvider::answer("done"),
        ]);

        let mut conv = Conversation::new();
        conv.push(Message::user("look both up")).unwrap();

        let answer = agent.run(&mut conv).await.unwrap();
        assert_eq!(answer, "done");

        let tool_messages: Vec<_> = conv
            .messages()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();
        assert_eq!(tool_messages.len(), 2);
        assert_eq!(tool_messages[0].tool_call_id.as_deref(), Some(ids[0].as_str()));
        assert_eq!(tool_messages[1].tool_call_id.as_deref(), Some(ids[1].as_str()));
        assert!(tool_messages[0].content.contains("alpha"));
        assert!(tool_messages[1].content.contains("beta"));
    }

    #[tokio::test]
    async fn unknown_tool_is_recovered_in_turn() {
        let agent = agent(vec![
            ScriptedProvider::tool_turn(vec![call("no_such_tool", "x")]),
            ScriptedProvider::answer("recovered"),
        ]);

        let mut conv = Conversation::new();
        conv.push(Message::user("try it")).unwrap();

        let answer = agent.run(&mut conv).await.unwrap();
        assert_eq!(answer, "recovered");

        let tool_msg = conv
            .messages()
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert!(tool_msg.content.contains("error"));
    }

    #[tokio::test]
    async fn tool_execution_failure_fails_the_turn_but_keeps_pairing() {
        let failing = call("broken", "x");
        let failing_id = failing.call_id.clone();

        let agent = agent(vec![ScriptedProvider::tool_turn(vec![failing])]);

        let mut conv = Conversation::new();
        conv.push(Message::user("break it")).unwrap();

        let err = agent.run(&mut conv).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolExecution(_)));

        // The failed call still got its paired tool message
        let tool_msg = conv
            .messages()
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some(failing_id.as_str()));
    }

    #[tokio::test]
    async fn loop_guard_fails_closed() {
        let max = 3;
        // One more scripted tool turn than the cap allows.
        let script: Vec<_> = (0..=max)
            .map(|_| ScriptedProvider::tool_turn(vec![call("lookup", "again")]))
            .collect();

        let mut config = AgentConfig::default();
        config.max_tool_cycles = max;

        let agent = Agent::new(Arc::new(ScriptedProvider::new(script)), registry(), config);

        let mut conv = Conversation::new();
        conv.push(Message::user("loop forever")).unwrap();

        let err = agent.run(&mut conv).await.unwrap_err();
        assert!(matches!(err, AgentError::LoopLimit(n) if n == max));
    }

    #[tokio::test]
    async fn context_window_never_opens_on_a_tool_result() {
        let mut config = AgentConfig::default();
        config.context_messages = 2;
        let agent = Agent::new(
            Arc::new(ScriptedProvider::new(vec![])),
            registry(),
            config,
        );

        let mut conv = Conversation::new();
        conv.push(Message::user("look it up")).unwrap();
        let request = call("lookup", "x");
        let call_id = request.call_id.clone();
        conv.push(Message::assistant_with_calls("", vec![request]))
            .unwrap();
        conv.push(Message::tool("{}", call_id, "lookup")).unwrap();
        conv.push(Message::assistant("all done")).unwrap();

        // A 2-message tail would open on the tool result with its
        // requesting assistant message cut off; the orphan must be dropped.
        let context = agent.assemble_context(&conv);
        assert!(context.iter().all(|m| m.role != Role::Tool));

        let first_history = context
            .iter()
            .find(|m| m.role != Role::System)
            .unwrap();
        assert_eq!(first_history.role, Role::Assistant);
        assert_eq!(first_history.content, "all done");
    }

    #[tokio::test]
    async fn streaming_deltas_concatenate_to_final_answer() {
        let agent = agent(vec![
            ScriptedProvider::tool_turn(vec![call("lookup", "gamma")]),
            ScriptedProvider::answer("the answer is gamma"),
        ]);

        let mut conv = Conversation::new();
        conv.push(Message::user("stream it")).unwrap();

        let (tx, mut rx) = mpsc::channel(64);
        let answer = agent.run_streaming(&mut conv, tx).await.unwrap();
        assert_eq!(answer, "the answer is gamma");

        let mut streamed = String::new();
        while let Ok(delta) = rx.try_recv() {
            streamed.push_str(&delta);
        }
        assert_eq!(streamed, "the answer is gamma");
    }
}

//! HTTP Handlers
//!
//! Every user message gets a paired assistant response: turn failures are
//! converted into an apology message before the handler returns, so the
//! conversation never ends on a user message.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use chat_core::{
    error::AgentError,
    message::{Message, Role},
    reasoning::Agent,
    session::{Session, SessionId},
};
use helpdesk::{intent, tools::image};

use crate::state::AppState;

const ASSISTANT_NAME: &str = "Support AI";

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider_connected: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// A message as exposed to clients (system and tool turns are internal)
#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: String,
    pub content: String,
    pub sender_name: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        let sender_name = message.name.clone().unwrap_or_else(|| match message.role {
            Role::User => "User".into(),
            _ => ASSISTANT_NAME.into(),
        });
        Self {
            id: message.id.clone(),
            role: message.role.to_string(),
            content: message.content.clone(),
            sender_name,
            timestamp: message.timestamp,
        }
    }
}

#[derive(Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub message_count: usize,
    pub last_activity: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct SessionDetail {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
}

fn visible_messages(session: &Session) -> Vec<ChatMessage> {
    session
        .conversation
        .messages()
        .iter()
        .filter(|m| matches!(m.role, Role::User | Role::Assistant))
        .filter(|m| !m.content.is_empty())
        .map(ChatMessage::from)
        .collect()
}

fn summary(session: &Session) -> SessionSummary {
    SessionSummary {
        id: session.id.to_string(),
        title: session.title.clone(),
        message_count: session.message_count(),
        last_activity: session.last_activity(),
        updated_at: session.updated_at,
    }
}

fn detail(session: &Session) -> SessionDetail {
    SessionDetail {
        id: session.id.to_string(),
        title: session.title.clone(),
        created_at: session.created_at,
        messages: visible_messages(session),
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn not_found(id: &SessionId) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Session '{}' not found", id),
            code: "SESSION_NOT_FOUND".into(),
        }),
    )
}

// ============================================================================
// Service and session handlers
// ============================================================================

/// Service info (root endpoint)
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "support-chat",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
    })
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider_connected,
    })
}

/// List all sessions, most recently active first
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    let sessions = state.sessions.list().await;
    Json(sessions.iter().map(summary).collect())
}

/// Fetch one session with its visible messages
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetail>, ApiError> {
    let id = SessionId::from_string(id);
    let handle = state.sessions.get(&id).map_err(|_| not_found(&id))?;
    let session = handle.lock().await;
    Ok(Json(detail(&session)))
}

#[derive(Debug, Deserialize)]
pub struct NewSessionRequest {
    #[serde(default)]
    pub title: Option<String>,
}

/// Create a session seeded with the greeting message
pub async fn new_session(
    State(state): State<AppState>,
    Json(payload): Json<NewSessionRequest>,
) -> Json<SessionDetail> {
    let title = payload.title.unwrap_or_else(|| "New chat".into());
    let session = state.sessions.create(title);
    Json(detail(&session))
}

/// Reset a session's conversation to a single greeting
pub async fn clear_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetail>, ApiError> {
    let id = SessionId::from_string(id);
    let session = state.sessions.clear(&id).await.map_err(|_| not_found(&id))?;
    Ok(Json(detail(&session)))
}

/// Download a session transcript as plain text
pub async fn export_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = SessionId::from_string(id);
    let handle = state.sessions.get(&id).map_err(|_| not_found(&id))?;
    let session = handle.lock().await;

    let mut transcript = format!("Transcript: {}\n\n", session.title);
    for message in visible_messages(&session) {
        transcript.push_str(&format!(
            "[{}] {}: {}\n",
            message.timestamp.format("%Y-%m-%d %H:%M:%S"),
            message.sender_name,
            message.content
        ));
    }

    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.txt\"", session.id),
        ),
    ];
    Ok((headers, transcript).into_response())
}

// ============================================================================
// Message handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub success: bool,
    pub user_message: ChatMessage,
    pub ai_response: ChatMessage,
    pub session_updated: DateTime<Utc>,
}

fn assistant_message(content: impl Into<String>) -> Message {
    Message::assistant(content).with_name(ASSISTANT_NAME)
}

/// Image requests skip the reasoning loop and go straight to templating.
fn image_shortcut(text: &str) -> Option<String> {
    match intent::detect(text)? {
        intent::ImageIntent::Invoice => Some(image::invoice_markdown(text)),
        intent::ImageIntent::General => Some(image::general_image_markdown(text)),
    }
}

/// Send a message and run one reasoning turn (non-streaming)
pub async fn send_message(
    State(state): State<AppState>,
    Json(payload): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let id = SessionId::from_string(payload.session_id);
    let handle = state.sessions.get(&id).map_err(|_| not_found(&id))?;

    // The lock is held for the whole turn; concurrent sends to the same
    // session serialize here.
    let mut session = handle.lock().await;

    let user_message = Message::user(&payload.message);
    let user_view = ChatMessage::from(&user_message);
    session.append(user_message).map_err(internal_error)?;

    let ai_view = if let Some(markdown) = image_shortcut(&payload.message) {
        let ai_message = assistant_message(markdown);
        let view = ChatMessage::from(&ai_message);
        session.append(ai_message).map_err(internal_error)?;
        view
    } else {
        let agent = Agent::new(
            state.provider.clone(),
            state.tools.clone(),
            state.agent.clone(),
        );
        match agent.run(&mut session.conversation).await {
            Ok(_) => {
                // The loop appended the final assistant message itself
                session.touch();
                match session.conversation.last() {
                    Some(m) => ChatMessage::from(m),
                    None => return Err(internal_error(AgentError::Other("empty turn".into()))),
                }
            }
            Err(e) => {
                tracing::error!(session = %session.id, error = %e, "turn failed");
                let apology = assistant_message(e.user_message());
                let view = ChatMessage::from(&apology);
                session.append(apology).map_err(internal_error)?;
                view
            }
        }
    };

    Ok(Json(SendResponse {
        success: true,
        user_message: user_view,
        ai_response: ai_view,
        session_updated: session.updated_at,
    }))
}

fn internal_error(e: AgentError) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.user_message(),
            code: "INTERNAL_ERROR".into(),
        }),
    )
}

/// SSE frames sent by the streaming endpoint
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    Chunk { content: String },
    Complete { ai_message: ChatMessage },
    Error { content: String },
}

fn sse_event(event: &StreamEvent) -> Event {
    Event::default()
        .json_data(event)
        .unwrap_or_else(|_| Event::default().data("{}"))
}

/// Send a message and stream the reasoning turn over SSE
pub async fn send_message_stream(
    State(state): State<AppState>,
    Json(payload): Json<SendRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let id = SessionId::from_string(payload.session_id);
    let handle = state.sessions.get(&id).map_err(|_| not_found(&id))?;

    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(64);

    tokio::spawn(async move {
        let mut session = handle.lock().await;

        if session.append(Message::user(&payload.message)).is_err() {
            return;
        }

        // Image shortcut: the markdown arrives as one chunk, then the
        // complete frame; no model involved
        if let Some(markdown) = image_shortcut(&payload.message) {
            let ai_message = assistant_message(&markdown);
            let view = ChatMessage::from(&ai_message);
            if session.append(ai_message).is_ok() {
                let _ = tx
                    .send(Ok(sse_event(&StreamEvent::Chunk { content: markdown })))
                    .await;
                let _ = tx
                    .send(Ok(sse_event(&StreamEvent::Complete { ai_message: view })))
                    .await;
            }
            return;
        }

        let agent = Agent::new(
            state.provider.clone(),
            state.tools.clone(),
            state.agent.clone(),
        );

        let (delta_tx, mut delta_rx) = mpsc::channel::<String>(64);
        let forwarder = {
            let tx = tx.clone();
            tokio::spawn(async move {
                while let Some(content) = delta_rx.recv().await {
                    if tx
                        .send(Ok(sse_event(&StreamEvent::Chunk { content })))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            })
        };

        let outcome = agent
            .run_streaming(&mut session.conversation, delta_tx)
            .await;
        let _ = forwarder.await;

        match outcome {
            Ok(_) => {
                session.touch();
                // The loop already appended the final assistant message
                let event = session
                    .conversation
                    .last()
                    .map(|m| StreamEvent::Complete {
                        ai_message: ChatMessage::from(m),
                    })
                    .unwrap_or_else(|| StreamEvent::Error {
                        content: "empty conversation".into(),
                    });
                let _ = tx.send(Ok(sse_event(&event))).await;
            }
            Err(e) => {
                tracing::error!(session = %session.id, error = %e, "streaming turn failed");
                let apology = e.user_message();
                let _ = session.append(assistant_message(&apology));
                let _ = tx
                    .send(Ok(sse_event(&StreamEvent::Error { content: apology })))
                    .await;
            }
        }
    });

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default()))
}

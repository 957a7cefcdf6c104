//! support-chat HTTP Server
//!
//! Axum-based backend for the customer-support assistant: session CRUD,
//! a send endpoint driving the tool-augmented reasoning loop, and an SSE
//! streaming variant.

mod handlers;
mod state;

use std::sync::Arc;

use chat_core::LlmProvider;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_core::{provider::GenerationOptions, reasoning::AgentConfig, SessionStore};
use chat_runtime::GeminiProvider;
use helpdesk::SUPPORT_SYSTEM_PROMPT;

use crate::handlers::{
    clear_session, export_session, get_session, health_check, list_sessions, new_session,
    send_message, send_message_stream, service_info,
};
use crate::state::AppState;

const GREETING: &str = "Hello! I'm Ava, your support assistant. How can I help you today?";

/// Generation options with `GEMINI_MODEL` / `GEMINI_TEMPERATURE` applied
fn generation_from_env() -> GenerationOptions {
    build_generation(
        std::env::var("GEMINI_MODEL").ok(),
        std::env::var("GEMINI_TEMPERATURE")
            .ok()
            .and_then(|t| t.parse().ok()),
    )
}

fn build_generation(model: Option<String>, temperature: Option<f32>) -> GenerationOptions {
    let mut generation = GenerationOptions::default();
    if let Some(model) = model {
        generation.model = model;
    }
    if let Some(temperature) = temperature {
        generation.temperature = temperature;
    }
    generation
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    // Initialize LLM provider; a missing API key is fatal
    let provider = Arc::new(GeminiProvider::from_env()?);

    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ Connected to Gemini"),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Gemini not reachable - turns will fail until it is");
        }
    }

    // Initialize tools
    let tools = Arc::new(helpdesk::default_registry());
    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    // Build application state
    let state = AppState {
        provider,
        tools,
        sessions: Arc::new(SessionStore::new(GREETING)),
        agent: AgentConfig {
            system_prompt: SUPPORT_SYSTEM_PROMPT.into(),
            generation: generation_from_env(),
            ..Default::default()
        },
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        // Health & info
        .route("/", get(service_info))
        .route("/health", get(health_check))
        // Sessions
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/new", post(new_session))
        .route("/api/sessions/{id}", get(get_session))
        .route("/api/sessions/{id}/clear", delete(clear_session))
        .route("/api/sessions/{id}/export", get(export_session))
        // Messages
        .route("/api/messages/send", post(send_message))
        .route("/api/messages/send/stream", post(send_message_stream))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 support-chat server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health                    - Health check");
    tracing::info!("  GET    /api/sessions              - List sessions");
    tracing::info!("  POST   /api/sessions/new          - Create session");
    tracing::info!("  GET    /api/sessions/{{id}}         - Session detail");
    tracing::info!("  DELETE /api/sessions/{{id}}/clear   - Reset session");
    tracing::info!("  GET    /api/sessions/{{id}}/export  - Download transcript");
    tracing::info!("  POST   /api/messages/send         - Send message");
    tracing::info!("  POST   /api/messages/send/stream  - Send message (SSE)");

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_defaults_when_unconfigured() {
        let generation = build_generation(None, None);
        assert_eq!(generation.model, "gemini-2.0-flash");
        assert!((generation.temperature - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_generation_overrides_apply() {
        let generation = build_generation(Some("gemini-1.5-pro".into()), Some(0.3));
        assert_eq!(generation.model, "gemini-1.5-pro");
        assert!((generation.temperature - 0.3).abs() < f32::EPSILON);
    }
}

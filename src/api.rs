//! REST API server for the finance chat
//!
//! One process serves one conversation: the session lives in the router
//! state and every `/api/chat` call is a turn in it.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::conversation::{Session, TurnController, TRANSCRIPT_FILE_NAME};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub controller: Arc<TurnController>,
    pub session: Arc<Mutex<Session>>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let message = req.message.trim();
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Message must not be empty".into())),
        );
    }

    // Turns are serialised: the transcript is append-only and ordered.
    let mut session = state.session.lock().await;
    info!(session_id = %session.session_id, "Chat request");

    match state.controller.run_turn(&mut session, message).await {
        Ok(report) => (StatusCode::OK, Json(ApiResponse::success(report))),
        Err(e) => {
            error!("Turn failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiResponse::error(format!("Model call failed: {}", e))),
            )
        }
    }
}

/// =============================
/// Transcript Endpoints
/// =============================

async fn messages_handler(State(state): State<ApiState>) -> Json<ApiResponse> {
    let session = state.session.lock().await;
    Json(ApiResponse::success(serde_json::json!({
        "session_id": session.session_id,
        "messages": session.messages(),
    })))
}

async fn transcript_handler(State(state): State<ApiState>) -> Response {
    let session = state.session.lock().await;

    if !session.can_download() {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("No conversation to download yet".into())),
        )
            .into_response();
    }

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", TRANSCRIPT_FILE_NAME),
            ),
        ],
        session.export_text(),
    )
        .into_response()
}

/// =============================
/// Router
/// =============================

pub fn create_router(controller: Arc<TurnController>) -> Router {
    let state = ApiState {
        controller,
        session: Arc::new(Mutex::new(Session::new())),
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/messages", get(messages_handler))
        .route("/api/transcript", get(transcript_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    controller: Arc<TurnController>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(controller);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

//! Chat endpoints.
//!
//! POST /api/chat          -- one JSON reply `{reply, context?}`
//! POST /api/chat/stream   -- raw `text/plain` fragments, closed at end of reply
//!
//! Both take `{sessionId?, message}`. Refusals and failures that happen before
//! the first fragment return the JSON error shape from [`AppError`]. A fault
//! after streaming has begun aborts the response body.

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use chatgate_types::chat::ChatReply;
use chatgate_types::session::DEFAULT_SESSION_ID;

use crate::http::error::AppError;
use crate::state::AppState;

/// Request body shared by both chat endpoints.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Conversation to continue; absent or blank selects the shared default.
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
    pub message: String,
}

impl ChatRequest {
    fn session_id(&self) -> &str {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_SESSION_ID)
    }
}

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    let session_id = body.session_id();
    tracing::debug!(session_id = %session_id, "Batch chat request");

    let reply = state.orchestrator.respond(session_id, &body.message).await?;
    Ok(Json(reply))
}

/// POST /api/chat/stream
pub async fn stream_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let session_id = body.session_id();
    tracing::debug!(session_id = %session_id, "Streaming chat request");

    let stream = state
        .orchestrator
        .respond_stream(session_id, &body.message)
        .await?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(stream),
    )
        .into_response())
}

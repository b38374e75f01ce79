//! Inference request/response types for Chatgate.
//!
//! These types model the data shapes exchanged with the inference backend
//! and the classifier service: completion requests, streaming events,
//! usage tracking, and backend errors.

use serde::{Deserialize, Serialize};

use crate::chat::Turn;
use crate::session::ContinuationToken;

/// Request to the inference backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub model: String,
    pub messages: Vec<Turn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ContinuationToken>,
    #[serde(default)]
    pub stream: bool,
}

/// Response from the inference backend for a non-streaming call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub model: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ContinuationToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub usage: Usage,
}

/// Token usage reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Events emitted during a streaming inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// An incremental fragment of assistant text.
    TextDelta { text: String },

    /// Terminal event carrying the final continuation token.
    Done {
        context: Option<ContinuationToken>,
        done_reason: Option<String>,
        usage: Usage,
    },
}

/// Errors from inference backend operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("backend error: {message}")]
    Provider { message: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("rate limited")]
    RateLimited,

    #[error("backend overloaded: {0}")]
    Overloaded(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

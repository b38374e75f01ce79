//! Application error type mapping chat failures to HTTP responses.
//!
//! Refusals and faults share one JSON shape: a human-readable `reply` the
//! client can show in place of an answer, and a machine-readable `reason`.
//! Backend details are logged, never returned.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use chatgate_types::error::ChatError;
use chatgate_types::moderation::{REFUSAL_REPLY, Rejection};

/// Shown when the inference backend cannot produce a reply.
pub const UNAVAILABLE_REPLY: &str = "The assistant is temporarily unavailable. Please try again.";

/// Shown when the request carried no usable message.
pub const INVALID_REPLY: &str = "Please enter a message.";

/// Body of every non-200 chat response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub reply: &'static str,
    pub reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Classifier verdict, present only on classifier refusals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety: Option<String>,
}

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub struct AppError(pub ChatError);

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, ErrorBody) {
        match &self.0 {
            ChatError::Rejected(rejection) => {
                let safety = match rejection {
                    Rejection::UnsafePattern => None,
                    Rejection::ClassifierRejected { verdict } => Some(verdict.label().to_string()),
                };
                (
                    StatusCode::BAD_REQUEST,
                    ErrorBody {
                        reply: REFUSAL_REPLY,
                        reason: rejection.code(),
                        message: Some(rejection.message().to_string()),
                        safety,
                    },
                )
            }
            ChatError::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    reply: INVALID_REPLY,
                    reason: "invalid_request",
                    message: Some(msg.clone()),
                    safety: None,
                },
            ),
            ChatError::Backend(_) => (
                StatusCode::BAD_GATEWAY,
                ErrorBody {
                    reply: UNAVAILABLE_REPLY,
                    reason: "inference_failed",
                    message: None,
                    safety: None,
                },
            ),
            ChatError::Timeout(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorBody {
                    reply: UNAVAILABLE_REPLY,
                    reason: "inference_timeout",
                    message: None,
                    safety: None,
                },
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "Chat request failed");
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use chatgate_types::llm::LlmError;
    use chatgate_types::moderation::Verdict;

    #[test]
    fn pattern_refusal_has_no_safety_field() {
        let (status, body) = AppError(Rejection::UnsafePattern.into()).parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json["reply"], REFUSAL_REPLY);
        assert_eq!(json["reason"], "unsafe_pattern");
        assert!(json.get("safety").is_none());
    }

    #[test]
    fn classifier_refusal_reports_verdict() {
        let err = ChatError::Rejected(Rejection::ClassifierRejected {
            verdict: Verdict::Error,
        });
        let (status, body) = AppError(err).parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.reason, "moderation_rejected");
        assert_eq!(body.safety.as_deref(), Some("ERROR"));
    }

    #[test]
    fn backend_faults_hide_details() {
        let err = ChatError::Backend(LlmError::Provider {
            message: "HTTP 500: secret internals".to_string(),
        });
        let (status, body) = AppError(err).parts();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("secret internals"));
        assert!(json.contains("inference_failed"));
    }

    #[test]
    fn timeouts_map_to_gateway_timeout() {
        let (status, body) = AppError(ChatError::Timeout(Duration::from_secs(120))).parts();
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body.reason, "inference_timeout");
        assert_eq!(body.reply, UNAVAILABLE_REPLY);
    }
}

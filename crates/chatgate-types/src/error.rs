use std::time::Duration;

use thiserror::Error;

use crate::llm::LlmError;
use crate::moderation::Rejection;

/// Errors returned by the chat pipeline.
///
/// `Rejected` is a normal moderation outcome; the remaining variants are
/// faults that leave the session untouched.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("rejected by moderation: {0}")]
    Rejected(Rejection),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("inference backend failed: {0}")]
    Backend(#[from] LlmError),

    #[error("inference backend timed out after {0:?}")]
    Timeout(Duration),
}

impl From<Rejection> for ChatError {
    fn from(rejection: Rejection) -> Self {
        ChatError::Rejected(rejection)
    }
}

/// Errors raised while building the moderation pipeline.
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("invalid denylist pattern: {0}")]
    InvalidPattern(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_from_rejection() {
        let err: ChatError = Rejection::UnsafePattern.into();
        assert!(matches!(err, ChatError::Rejected(Rejection::UnsafePattern)));
        assert_eq!(err.to_string(), "rejected by moderation: unsafe_pattern");
    }

    #[test]
    fn test_chat_error_from_llm_error() {
        let err: ChatError = LlmError::Stream("eof".to_string()).into();
        assert_eq!(err.to_string(), "inference backend failed: stream error: eof");
    }

    #[test]
    fn test_timeout_display() {
        let err = ChatError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("5s"));
    }
}

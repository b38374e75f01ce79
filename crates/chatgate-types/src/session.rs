//! Per-conversation state.
//!
//! A `Session` is the stored transcript of one conversation plus the opaque
//! continuation token the inference backend handed back after the last turn.
//! The system instruction is never stored here; it is injected fresh on
//! every request.

use serde::{Deserialize, Serialize};

use crate::chat::{Role, Turn};

/// Session key used when the caller does not supply one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Opaque backend state (e.g. an attention cache handle). Never inspected or merged.
pub type ContinuationToken = serde_json::Value;

/// Stored conversation state for one session key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Conversation turns in insertion order.
    pub messages: Vec<Turn>,
    /// Continuation token from the most recent successful turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContinuationToken>,
}

impl Session {
    /// Number of stored turns.
    pub fn turn_count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.context.is_none()
    }

    /// Whether the stored transcript has the expected shape.
    ///
    /// Well-formed means: no system turns, and turns strictly alternate
    /// user/assistant starting with user and ending with assistant. A
    /// trailing user turn indicates a write that never got its reply.
    pub fn is_well_formed(&self) -> bool {
        if self.messages.len() % 2 != 0 {
            return false;
        }
        self.messages.iter().enumerate().all(|(i, turn)| {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            turn.role == expected
        })
    }
}

//! Moderation verdicts and refusal types.
//!
//! A `Verdict` is the classifier's judgment on a candidate message. A
//! `Rejection` records which moderation stage blocked a message; it is a
//! normal outcome, not a fault.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed reply text returned for every moderation refusal.
pub const REFUSAL_REPLY: &str = "Your request was blocked by safety filters.";

/// Label reported for a classifier call that failed or timed out.
pub const ERROR_VERDICT: &str = "ERROR";

/// Default marker a classifier label must lead with to count as safe.
pub const DEFAULT_SAFE_MARKER: &str = "safe";

/// Outcome of a classifier call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "label", rename_all = "snake_case")]
pub enum Verdict {
    /// Raw label text returned by the classifier.
    Label(String),
    /// The classifier could not be reached or returned garbage.
    Error,
}

impl Verdict {
    /// Whether this verdict allows the message through.
    ///
    /// The label's first token (split on whitespace and ASCII punctuation)
    /// must equal `marker`, ignoring ASCII case. `Error` is never safe.
    pub fn is_safe(&self, marker: &str) -> bool {
        match self {
            Verdict::Error => false,
            Verdict::Label(label) => {
                if marker.is_empty() {
                    return false;
                }
                label
                    .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
                    .find(|token| !token.is_empty())
                    .is_some_and(|token| token.eq_ignore_ascii_case(marker))
            }
        }
    }

    /// Label text suitable for the `safety` field of a refusal.
    pub fn label(&self) -> &str {
        match self {
            Verdict::Label(label) => label.trim(),
            Verdict::Error => ERROR_VERDICT,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a message was refused before reaching the inference backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The lexical denylist matched.
    UnsafePattern,
    /// The classifier returned a non-safe verdict (including `Error`).
    ClassifierRejected { verdict: Verdict },
}

impl Rejection {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::UnsafePattern => "unsafe_pattern",
            Rejection::ClassifierRejected { .. } => "moderation_rejected",
        }
    }

    /// Human-readable explanation for the caller.
    pub fn message(&self) -> &'static str {
        match self {
            Rejection::UnsafePattern => "Potentially unsafe or code-execution content detected.",
            Rejection::ClassifierRejected { .. } => {
                "The message was flagged by content moderation."
            }
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::UnsafePattern => write!(f, "{}", self.code()),
            Rejection::ClassifierRejected { verdict } => {
                write!(f, "{} (verdict: {verdict})", self.code())
            }
        }
    }
}

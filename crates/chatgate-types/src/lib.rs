//! Shared domain types for Chatgate.
//!
//! This crate contains the data shapes used across the gateway: conversation
//! turns and sessions, moderation verdicts, inference request/response types,
//! configuration, and the error enums shared between layers.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod moderation;
pub mod session;

//! Ollama-compatible inference backend.
//!
//! This module provides the [`OllamaBackend`] which implements the
//! [`InferenceBackend`](chatgate_core::llm::backend::InferenceBackend) trait
//! for the `/api/chat` endpoint, including NDJSON streaming. The same client
//! serves both the chat model and the moderation classifier.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::OllamaBackend;

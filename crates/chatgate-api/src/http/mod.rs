//! HTTP transport for Chatgate.
//!
//! Axum router exposing batch and streaming chat under `/api/chat`, the
//! content catalog under `/api/posts`, and `/health`. CORS origins come from
//! configuration.

pub mod error;
pub mod handlers;
pub mod router;

//! Infrastructure layer for Chatgate.
//!
//! Contains the I/O adapters behind the traits defined in `chatgate-core`:
//! the Ollama-compatible HTTP inference backend (batch and NDJSON streaming),
//! the TOML configuration loader, and the static content catalog loader.

pub mod catalog;
pub mod config;
pub mod ollama;

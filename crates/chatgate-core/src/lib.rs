//! Business logic for Chatgate.
//!
//! This crate defines the safety-gated chat pipeline: the lexical denylist and
//! classifier gate, the per-key serialized session store, and the orchestrator
//! that drives the inference backend in batch or streaming mode. It depends
//! only on `chatgate-types` -- never on `chatgate-infra` or any HTTP crate.

pub mod chat;
pub mod llm;
pub mod moderation;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

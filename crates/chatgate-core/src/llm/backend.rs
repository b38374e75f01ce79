//! InferenceBackend trait definition.
//!
//! The single abstraction the orchestrator and the classifier gate call
//! through. Uses RPITIT for `complete` and a `Pin<Box<dyn Stream>>` for
//! `stream` so the trait can be made object-safe by `BoxInferenceBackend`.

use std::pin::Pin;

use futures_util::Stream;

use chatgate_types::llm::{InferenceRequest, InferenceResponse, LlmError, StreamEvent};

/// Boxed stream of backend events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// Trait for inference backends (Ollama-compatible servers, test doubles).
///
/// Implementations live in chatgate-infra (e.g., `OllamaBackend`).
pub trait InferenceBackend: Send + Sync {
    /// Human-readable backend name used in tracing spans.
    fn name(&self) -> &str;

    /// Send a request and receive the complete reply.
    fn complete(
        &self,
        request: &InferenceRequest,
    ) -> impl std::future::Future<Output = Result<InferenceResponse, LlmError>> + Send;

    /// Send a streaming request.
    ///
    /// The stream yields `TextDelta` fragments in generation order and ends
    /// with exactly one `Done`. Dropping the stream aborts the call.
    fn stream(&self, request: InferenceRequest) -> EventStream;
}

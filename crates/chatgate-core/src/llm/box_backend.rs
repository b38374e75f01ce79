//! BoxInferenceBackend -- object-safe dynamic dispatch wrapper for InferenceBackend.
//!
//! 1. Define an object-safe `InferenceBackendDyn` trait with boxed futures
//! 2. Blanket-impl `InferenceBackendDyn` for all `T: InferenceBackend`
//! 3. `BoxInferenceBackend` wraps `Box<dyn InferenceBackendDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use chatgate_types::llm::{InferenceRequest, InferenceResponse, LlmError};

use super::backend::{EventStream, InferenceBackend};

/// Object-safe version of [`InferenceBackend`] with boxed futures.
pub trait InferenceBackendDyn: Send + Sync {
    fn name(&self) -> &str;

    fn complete_boxed<'a>(
        &'a self,
        request: &'a InferenceRequest,
    ) -> Pin<Box<dyn Future<Output = Result<InferenceResponse, LlmError>> + Send + 'a>>;

    fn stream_boxed(&self, request: InferenceRequest) -> EventStream;
}

impl<T: InferenceBackend> InferenceBackendDyn for T {
    fn name(&self) -> &str {
        InferenceBackend::name(self)
    }

    fn complete_boxed<'a>(
        &'a self,
        request: &'a InferenceRequest,
    ) -> Pin<Box<dyn Future<Output = Result<InferenceResponse, LlmError>> + Send + 'a>> {
        Box::pin(self.complete(request))
    }

    fn stream_boxed(&self, request: InferenceRequest) -> EventStream {
        self.stream(request)
    }
}

/// Type-erased inference backend.
///
/// Lets the gateway pick the chat backend and the classifier backend at
/// runtime (they may be different servers) without making every consumer
/// generic over the concrete client type.
pub struct BoxInferenceBackend {
    inner: Box<dyn InferenceBackendDyn + Send + Sync>,
}

impl BoxInferenceBackend {
    /// Wrap a concrete `InferenceBackend` in a type-erased box.
    pub fn new<T: InferenceBackend + 'static>(backend: T) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn complete(&self, request: &InferenceRequest) -> Result<InferenceResponse, LlmError> {
        self.inner.complete_boxed(request).await
    }

    pub fn stream(&self, request: InferenceRequest) -> EventStream {
        self.inner.stream_boxed(request)
    }
}

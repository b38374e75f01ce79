//! OllamaBackend -- concrete [`InferenceBackend`] for an Ollama-compatible server.
//!
//! Sends requests to `/api/chat`. Supports both non-streaming (`complete`)
//! and NDJSON streaming (`stream`) modes.
//!
//! An optional bearer token (for servers behind an authenticating proxy) is
//! wrapped in [`secrecy::SecretString`] and is never logged or included in
//! `Debug` output.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};

use chatgate_core::llm::backend::{EventStream, InferenceBackend};
use chatgate_types::llm::{InferenceRequest, InferenceResponse, LlmError};

use super::streaming::create_ollama_stream;
use super::types::{OllamaChatChunk, OllamaChatRequest, OllamaMessage};

/// Ollama-compatible inference backend.
///
/// Request-level deadlines are enforced by callers; the client itself only
/// bounds connection setup.
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<Arc<SecretString>>,
}

impl OllamaBackend {
    const CHAT_PATH: &'static str = "/api/chat";
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a backend talking to `base_url` (e.g. `http://localhost:11434`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Self::CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            api_key: None,
        })
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(Arc::new(api_key));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Convert a generic [`InferenceRequest`] into the wire request.
    fn to_ollama_request(&self, request: &InferenceRequest, stream: bool) -> OllamaChatRequest {
        let messages = request
            .messages
            .iter()
            .map(|turn| OllamaMessage {
                role: turn.role.to_string(),
                content: turn.content.clone(),
            })
            .collect();

        OllamaChatRequest {
            model: request.model.clone(),
            messages,
            stream,
            context: request.context.clone(),
        }
    }
}

// No Debug derive: keeps the optional credential out of formatted output.

/// POST a chat request, attaching the bearer token when configured.
pub(crate) async fn send(
    client: &reqwest::Client,
    url: &str,
    body: &OllamaChatRequest,
    api_key: Option<&SecretString>,
) -> Result<reqwest::Response, LlmError> {
    let mut builder = client.post(url).json(body);
    if let Some(key) = api_key {
        builder = builder.bearer_auth(key.expose_secret());
    }
    builder.send().await.map_err(|e| LlmError::Provider {
        message: format!("HTTP request failed: {e}"),
    })
}

/// Pass successful responses through; turn anything else into an [`LlmError`].
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = %status, "Inference backend returned an error response");
    Err(status_error(status, body))
}

pub(crate) fn status_error(status: StatusCode, body: String) -> LlmError {
    match status.as_u16() {
        400 | 404 => LlmError::InvalidRequest(format!("HTTP {status}: {body}")),
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited,
        503 => LlmError::Overloaded(body),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

impl InferenceBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &InferenceRequest) -> Result<InferenceResponse, LlmError> {
        let body = self.to_ollama_request(request, false);
        let url = self.url(Self::CHAT_PATH);

        let response = send(&self.client, &url, &body, self.api_key.as_deref()).await?;
        let response = check_status(response).await?;

        let mut chunk: OllamaChatChunk = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        if let Some(message) = chunk.error.take() {
            return Err(LlmError::Provider { message });
        }
        if chunk.message.is_none() {
            return Err(LlmError::Deserialization(
                "response carried no message".to_string(),
            ));
        }

        let usage = chunk.usage();
        let content = chunk.text().to_string();
        let model = if chunk.model.is_empty() {
            request.model.clone()
        } else {
            chunk.model
        };

        Ok(InferenceResponse {
            model,
            content,
            context: chunk.context,
            done_reason: chunk.done_reason,
            usage,
        })
    }

    fn stream(&self, request: InferenceRequest) -> EventStream {
        let body = self.to_ollama_request(&request, true);
        let url = self.url(Self::CHAT_PATH);

        create_ollama_stream(&self.client, &url, body, self.api_key.clone())
    }
}

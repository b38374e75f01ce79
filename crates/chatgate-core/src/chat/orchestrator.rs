//! Chat orchestrator.
//!
//! Runs one caller message through the full pipeline: validation,
//! moderation, session lease, inference, and commit. The user turn is only
//! written together with the assistant turn and the new continuation token,
//! so a failed or abandoned call leaves the session exactly as it was.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span};

use chatgate_types::chat::{ChatReply, Turn};
use chatgate_types::config::InferenceConfig;
use chatgate_types::error::ChatError;
use chatgate_types::llm::{InferenceRequest, LlmError};
use chatgate_types::session::Session;

use crate::llm::box_backend::BoxInferenceBackend;
use crate::moderation::ModerationPipeline;
use crate::session::SessionStore;

use super::stream::{FRAGMENT_BUFFER, Relay, ReplyStream};

/// Model and timing parameters for inference calls.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub system_prompt: String,
    pub request_timeout: Duration,
    pub stream_idle_timeout: Duration,
}

impl ChatSettings {
    pub fn from_config(config: &InferenceConfig) -> Self {
        Self {
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            request_timeout: config.request_timeout(),
            stream_idle_timeout: config.stream_idle_timeout(),
        }
    }
}

/// Composes moderation, session state, and the inference backend.
pub struct ChatOrchestrator {
    backend: Arc<BoxInferenceBackend>,
    moderation: ModerationPipeline,
    sessions: Arc<SessionStore>,
    settings: ChatSettings,
}

impl ChatOrchestrator {
    pub fn new(
        backend: Arc<BoxInferenceBackend>,
        moderation: ModerationPipeline,
        sessions: Arc<SessionStore>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            backend,
            moderation,
            sessions,
            settings,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Produce a complete reply in one backend call.
    pub async fn respond(&self, session_id: &str, text: &str) -> Result<ChatReply, ChatError> {
        validate_message(text)?;
        self.moderation.screen(text).await?;

        let lease = self.sessions.acquire(session_id).await;
        let request = self.build_request(lease.session(), text, false);

        let span = info_span!(
            "gen_ai.complete",
            gen_ai.system = self.backend.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.stream = false,
            session_id = %session_id,
            history = lease.session().turn_count(),
        );

        let call = tokio::time::timeout(self.settings.request_timeout, self.backend.complete(&request));
        let response = match call.instrument(span).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                error!(session_id = %session_id, error = %err, "Inference failed, session unchanged");
                return Err(err.into());
            }
            Err(_) => {
                error!(
                    session_id = %session_id,
                    timeout = ?self.settings.request_timeout,
                    "Inference timed out, session unchanged"
                );
                return Err(ChatError::Timeout(self.settings.request_timeout));
            }
        };

        info!(
            session_id = %session_id,
            model = %response.model,
            bytes = response.content.len(),
            output_tokens = response.usage.output_tokens,
            "Reply committed"
        );
        lease.commit(
            vec![Turn::user(text), Turn::assistant(response.content.clone())],
            response.context.clone(),
        );

        Ok(ChatReply {
            reply: response.content,
            context: response.context,
        })
    }

    /// Start a streamed reply.
    ///
    /// Returns once the backend has produced its first event, so failures to
    /// start surface here as errors rather than as a broken stream. The
    /// session stays leased until the stream commits or is dropped.
    pub async fn respond_stream(&self, session_id: &str, text: &str) -> Result<ReplyStream, ChatError> {
        validate_message(text)?;
        self.moderation.screen(text).await?;

        let lease = self.sessions.acquire(session_id).await;
        let request = self.build_request(lease.session(), text, true);

        let span = info_span!(
            "gen_ai.stream",
            gen_ai.system = self.backend.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.stream = true,
            session_id = %session_id,
            history = lease.session().turn_count(),
        );

        let mut events = self.backend.stream(request);
        let started = tokio::time::timeout(self.settings.request_timeout, events.next());
        let first = match started.instrument(span.clone()).await {
            Ok(Some(Ok(event))) => event,
            Ok(Some(Err(err))) => {
                error!(session_id = %session_id, error = %err, "Inference stream failed to start");
                return Err(err.into());
            }
            Ok(None) => {
                error!(session_id = %session_id, "Inference stream closed before any output");
                return Err(LlmError::Stream("stream closed before any output".to_string()).into());
            }
            Err(_) => {
                error!(
                    session_id = %session_id,
                    timeout = ?self.settings.request_timeout,
                    "Inference stream did not start in time"
                );
                return Err(ChatError::Timeout(self.settings.request_timeout));
            }
        };

        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        let cancel = CancellationToken::new();
        let relay = Relay {
            lease,
            user_text: text.to_string(),
            tx,
            cancel: cancel.clone(),
            idle_timeout: self.settings.stream_idle_timeout,
        };
        tokio::spawn(relay.run(first, events).instrument(span));

        Ok(ReplyStream::new(rx, cancel))
    }

    /// System turn, stored history, then the new user turn.
    fn build_request(&self, session: &Session, text: &str, stream: bool) -> InferenceRequest {
        let mut messages = Vec::with_capacity(session.messages.len() + 2);
        messages.push(Turn::system(self.settings.system_prompt.clone()));
        messages.extend(session.messages.iter().cloned());
        messages.push(Turn::user(text));

        InferenceRequest {
            model: self.settings.model.clone(),
            messages,
            context: session.context.clone(),
            stream,
        }
    }
}

fn validate_message(text: &str) -> Result<(), ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::InvalidRequest("message must not be empty".to_string()));
    }
    Ok(())
}

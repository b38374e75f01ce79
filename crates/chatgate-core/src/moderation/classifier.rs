//! Classifier gate.
//!
//! Sends the raw candidate text, as the sole user turn with no history, to a
//! moderation model and interprets the label it returns. Faults never
//! propagate: they become `Verdict::Error`, which is never safe.

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, debug, info_span, warn};

use chatgate_types::chat::Turn;
use chatgate_types::config::ModerationConfig;
use chatgate_types::llm::InferenceRequest;
use chatgate_types::moderation::Verdict;

use crate::llm::box_backend::BoxInferenceBackend;

/// Calls an external classification model and judges its verdict.
pub struct ClassifierGate {
    backend: Arc<BoxInferenceBackend>,
    model: String,
    safe_marker: String,
    timeout: Duration,
}

impl ClassifierGate {
    pub fn new(
        backend: Arc<BoxInferenceBackend>,
        model: impl Into<String>,
        safe_marker: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            safe_marker: safe_marker.into(),
            timeout,
        }
    }

    pub fn from_config(backend: Arc<BoxInferenceBackend>, config: &ModerationConfig) -> Self {
        Self::new(
            backend,
            config.model.clone(),
            config.safe_marker.clone(),
            config.timeout(),
        )
    }

    /// Classify `text`. Always single-turn; never returns an error.
    pub async fn classify(&self, text: &str) -> Verdict {
        let request = InferenceRequest {
            model: self.model.clone(),
            messages: vec![Turn::user(text)],
            context: None,
            stream: false,
        };

        let span = info_span!(
            "moderation.classify",
            gen_ai.system = self.backend.name(),
            gen_ai.request.model = %self.model,
        );

        let call = tokio::time::timeout(self.timeout, self.backend.complete(&request));
        match call.instrument(span).await {
            Ok(Ok(response)) => {
                debug!(verdict = %response.content.trim(), "Classifier verdict received");
                Verdict::Label(response.content)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "Classifier call failed, treating as unsafe");
                Verdict::Error
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "Classifier call timed out, treating as unsafe");
                Verdict::Error
            }
        }
    }

    /// Whether `verdict` lets a message through.
    pub fn is_safe(&self, verdict: &Verdict) -> bool {
        verdict.is_safe(&self.safe_marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Script, ScriptedBackend};
    use chatgate_types::chat::Role;

    fn gate(backend: &ScriptedBackend) -> ClassifierGate {
        ClassifierGate::new(backend.boxed(), "llama-guard3", "safe", Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_classify_sends_single_user_turn() {
        let backend = ScriptedBackend::new([Script::reply("safe")]);
        let verdict = gate(&backend).classify("How do VLANs work?").await;
        assert_eq!(verdict, Verdict::Label("safe".to_string()));

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "llama-guard3");
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[0].messages[0].role, Role::User);
        assert_eq!(requests[0].messages[0].content, "How do VLANs work?");
        assert!(requests[0].context.is_none());
        assert!(!requests[0].stream);
    }

    #[tokio::test]
    async fn test_backend_failure_yields_error_verdict() {
        let backend = ScriptedBackend::new([Script::Fail]);
        let gate = gate(&backend);
        let verdict = gate.classify("hi").await;
        assert_eq!(verdict, Verdict::Error);
        assert!(!gate.is_safe(&verdict));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_error_verdict() {
        let backend = ScriptedBackend::new([Script::Hang]);
        let verdict = gate(&backend).classify("hi").await;
        assert_eq!(verdict, Verdict::Error);
    }

    #[tokio::test]
    async fn test_unsafe_label_is_rejected() {
        let backend = ScriptedBackend::new([Script::reply("unsafe\nS14")]);
        let gate = gate(&backend);
        let verdict = gate.classify("something bad").await;
        assert!(!gate.is_safe(&verdict));
    }
}

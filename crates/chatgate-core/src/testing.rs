//! Scripted in-memory inference backend for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use chatgate_types::chat::Role;
use chatgate_types::llm::{InferenceRequest, InferenceResponse, LlmError, StreamEvent, Usage};

use crate::llm::backend::{EventStream, InferenceBackend};
use crate::llm::box_backend::BoxInferenceBackend;

/// One scripted backend behaviour, consumed per call.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    /// Complete reply (streamed as a single fragment).
    Reply { content: String, context: Option<Value> },
    /// Reply echoing the last user turn.
    Echo,
    /// Fragments followed by `Done`.
    Stream { fragments: Vec<String>, context: Option<Value> },
    /// Fragments followed by a stream error.
    StreamThenFail { fragments: Vec<String> },
    /// Fragments followed by a stream that never yields again.
    StreamThenStall { fragments: Vec<String> },
    /// Transport-level failure.
    Fail,
    /// Never completes.
    Hang,
}

impl Script {
    pub(crate) fn reply(content: &str) -> Self {
        Script::Reply {
            content: content.to_string(),
            context: None,
        }
    }

    pub(crate) fn reply_with_context(content: &str, context: Value) -> Self {
        Script::Reply {
            content: content.to_string(),
            context: Some(context),
        }
    }

    pub(crate) fn stream(fragments: &[&str], context: Value) -> Self {
        Script::Stream {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            context: Some(context),
        }
    }
}

/// Backend that plays back queued scripts and records every request.
///
/// Clones share the same queue and counters, so a test can keep a handle
/// after boxing one copy into the orchestrator.
#[derive(Clone)]
pub(crate) struct ScriptedBackend {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    fallback: Option<Script>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<InferenceRequest>>>,
}

impl ScriptedBackend {
    pub(crate) fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into_iter().collect())),
            fallback: None,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Backend that plays `script` for every call.
    pub(crate) fn repeating(script: Script) -> Self {
        let mut backend = Self::new([]);
        backend.fallback = Some(script);
        backend
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn boxed(&self) -> Arc<BoxInferenceBackend> {
        Arc::new(BoxInferenceBackend::new(self.clone()))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_script(&self, request: &InferenceRequest) -> Script {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.clone())
            .expect("scripted backend ran out of scripts");
        match script {
            Script::Echo => {
                let last_user = request
                    .messages
                    .iter()
                    .rev()
                    .find(|t| t.role == Role::User)
                    .map(|t| t.content.clone())
                    .unwrap_or_default();
                Script::Reply {
                    content: format!("echo: {last_user}"),
                    context: Some(Value::from(request.messages.len())),
                }
            }
            other => other,
        }
    }
}

fn response(request: &InferenceRequest, content: String, context: Option<Value>) -> InferenceResponse {
    InferenceResponse {
        model: request.model.clone(),
        content,
        context,
        done_reason: Some("stop".to_string()),
        usage: Usage::default(),
    }
}

impl InferenceBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &InferenceRequest) -> Result<InferenceResponse, LlmError> {
        let script = self.next_script(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match script {
            Script::Reply { content, context } => Ok(response(request, content, context)),
            Script::Stream { fragments, context } => {
                Ok(response(request, fragments.concat(), context))
            }
            Script::Fail | Script::StreamThenFail { .. } => Err(LlmError::Provider {
                message: "scripted failure".to_string(),
            }),
            Script::Hang | Script::StreamThenStall { .. } => std::future::pending().await,
            Script::Echo => unreachable!("echo is resolved in next_script"),
        }
    }

    fn stream(&self, request: InferenceRequest) -> EventStream {
        let script = self.next_script(&request);
        let delay = self.delay;
        Box::pin(async_stream::stream! {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match script {
                Script::Reply { content, context } => {
                    yield Ok(StreamEvent::TextDelta { text: content });
                    yield Ok(StreamEvent::Done { context, done_reason: None, usage: Usage::default() });
                }
                Script::Stream { fragments, context } => {
                    for text in fragments {
                        yield Ok(StreamEvent::TextDelta { text });
                    }
                    yield Ok(StreamEvent::Done { context, done_reason: None, usage: Usage::default() });
                }
                Script::StreamThenFail { fragments } => {
                    for text in fragments {
                        yield Ok(StreamEvent::TextDelta { text });
                    }
                    yield Err(LlmError::Stream("connection reset".to_string()));
                }
                Script::StreamThenStall { fragments } => {
                    for text in fragments {
                        yield Ok(StreamEvent::TextDelta { text });
                    }
                    std::future::pending::<()>().await;
                }
                Script::Fail => {
                    yield Err(LlmError::Provider { message: "scripted failure".to_string() });
                }
                Script::Hang => {
                    std::future::pending::<()>().await;
                }
                Script::Echo => unreachable!("echo is resolved in next_script"),
            }
        })
    }
}

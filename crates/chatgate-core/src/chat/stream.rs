//! Streaming relay between the inference backend and the caller.
//!
//! A spawned `Relay` task drains the backend stream, forwards each text
//! fragment through a bounded channel, and commits the assembled reply once
//! the backend signals `Done`. The caller holds the other end as a
//! `ReplyStream`; dropping it cancels the relay and the partial reply is
//! discarded. Both sides share one idle limit: a backend that stops
//! producing and a caller that stops reading each release the session
//! lease after `idle_timeout`.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use pin_project_lite::pin_project;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

use chatgate_types::chat::Turn;
use chatgate_types::error::ChatError;
use chatgate_types::llm::{LlmError, StreamEvent};

use crate::llm::backend::EventStream;
use crate::session::SessionLease;

/// Fragments buffered between the relay task and a slow caller.
pub(crate) const FRAGMENT_BUFFER: usize = 32;

pin_project! {
    /// Client-facing stream of reply fragments.
    ///
    /// Yields fragments in generation order. A backend fault mid-stream
    /// arrives as a final `Err` item.
    pub struct ReplyStream {
        #[pin]
        inner: ReceiverStream<Result<String, ChatError>>,
        guard: DropGuard,
    }
}

impl ReplyStream {
    pub(crate) fn new(rx: mpsc::Receiver<Result<String, ChatError>>, cancel: CancellationToken) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
            guard: cancel.drop_guard(),
        }
    }
}

impl Stream for ReplyStream {
    type Item = Result<String, ChatError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }
}

/// Producer half: owns the session lease until the reply commits or is dropped.
pub(crate) struct Relay {
    pub(crate) lease: SessionLease,
    pub(crate) user_text: String,
    pub(crate) tx: mpsc::Sender<Result<String, ChatError>>,
    pub(crate) cancel: CancellationToken,
    pub(crate) idle_timeout: Duration,
}

/// Text accumulated so far, kept for the commit or the discard log.
#[derive(Default)]
struct Assembled {
    text: String,
    fragments: usize,
}

impl Relay {
    /// Drive the backend stream to completion.
    ///
    /// `first` is the event already pulled while the caller waited for the
    /// stream to start.
    pub(crate) async fn run(self, first: StreamEvent, mut events: EventStream) {
        let mut assembled = Assembled::default();
        let mut pending = Some(first);

        loop {
            let event = match pending.take() {
                Some(event) => event,
                None => {
                    let pulled = tokio::select! {
                        _ = self.cancel.cancelled() => {
                            self.discard(&assembled, "client disconnected");
                            return;
                        }
                        pulled = tokio::time::timeout(self.idle_timeout, events.next()) => pulled,
                    };
                    match pulled {
                        Ok(Some(Ok(event))) => event,
                        Ok(Some(Err(err))) => {
                            error!(
                                session_id = %self.lease.id(),
                                error = %err,
                                "Inference stream failed"
                            );
                            let _ = self.forward(Err(err.into())).await;
                            self.discard(&assembled, "backend error");
                            return;
                        }
                        Ok(None) => {
                            error!(
                                session_id = %self.lease.id(),
                                "Inference stream ended without completion"
                            );
                            let err = LlmError::Stream("stream ended before completion".to_string());
                            let _ = self.forward(Err(err.into())).await;
                            self.discard(&assembled, "truncated stream");
                            return;
                        }
                        Err(_) => {
                            warn!(
                                session_id = %self.lease.id(),
                                timeout = ?self.idle_timeout,
                                "Inference stream went idle"
                            );
                            let _ = self.forward(Err(ChatError::Timeout(self.idle_timeout))).await;
                            self.discard(&assembled, "idle timeout");
                            return;
                        }
                    }
                }
            };

            match event {
                StreamEvent::TextDelta { text } => {
                    if text.is_empty() {
                        continue;
                    }
                    assembled.text.push_str(&text);
                    assembled.fragments += 1;
                    if let Err(reason) = self.forward(Ok(text)).await {
                        self.discard(&assembled, reason);
                        return;
                    }
                }
                StreamEvent::Done { context, usage, .. } => {
                    let Relay {
                        lease, user_text, ..
                    } = self;
                    info!(
                        session_id = %lease.id(),
                        fragments = assembled.fragments,
                        bytes = assembled.text.len(),
                        output_tokens = usage.output_tokens,
                        "Streamed reply committed"
                    );
                    lease.commit(
                        vec![Turn::user(user_text), Turn::assistant(assembled.text)],
                        context,
                    );
                    return;
                }
            }
        }
    }

    /// Send one item to the caller.
    ///
    /// Fails with the discard reason once the caller is gone or has not made
    /// room in the channel within `idle_timeout`.
    async fn forward(&self, item: Result<String, ChatError>) -> Result<(), &'static str> {
        let send = tokio::time::timeout(self.idle_timeout, self.tx.send(item));
        tokio::select! {
            _ = self.cancel.cancelled() => Err("client disconnected"),
            sent = send => match sent {
                Ok(Ok(())) => Ok(()),
                Ok(Err(_)) => Err("client disconnected"),
                Err(_) => {
                    warn!(
                        session_id = %self.lease.id(),
                        timeout = ?self.idle_timeout,
                        "Client stopped reading the reply stream"
                    );
                    Err("client stalled")
                }
            },
        }
    }

    fn discard(&self, assembled: &Assembled, reason: &str) {
        if assembled.fragments == 0 {
            debug!(session_id = %self.lease.id(), reason, "Stream aborted before any output");
            return;
        }
        info!(
            session_id = %self.lease.id(),
            reason,
            fragments = assembled.fragments,
            bytes = assembled.text.len(),
            "Partial reply discarded"
        );
    }
}

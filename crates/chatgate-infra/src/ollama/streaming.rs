//! NDJSON stream parser and async stream adapter.
//!
//! A streaming `/api/chat` reply is newline-delimited JSON. Network chunks
//! do not respect line boundaries, so bytes are buffered until a full line
//! is available:
//!
//! ```text
//! {"message":{"role":"assistant","content":"Hel"},"done":false}\n
//! {"message":{"role":"assistant","content":"lo"},"done":false}\n
//! {"message":{"role":"assistant","content":""},"done":true,"context":[...]}\n
//! ```
//!
//! The terminal object may itself carry text (a server that ignores
//! `stream: true` sends a single finished object), so it can expand into a
//! `TextDelta` followed by `Done`.

use std::sync::Arc;

use futures_util::StreamExt;
use secrecy::SecretString;

use chatgate_core::llm::backend::EventStream;
use chatgate_types::llm::{LlmError, StreamEvent};

use super::client::{check_status, send};
use super::types::{OllamaChatChunk, OllamaChatRequest};

/// Longest unterminated line accepted before the stream is abandoned.
pub(crate) const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Reassembles newline-delimited records from arbitrary byte chunks.
#[derive(Debug)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
    max_line: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    pub(crate) fn with_max_line(max_line: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line,
        }
    }

    /// Append a network chunk.
    ///
    /// Fails once the pending partial line grows past the limit.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Result<(), LlmError> {
        self.buf.extend_from_slice(chunk);
        let tail = match self.buf.iter().rposition(|&b| b == b'\n') {
            Some(pos) => self.buf.len() - pos - 1,
            None => self.buf.len(),
        };
        if tail > self.max_line {
            return Err(LlmError::Stream(format!(
                "stream line exceeds {} bytes without a newline",
                self.max_line
            )));
        }
        Ok(())
    }

    /// Next complete line, without its terminator.
    pub(crate) fn next_line(&mut self) -> Option<Vec<u8>> {
        let end = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    /// Whatever is left once the body ends (a final line with no newline).
    pub(crate) fn finish(&mut self) -> Option<Vec<u8>> {
        if self.buf.iter().all(u8::is_ascii_whitespace) {
            self.buf.clear();
            return None;
        }
        Some(std::mem::take(&mut self.buf))
    }
}

/// Convert one NDJSON line into stream events.
///
/// Blank lines and fragments without text yield nothing. A `done` line
/// yields its text (if any) before the `Done` event.
pub(crate) fn parse_line(line: &[u8]) -> Result<Vec<StreamEvent>, LlmError> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let mut chunk: OllamaChatChunk = serde_json::from_slice(line)
        .map_err(|e| LlmError::Deserialization(format!("stream line: {e}")))?;

    if let Some(message) = chunk.error.take() {
        return Err(LlmError::Provider { message });
    }

    let mut events = Vec::with_capacity(2);
    let text = chunk.text();
    if !text.is_empty() {
        events.push(StreamEvent::TextDelta {
            text: text.to_string(),
        });
    }

    if chunk.done {
        let usage = chunk.usage();
        events.push(StreamEvent::Done {
            context: chunk.context,
            done_reason: chunk.done_reason,
            usage,
        });
    }
    Ok(events)
}

/// Create a stream of [`StreamEvent`]s from a streaming `/api/chat` call.
///
/// The HTTP request is sent lazily on first poll. The stream ends after the
/// `Done` event; a body that closes before it yields `LlmError::Stream`.
pub fn create_ollama_stream(
    client: &reqwest::Client,
    url: &str,
    body: OllamaChatRequest,
    api_key: Option<Arc<SecretString>>,
) -> EventStream {
    let client = client.clone();
    let url = url.to_string();

    Box::pin(async_stream::try_stream! {
        let response = send(&client, &url, &body, api_key.as_deref()).await?;
        let response = check_status(response).await?;

        let mut bytes = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut finished = false;

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| LlmError::Stream(format!("response body read: {e}")))?;
            lines.push(&chunk)?;

            while let Some(line) = lines.next_line() {
                for event in parse_line(&line)? {
                    finished = matches!(event, StreamEvent::Done { .. });
                    yield event;
                }
                if finished {
                    break;
                }
            }
            if finished {
                break;
            }
        }

        if !finished {
            if let Some(line) = lines.finish() {
                for event in parse_line(&line)? {
                    finished = matches!(event, StreamEvent::Done { .. });
                    yield event;
                }
            }
        }

        if !finished {
            tracing::warn!(url = %url, "Inference stream closed without a done marker");
            Err::<(), _>(LlmError::Stream("stream ended without a done marker".to_string()))?;
        }
    })
}

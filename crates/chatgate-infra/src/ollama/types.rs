//! Ollama `/api/chat` wire types.
//!
//! These are backend-specific request/response structures. They are NOT the
//! generic inference types from chatgate-types, which stay backend-agnostic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use chatgate_types::llm::Usage;

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,
    /// Opaque continuation state returned by a previous reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

/// One reply object.
///
/// A batch call returns exactly one with `done: true`. A streaming call
/// returns one per line: fragments with `done: false`, then a final object
/// carrying the continuation token and token counts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaChatChunk {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub message: Option<OllamaMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
    /// Set instead of `message` when the backend fails mid-request.
    #[serde(default)]
    pub error: Option<String>,
}

impl OllamaChatChunk {
    /// Text carried by this object, empty when there is none.
    pub fn text(&self) -> &str {
        self.message.as_ref().map_or("", |m| m.content.as_str())
    }

    pub fn usage(&self) -> Usage {
        Usage {
            input_tokens: self.prompt_eval_count.unwrap_or(0),
            output_tokens: self.eval_count.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_absent_context() {
        let request = OllamaChatRequest {
            model: "llama3.2".to_string(),
            messages: vec![OllamaMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
            stream: false,
            context: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "llama3.2",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": false,
            })
        );
    }

    #[test]
    fn test_final_chunk_parses_usage_and_context() {
        let chunk: OllamaChatChunk = serde_json::from_value(json!({
            "model": "llama3.2",
            "created_at": "2024-11-15T10:00:00Z",
            "message": {"role": "assistant", "content": ""},
            "done": true,
            "done_reason": "stop",
            "context": [1, 2, 3],
            "prompt_eval_count": 12,
            "eval_count": 34,
            "total_duration": 5_000_000
        }))
        .unwrap();
        assert!(chunk.done);
        assert_eq!(chunk.text(), "");
        assert_eq!(chunk.context, Some(json!([1, 2, 3])));
        assert_eq!(
            chunk.usage(),
            Usage {
                input_tokens: 12,
                output_tokens: 34
            }
        );
    }

    #[test]
    fn test_error_object_parses() {
        let chunk: OllamaChatChunk =
            serde_json::from_str(r#"{"error":"model 'nope' not found"}"#).unwrap();
        assert_eq!(chunk.error.as_deref(), Some("model 'nope' not found"));
        assert!(!chunk.done);
    }
}

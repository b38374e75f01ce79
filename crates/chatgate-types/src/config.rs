//! Gateway configuration types for Chatgate.
//!
//! `GatewayConfig` represents the top-level `chatgate.toml` that controls the
//! listener, the inference and classifier backends, session retention, and
//! the content catalog. Every field has a default so an empty file is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::moderation::DEFAULT_SAFE_MARKER;

/// Top-level configuration for the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed by CORS. An empty list disables cross-origin access.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["https://krauscloud.com".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// Inference backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// System instruction prepended to every request (never stored).
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Limit for a batch call and for the first streamed fragment.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Limit on the gap between two streamed fragments.
    #[serde(default = "default_stream_idle_timeout_secs")]
    pub stream_idle_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_system_prompt() -> String {
    "You are a friendly assistant for a home lab and networking blog. \
     Answer clearly and concisely. Never run, write, or explain how to \
     execute code that modifies a system."
        .to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_stream_idle_timeout_secs() -> u64 {
    60
}

impl InferenceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            system_prompt: default_system_prompt(),
            request_timeout_secs: default_request_timeout_secs(),
            stream_idle_timeout_secs: default_stream_idle_timeout_secs(),
        }
    }
}

/// Classifier gate and denylist settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Classifier service URL; falls back to `inference.base_url` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_classifier_model")]
    pub model: String,
    #[serde(default = "default_safe_marker")]
    pub safe_marker: String,
    #[serde(default = "default_classifier_timeout_secs")]
    pub timeout_secs: u64,
    /// Additional case-insensitive regexes appended to the built-in denylist.
    #[serde(default)]
    pub extra_patterns: Vec<String>,
}

fn default_classifier_model() -> String {
    "llama-guard3".to_string()
}

fn default_safe_marker() -> String {
    DEFAULT_SAFE_MARKER.to_string()
}

fn default_classifier_timeout_secs() -> u64 {
    15
}

impl ModerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: default_classifier_model(),
            safe_marker: default_safe_marker(),
            timeout_secs: default_classifier_timeout_secs(),
            extra_patterns: Vec::new(),
        }
    }
}

/// Session retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of sessions kept before LRU eviction.
    #[serde(default = "default_session_capacity")]
    pub capacity: usize,
    /// Idle time after which a session is dropped; `0` keeps sessions forever.
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_session_capacity() -> usize {
    10_000
}

fn default_idle_ttl_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl SessionConfig {
    pub fn idle_ttl(&self) -> Option<Duration> {
        (self.idle_ttl_secs > 0).then(|| Duration::from_secs(self.idle_ttl_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: default_session_capacity(),
            idle_ttl_secs: default_idle_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Static article catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: String,
}

fn default_catalog_path() -> String {
    "posts.json".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

//! Gateway configuration loader for Chatgate.
//!
//! Reads a TOML file (default `chatgate.toml` in the working directory) and
//! deserializes it into [`GatewayConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed; [`validate_config`] then rejects
//! values the gateway cannot start with.

use std::path::Path;

use thiserror::Error;

use chatgate_types::config::GatewayConfig;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "chatgate.toml";

/// Configuration values the gateway cannot run with.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field} URL {url:?}: {reason}")]
    InvalidUrl {
        field: &'static str,
        url: String,
        reason: String,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("invalid CORS origin {0:?}")]
    InvalidOrigin(String),

    #[error("sessions.capacity must be at least 1")]
    ZeroCapacity,

    #[error("{0} must be at least 1 second")]
    ZeroTimeout(&'static str),
}

/// Load gateway configuration from `path`.
///
/// - If the file does not exist, returns [`GatewayConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_config(path: &Path) -> GatewayConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return GatewayConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return GatewayConfig::default();
        }
    };

    match toml::from_str::<GatewayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            GatewayConfig::default()
        }
    }
}

/// Base URL of the classifier service.
///
/// Falls back to the inference backend when no dedicated URL is configured.
pub fn classifier_base_url(config: &GatewayConfig) -> &str {
    config
        .moderation
        .base_url
        .as_deref()
        .unwrap_or(&config.inference.base_url)
}

/// Check the values that would otherwise fail on first use.
pub fn validate_config(config: &GatewayConfig) -> Result<(), ConfigError> {
    check_url("inference.base_url", &config.inference.base_url)?;
    check_url("moderation.base_url", classifier_base_url(config))?;

    if config.inference.model.trim().is_empty() {
        return Err(ConfigError::Empty("inference.model"));
    }
    if config.moderation.model.trim().is_empty() {
        return Err(ConfigError::Empty("moderation.model"));
    }
    if config.moderation.safe_marker.trim().is_empty() {
        return Err(ConfigError::Empty("moderation.safe_marker"));
    }
    if config.sessions.capacity == 0 {
        return Err(ConfigError::ZeroCapacity);
    }
    let timeouts = [
        ("inference.request_timeout_secs", config.inference.request_timeout_secs),
        ("inference.stream_idle_timeout_secs", config.inference.stream_idle_timeout_secs),
        ("moderation.timeout_secs", config.moderation.timeout_secs),
    ];
    if let Some(&(field, _)) = timeouts.iter().find(|&&(_, secs)| secs == 0) {
        return Err(ConfigError::ZeroTimeout(field));
    }
    for origin in &config.server.cors_origins {
        if reqwest::header::HeaderValue::from_str(origin).is_err() || origin.trim().is_empty() {
            return Err(ConfigError::InvalidOrigin(origin.clone()));
        }
    }
    Ok(())
}

fn check_url(field: &'static str, url: &str) -> Result<(), ConfigError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
        field,
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            field,
            url: url.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(DEFAULT_CONFIG_FILE)).await;
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.inference.model, "llama3.2");
        assert_eq!(config.sessions.capacity, 10_000);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        tokio::fs::write(
            &path,
            r#"
[server]
port = 9000
cors_origins = ["http://localhost:3000"]

[inference]
base_url = "http://gpu-box:11434"
model = "mistral"

[moderation]
base_url = "http://guard:11434"
extra_patterns = ["curl\\s+http"]

[sessions]
capacity = 50
idle_ttl_secs = 0
"#,
        )
        .await
        .unwrap();

        let config = load_config(&path).await;
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.inference.model, "mistral");
        assert_eq!(classifier_base_url(&config), "http://guard:11434");
        assert_eq!(config.moderation.extra_patterns, vec![r"curl\s+http"]);
        assert_eq!(config.sessions.capacity, 50);
        assert!(config.sessions.idle_ttl().is_none());
        assert!(validate_config(&config).is_ok());
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        tokio::fs::write(&path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(&path).await;
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.cors_origins, vec!["https://krauscloud.com"]);
    }

    #[test]
    fn classifier_falls_back_to_inference_url() {
        let config = GatewayConfig::default();
        assert_eq!(classifier_base_url(&config), "http://localhost:11434");
    }

    #[test]
    fn validate_config_accepts_defaults() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn validate_config_rejects_bad_values() {
        let mut config = GatewayConfig::default();
        config.inference.base_url = "localhost:11434".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { field: "inference.base_url", .. })
        ));

        let mut config = GatewayConfig::default();
        config.moderation.base_url = Some("not a url".to_string());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { field: "moderation.base_url", .. })
        ));

        let mut config = GatewayConfig::default();
        config.sessions.capacity = 0;
        assert!(matches!(validate_config(&config), Err(ConfigError::ZeroCapacity)));

        let mut config = GatewayConfig::default();
        config.inference.model = "  ".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Empty("inference.model"))
        ));

        let mut config = GatewayConfig::default();
        config.server.cors_origins = vec!["bad\norigin".to_string()];
        assert!(matches!(validate_config(&config), Err(ConfigError::InvalidOrigin(_))));
    }

    #[test]
    fn validate_config_rejects_zero_timeouts() {
        let mut config = GatewayConfig::default();
        config.inference.request_timeout_secs = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ZeroTimeout("inference.request_timeout_secs"))
        ));

        let mut config = GatewayConfig::default();
        config.inference.stream_idle_timeout_secs = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ZeroTimeout("inference.stream_idle_timeout_secs"))
        ));

        let mut config = GatewayConfig::default();
        config.moderation.timeout_secs = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ZeroTimeout("moderation.timeout_secs"))
        ));
    }
}

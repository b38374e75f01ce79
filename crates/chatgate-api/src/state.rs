//! Application state wiring all services together.
//!
//! AppState holds the orchestrator, the session store it writes to, and the
//! static catalog. The inference and classifier backends are erased to
//! `BoxInferenceBackend` so tests can substitute in-memory ones.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use secrecy::SecretString;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use chatgate_core::chat::{ChatOrchestrator, ChatSettings};
use chatgate_core::llm::box_backend::BoxInferenceBackend;
use chatgate_core::moderation::ModerationPipeline;
use chatgate_core::moderation::classifier::ClassifierGate;
use chatgate_core::moderation::pattern::PatternFilter;
use chatgate_core::session::SessionStore;
use chatgate_infra::catalog::load_catalog;
use chatgate_infra::config::{classifier_base_url, validate_config};
use chatgate_infra::ollama::OllamaBackend;
use chatgate_types::config::GatewayConfig;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub sessions: Arc<SessionStore>,
    pub catalog: Arc<Vec<Value>>,
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    /// Validate configuration, connect backends, and load the catalog.
    pub async fn init(config: GatewayConfig, api_key: Option<&str>) -> anyhow::Result<Self> {
        validate_config(&config).context("invalid configuration")?;

        let backend = ollama_backend(&config.inference.base_url, api_key)?;
        let classifier = ollama_backend(classifier_base_url(&config), api_key)?;
        tracing::info!(
            inference = %config.inference.base_url,
            classifier = %classifier_base_url(&config),
            model = %config.inference.model,
            classifier_model = %config.moderation.model,
            "Inference backends configured"
        );

        let catalog = load_catalog(Path::new(&config.catalog.path))
            .await
            .context("failed to load content catalog")?;

        Self::new(config, backend, classifier, catalog)
    }

    /// Wire state from already-built backends.
    pub fn new(
        config: GatewayConfig,
        backend: Arc<BoxInferenceBackend>,
        classifier: Arc<BoxInferenceBackend>,
        catalog: Vec<Value>,
    ) -> anyhow::Result<Self> {
        let filter = PatternFilter::with_extra_patterns(&config.moderation.extra_patterns)
            .context("invalid moderation.extra_patterns")?;
        let gate = ClassifierGate::from_config(classifier, &config.moderation);
        let moderation = ModerationPipeline::new(filter, gate);

        let sessions = Arc::new(SessionStore::from_config(&config.sessions));
        let orchestrator = Arc::new(ChatOrchestrator::new(
            backend,
            moderation,
            Arc::clone(&sessions),
            ChatSettings::from_config(&config.inference),
        ));

        Ok(Self {
            orchestrator,
            sessions,
            catalog: Arc::new(catalog),
            config: Arc::new(config),
        })
    }

    /// Periodically drop idle sessions until `cancel` fires.
    pub fn spawn_session_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let sessions = Arc::clone(&self.sessions);
        let period = self.config.sessions.sweep_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = sessions.evict_idle();
                        if evicted > 0 {
                            tracing::info!(evicted, remaining = sessions.len(), "Idle sessions swept");
                        }
                    }
                }
            }
            tracing::debug!("Session sweeper stopped");
        })
    }
}

fn ollama_backend(
    base_url: &str,
    api_key: Option<&str>,
) -> anyhow::Result<Arc<BoxInferenceBackend>> {
    let mut backend = OllamaBackend::new(base_url)
        .with_context(|| format!("failed to create backend client for {base_url}"))?;
    if let Some(key) = api_key {
        backend = backend.with_api_key(SecretString::from(key));
    }
    Ok(Arc::new(BoxInferenceBackend::new(backend)))
}

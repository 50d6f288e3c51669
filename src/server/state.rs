//! Application state shared across all request handlers.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::backend::{BackendClient, SessionStore};
use crate::config::AppConfig;
use crate::llm::OpenAiClient;
use crate::prompt::PromptGenerator;
use crate::quota::{QuotaController, QuotaStore, SystemClock};
use crate::storage::{Preferences, open_store};

/// Shared application state.
pub struct AppState {
    /// Quota-gated prompt actions.
    pub controller: QuotaController,
    /// Persisted user preferences.
    pub preferences: Preferences,
    /// Persisted backend session.
    pub sessions: SessionStore,
    /// Backend client, when one is configured.
    pub backend: Option<BackendClient>,
}

impl AppState {
    /// Assemble state from already built parts.
    #[must_use]
    pub fn new(
        controller: QuotaController,
        preferences: Preferences,
        sessions: SessionStore,
        backend: Option<BackendClient>,
    ) -> Arc<Self> {
        Arc::new(Self {
            controller,
            preferences,
            sessions,
            backend,
        })
    }

    /// Build every component from configuration.
    ///
    /// # Errors
    /// Returns an error if storage cannot be opened or a client cannot be built.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Arc<Self>> {
        let store = open_store(&config.storage)
            .await
            .context("Failed to open key-value storage")?;

        if config.llm.api_key.is_none() {
            warn!("No OpenAI API key configured, prompts will come from the local corpus");
        }
        let openai = Arc::new(
            OpenAiClient::new(&config.llm).context("Failed to create OpenAI client")?,
        );
        let generator = PromptGenerator::new(
            openai.clone(),
            openai,
            config.llm.clone(),
            config.generator.clone(),
        );

        let quota = QuotaStore::new(Arc::clone(&store), Arc::new(SystemClock));
        let controller = QuotaController::new(config.quota.clone(), quota, generator)
            .context("Failed to compile prompt parser")?;

        let backend = config
            .backend
            .as_ref()
            .map(BackendClient::new)
            .transpose()
            .context("Failed to create backend client")?;
        if backend.is_none() {
            info!("No backend configured, challenges use the placeholder");
        }

        Ok(Self::new(
            controller,
            Preferences::new(Arc::clone(&store)),
            SessionStore::new(store),
            backend,
        ))
    }
}

//! Application state management

use edgelink_core::{AppConfig, Result};
use edgelink_rag::{create_llm_client, AnswerOrchestrator};
use edgelink_vector::DocumentStore;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Document store (shared with the orchestrator)
    pub store: Arc<DocumentStore>,
    /// Answer orchestrator
    pub orchestrator: Arc<AnswerOrchestrator>,
}

impl AppState {
    /// Create application state from already constructed components
    pub fn new(
        config: AppConfig,
        store: Arc<DocumentStore>,
        orchestrator: Arc<AnswerOrchestrator>,
    ) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            store,
            orchestrator,
        }
    }

    /// Build the store, generation client and orchestrator described by `config`
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let store = Arc::new(DocumentStore::from_config(&config).await?);
        let llm_client = create_llm_client(&config.llm);
        if !llm_client.is_configured() {
            tracing::warn!(
                provider = llm_client.provider(),
                "Generation credential is not set; /ask will fail until it is"
            );
        }

        let orchestrator = Arc::new(AnswerOrchestrator::new(
            Arc::clone(&store),
            llm_client,
            config.rag.clone(),
        ));

        Ok(Self::new(config, store, orchestrator))
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

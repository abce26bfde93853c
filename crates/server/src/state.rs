use std::sync::Arc;

use relaypost_core::{Config, JobOrchestrator, JobStore, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn JobStore>,
    orchestrator: Arc<JobOrchestrator>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn JobStore>,
        orchestrator: Arc<JobOrchestrator>,
    ) -> Self {
        Self {
            config,
            store,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn store(&self) -> &dyn JobStore {
        self.store.as_ref()
    }

    pub fn orchestrator(&self) -> &Arc<JobOrchestrator> {
        &self.orchestrator
    }
}

use std::sync::Arc;
use std::time::Duration;

use warta_core::ArticleStorage;
use warta_scrapers::{ExtractionOrchestrator, SourceRegistry};

pub struct AppState {
    pub orchestrator: Arc<ExtractionOrchestrator>,
    pub storage: Arc<dyn ArticleStorage>,
    /// Upper bound on one `/scrape` call, retries and content fetches included.
    pub request_budget: Duration,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<ExtractionOrchestrator>,
        storage: Arc<dyn ArticleStorage>,
        request_budget: Duration,
    ) -> Self {
        Self {
            orchestrator,
            storage,
            request_budget,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        self.orchestrator.registry()
    }
}

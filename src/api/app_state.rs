use crate::corpus::CorpusService;
use crate::observability::AppMetrics;
use crate::services::orchestrator::SearchService;
use std::sync::Arc;

/// Application state containing all shared services
#[derive(Clone)]
pub struct AppState {
    /// Search orchestration service
    pub search_service: Arc<dyn SearchService>,
    /// Game corpus with snapshot cache
    pub corpus: Arc<CorpusService>,
    /// Application metrics
    pub metrics: Arc<AppMetrics>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("search_service", &"Arc<dyn SearchService>")
            .field("corpus", &"Arc<CorpusService>")
            .field("metrics", &"Arc<AppMetrics>")
            .finish()
    }
}

impl AppState {
    /// Create new application state
    pub fn new(
        search_service: Arc<dyn SearchService>,
        corpus: Arc<CorpusService>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            search_service,
            corpus,
            metrics,
        }
    }
}

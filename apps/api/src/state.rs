use std::sync::Arc;

use crate::search::service::JobSearchService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Adapters, classifier and LLM client, created once per process.
    pub search: Arc<JobSearchService>,
}

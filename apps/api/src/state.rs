use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::RecommendationService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub service: Arc<RecommendationService>,
}

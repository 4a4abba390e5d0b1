use std::sync::Arc;

use crate::services::PredictionService;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// Prediction service owning history, model log and cache
    pub service: Arc<PredictionService>,
}

impl AppState {
    pub fn new(service: Arc<PredictionService>) -> Self {
        Self { service }
    }
}

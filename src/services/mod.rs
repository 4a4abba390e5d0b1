pub mod prediction_service;

pub use prediction_service::{
    PredictionService, PredictionSnapshot, RefreshOutcome, ServiceHealth,
};

//! Prediction engine
//!
//! Pure functions over a newest-first [`History`](crate::domain::History):
//! streak detection, the heuristic model bank, per-model accuracy tracking,
//! the weighted ensemble and the numeric-total estimator.

pub mod ensemble;
pub mod models;
pub mod patterns;
pub mod performance;
pub mod predictor;
pub mod streak;
pub mod totals;

#[cfg(test)]
pub(crate) mod test_support;

pub use ensemble::{combine, EnsembleOutcome};
pub use models::{assess_bridge, BridgeAssessment, HeuristicModel, ModelKind, ModelVote};
pub use performance::{ModelLog, ModelScore, PerformanceTracker};
pub use predictor::{Evaluation, PredictionEngine, FALLBACK_CONFIDENCE};
pub use streak::{detect, StreakInfo};
pub use totals::{default_totals, estimate_totals};

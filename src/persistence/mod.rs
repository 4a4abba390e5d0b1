//! Prediction persistence
//!
//! [`PredictionStore`] keeps prediction records and the per-model log across
//! restarts. `PostgresStore` (in `adapters`) is the durable implementation;
//! [`MemoryStore`] is used when no database is configured and in tests.

pub mod memory;

use async_trait::async_trait;

use crate::domain::{Label, PredictionRecord, SessionId};
use crate::engine::ModelLog;
use crate::error::Result;

pub use memory::MemoryStore;

#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Insert or replace the record for its session. A realized label that
    /// is already stored is kept when the new record has none.
    async fn save_prediction(&self, record: &PredictionRecord) -> Result<()>;

    /// Set the realized label. `false` when no record exists for `session`.
    async fn report_outcome(&self, session: SessionId, label: Label) -> Result<bool>;

    async fn get_prediction(&self, session: SessionId) -> Result<Option<PredictionRecord>>;

    /// Newest first by session id
    async fn recent_predictions(&self, limit: usize) -> Result<Vec<PredictionRecord>>;

    /// The persisted model log, or an empty log when none was saved
    async fn load_model_log(&self) -> Result<ModelLog>;

    async fn save_model_log(&self, log: &ModelLog) -> Result<()>;
}

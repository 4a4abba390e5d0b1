use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::PredictionStore;
use crate::domain::{Label, PredictionRecord, SessionId};
use crate::engine::ModelLog;
use crate::error::Result;

/// In-process store; contents are lost on restart
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<SessionId, PredictionRecord>>,
    model_log: RwLock<Option<ModelLog>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PredictionStore for MemoryStore {
    async fn save_prediction(&self, record: &PredictionRecord) -> Result<()> {
        let mut records = self.records.write().await;
        let mut record = record.clone();
        if record.realized_label.is_none() {
            record.realized_label = records
                .get(&record.session_id)
                .and_then(|existing| existing.realized_label);
        }
        records.insert(record.session_id, record);
        Ok(())
    }

    async fn report_outcome(&self, session: SessionId, label: Label) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&session) {
            Some(record) => {
                record.realized_label = Some(label);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_prediction(&self, session: SessionId) -> Result<Option<PredictionRecord>> {
        Ok(self.records.read().await.get(&session).cloned())
    }

    async fn recent_predictions(&self, limit: usize) -> Result<Vec<PredictionRecord>> {
        let records = self.records.read().await;
        Ok(records.values().rev().take(limit).cloned().collect())
    }

    async fn load_model_log(&self) -> Result<ModelLog> {
        Ok(self.model_log.read().await.clone().unwrap_or_default())
    }

    async fn save_model_log(&self, log: &ModelLog) -> Result<()> {
        *self.model_log.write().await = Some(log.clone());
        Ok(())
    }
}

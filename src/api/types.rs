use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Label, PredictionBasis, PredictionRecord, SessionId};
use crate::services::PredictionSnapshot;

// ============================================================================
// Prediction Types
// ============================================================================

/// Latest observed session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestSession {
    pub session: SessionId,
    pub dice: [u8; 3],
    pub total: i32,
    pub label: Label,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub latest: LatestSession,
    pub next_session: SessionId,
    pub prediction: Label,
    pub numeric_totals: [i32; 3],
    pub confidence: Decimal,
    pub rationale: String,
    pub basis: PredictionBasis,
    pub history_len: usize,
    pub predicted_at: DateTime<Utc>,
}

impl From<PredictionSnapshot> for PredictionResponse {
    fn from(snapshot: PredictionSnapshot) -> Self {
        let PredictionSnapshot {
            latest,
            prediction,
            history_len,
        } = snapshot;
        Self {
            latest: LatestSession {
                session: latest.session_id,
                dice: latest.faces,
                total: latest.total,
                label: latest.label,
            },
            next_session: prediction.session_id,
            prediction: prediction.label,
            numeric_totals: prediction.numeric_totals,
            confidence: prediction.confidence,
            rationale: prediction.rationale,
            basis: prediction.basis,
            history_len,
            predicted_at: prediction.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionsListResponse {
    pub predictions: Vec<PredictionRecord>,
    pub total: usize,
    /// Share of resolved predictions that were correct, in percent
    pub hit_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct PredictionsQuery {
    pub limit: Option<usize>,
}

// ============================================================================
// Report Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    /// Session id, with or without the leading '#'
    pub session: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub session: SessionId,
    pub label: Label,
    pub recorded: bool,
}

// ============================================================================
// Health Check Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: i64,
    pub history_len: usize,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::event::{Label, SessionId};

/// How a prediction was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionBasis {
    /// Full model ensemble
    Ensemble,
    /// Too little history; fixed fallback values
    InsufficientData,
}

impl PredictionBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionBasis::Ensemble => "ensemble",
            PredictionBasis::InsufficientData => "insufficient_data",
        }
    }
}

impl std::str::FromStr for PredictionBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ensemble" => Ok(PredictionBasis::Ensemble),
            "insufficient_data" => Ok(PredictionBasis::InsufficientData),
            other => Err(format!("unknown prediction basis: {other:?}")),
        }
    }
}

/// One prediction for the next session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Session being predicted
    pub session_id: SessionId,
    /// Latest observed session the prediction was computed from
    pub based_on: Option<SessionId>,
    pub label: Label,
    /// Three most likely totals, best first
    pub numeric_totals: [i32; 3],
    /// Heuristic confidence in percent (0-100, 2 dp)
    pub confidence: Decimal,
    pub rationale: String,
    pub basis: PredictionBasis,
    /// Ground truth, filled in once the session resolves
    pub realized_label: Option<Label>,
    pub timestamp: DateTime<Utc>,
}

impl PredictionRecord {
    /// Whether the realized outcome matched, once known
    pub fn is_correct(&self) -> Option<bool> {
        self.realized_label.map(|actual| actual == self.label)
    }
}

//! Walk-forward replay over a recorded feed dump.
//!
//! Flow:
//! 1. Classify the dump and order it oldest → newest
//! 2. For each session after the warm-up, predict it from the sessions
//!    before it (bounded to the live history capacity), carrying the log
//! 3. Tally ensemble and per-model hits; Triple outcomes count as misses

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::adapters::parse_feed_body;
use crate::domain::{History, PredictionBasis, RawOutcome};
use crate::engine::{ModelKind, ModelLog, PredictionEngine};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Sessions observed before the first scored prediction
    pub warmup: usize,
    /// History window handed to the engine, as in the live service
    pub capacity: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            warmup: 10,
            capacity: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelAccuracy {
    pub predictions: usize,
    pub correct: usize,
    pub hit_rate: f64,
}

impl ModelAccuracy {
    fn tally(&mut self, hit: bool) {
        self.predictions += 1;
        if hit {
            self.correct += 1;
        }
        self.hit_rate = self.correct as f64 / self.predictions as f64 * 100.0;
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayResult {
    pub sessions: usize,
    pub total_predictions: usize,
    pub correct: usize,
    /// Percent of scored predictions that matched
    pub hit_rate: f64,
    pub fallback_predictions: usize,
    pub triples: usize,
    pub by_model: BTreeMap<String, ModelAccuracy>,
}

/// Read a dump in feed format (`{"data":{"resultList":[..]}}`) or a bare
/// JSON array of rows.
pub fn load_dump<P: AsRef<Path>>(path: P) -> Result<Vec<RawOutcome>> {
    let body = std::fs::read_to_string(path)?;
    match serde_json::from_str::<Vec<RawOutcome>>(&body) {
        Ok(rows) => Ok(rows),
        Err(_) => parse_feed_body(&body),
    }
}

/// Replay `rows` through `engine` and score every prediction.
pub fn run_replay(rows: &[RawOutcome], engine: &PredictionEngine, cfg: &ReplayConfig) -> ReplayResult {
    let (full, stats) = History::from_raw(rows, rows.len());
    let mut chronological = full.events().to_vec();
    chronological.reverse();

    info!(
        sessions = chronological.len(),
        malformed = stats.malformed,
        warmup = cfg.warmup,
        "starting replay"
    );

    let now = Utc::now();
    let mut log = ModelLog::new();
    let mut result = ReplayResult {
        sessions: chronological.len(),
        ..ReplayResult::default()
    };
    let mut ensemble = ModelAccuracy::default();

    for i in cfg.warmup.max(1)..chronological.len() {
        let start = i.saturating_sub(cfg.capacity);
        let history = History::from_events(chronological[start..i].to_vec(), cfg.capacity);
        let actual = chronological[i];

        let (record, updated) = engine.predict(&history, &log, now);
        log = updated;

        if record.basis == PredictionBasis::InsufficientData {
            result.fallback_predictions += 1;
        }
        if !actual.label.is_side() {
            result.triples += 1;
        }
        ensemble.tally(record.label == actual.label);

        if let Some(latest) = history.latest_session() {
            for model in ModelKind::ALL {
                if let Some(vote) = log.get(model.as_str(), latest) {
                    result
                        .by_model
                        .entry(model.as_str().to_string())
                        .or_default()
                        .tally(vote == actual.label);
                }
            }
        }
    }

    result.total_predictions = ensemble.predictions;
    result.correct = ensemble.correct;
    result.hit_rate = ensemble.hit_rate;

    info!(
        predictions = result.total_predictions,
        correct = result.correct,
        hit_rate = result.hit_rate,
        "replay finished"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(session: u64, faces: [i32; 3]) -> RawOutcome {
        RawOutcome {
            game_num: format!("#{}", session),
            faces_list: Some(faces.to_vec()),
            score: None,
        }
    }

    #[test]
    fn scores_every_session_after_warmup() {
        let rows: Vec<RawOutcome> = (1..=40)
            .map(|s| if s % 2 == 0 { row(s, [6, 5, 4]) } else { row(s, [1, 2, 3]) })
            .collect();
        let cfg = ReplayConfig {
            warmup: 10,
            capacity: 100,
        };
        let result = run_replay(&rows, &PredictionEngine::default(), &cfg);

        assert_eq!(result.sessions, 40);
        assert_eq!(result.total_predictions, 30);
        assert_eq!(result.fallback_predictions, 0);
        assert!(result.hit_rate >= 0.0 && result.hit_rate <= 100.0);
        assert_eq!(result.by_model.len(), ModelKind::ALL.len());
        assert!(result.by_model.values().all(|m| m.predictions == 30));
    }

    #[test]
    fn short_warmup_uses_fallback_and_counts_triples() {
        let rows = vec![
            row(1, [6, 6, 5]),
            row(2, [2, 2, 2]),
            row(3, [1, 1, 2]),
            row(4, [6, 5, 6]),
        ];
        let cfg = ReplayConfig {
            warmup: 1,
            capacity: 100,
        };
        let result = run_replay(&rows, &PredictionEngine::default(), &cfg);

        assert_eq!(result.total_predictions, 3);
        assert_eq!(result.fallback_predictions, 3);
        assert_eq!(result.triples, 1);
        assert!(result.by_model.is_empty());
    }

    #[test]
    fn empty_dump_yields_empty_result() {
        let result = run_replay(&[], &PredictionEngine::default(), &ReplayConfig::default());
        assert_eq!(result.total_predictions, 0);
        assert_eq!(result.hit_rate, 0.0);
    }
}

//! Prediction entry point
//!
//! `predict(history, log, now)` is pure: the same inputs always give the
//! same record and updated log. State lives with the caller.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::EngineConfig;
use crate::domain::{History, Label, PredictionBasis, PredictionRecord, SessionId};

use super::ensemble::{build_rationale, combine, EnsembleOutcome};
use super::models::{assess_bridge, BridgeAssessment, HeuristicModel, ModelKind, ModelVote};
use super::performance::{ModelLog, ModelScore, PerformanceTracker};
use super::streak::{detect, StreakInfo};
use super::totals::estimate_totals;

/// Confidence reported with the insufficient-data fallback
pub const FALLBACK_CONFIDENCE: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Everything computed for one ensemble prediction
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub streak: StreakInfo,
    pub bridge: BridgeAssessment,
    pub votes: Vec<ModelVote>,
    pub scores: BTreeMap<ModelKind, ModelScore>,
    pub outcome: EnsembleOutcome,
}

/// Stateless prediction engine
#[derive(Debug, Clone)]
pub struct PredictionEngine {
    min_history: usize,
    tracker: PerformanceTracker,
}

impl Default for PredictionEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl PredictionEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            min_history: config.min_history,
            tracker: PerformanceTracker::new(config.performance_lookback, config.log_retention),
        }
    }

    pub fn min_history(&self) -> usize {
        self.min_history
    }

    /// Predict the session after the latest one in `history`.
    ///
    /// Returns the record and the model log with this round's votes added.
    /// Short histories get the fallback record and an unchanged log.
    pub fn predict(
        &self,
        history: &History,
        log: &ModelLog,
        now: DateTime<Utc>,
    ) -> (PredictionRecord, ModelLog) {
        let based_on = history.latest_session();
        let session_id = based_on.map(|s| s.next()).unwrap_or(SessionId(0));

        let Some(evaluation) = self.evaluate(history, log) else {
            return (self.fallback(history, session_id, now), log.clone());
        };

        let label = evaluation.outcome.label;
        let confidence = Decimal::from_f64_retain(evaluation.outcome.confidence)
            .unwrap_or(Decimal::ZERO)
            .round_dp(2)
            .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);

        let record = PredictionRecord {
            session_id,
            based_on,
            label,
            numeric_totals: estimate_totals(history.events(), label),
            confidence,
            rationale: build_rationale(&evaluation.votes),
            basis: PredictionBasis::Ensemble,
            realized_label: None,
            timestamp: now,
        };

        let mut updated = log.clone();
        if let Some(latest) = based_on {
            self.tracker.record(&mut updated, latest, &evaluation.votes);
        }

        debug!(
            session = %record.session_id,
            label = %record.label,
            confidence = %record.confidence,
            high = evaluation.outcome.high_score,
            low = evaluation.outcome.low_score,
            noisy = evaluation.outcome.noisy,
            "ensemble prediction"
        );

        (record, updated)
    }

    /// Run the detector, model bank, tracker and ensemble.
    ///
    /// `None` when the history is shorter than `min_history`.
    pub fn evaluate(&self, history: &History, log: &ModelLog) -> Option<Evaluation> {
        if history.len() < self.min_history {
            return None;
        }

        let events = history.events();
        let streak = detect(events);
        let bridge = assess_bridge(events, &streak);

        let votes: Vec<ModelVote> = ModelKind::ALL
            .iter()
            .map(|model| model.predict(events, &streak))
            .collect();

        let scores: BTreeMap<ModelKind, ModelScore> = ModelKind::ALL
            .iter()
            .map(|model| (*model, self.tracker.score(log, model.name(), events)))
            .collect();
        let multipliers: BTreeMap<ModelKind, f64> =
            scores.iter().map(|(m, s)| (*m, s.multiplier)).collect();

        for vote in &votes {
            debug!(
                model = %vote.model,
                label = %vote.label,
                multiplier = multipliers.get(&vote.model).copied().unwrap_or(1.0),
                rationale = %vote.rationale,
                "model vote"
            );
        }

        let outcome = combine(&votes, &multipliers, &streak, bridge.label);

        Some(Evaluation {
            streak,
            bridge,
            votes,
            scores,
            outcome,
        })
    }

    fn fallback(
        &self,
        history: &History,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> PredictionRecord {
        let label = match history.latest_session() {
            Some(latest) => {
                let mut rng = StdRng::seed_from_u64(latest.value());
                if rng.gen_bool(0.5) {
                    Label::High
                } else {
                    Label::Low
                }
            }
            None => Label::High,
        };

        debug!(
            len = history.len(),
            min = self.min_history,
            label = %label,
            "insufficient history, using fallback"
        );

        PredictionRecord {
            session_id,
            based_on: history.latest_session(),
            label,
            numeric_totals: estimate_totals(history.events(), label),
            confidence: FALLBACK_CONFIDENCE,
            rationale: format!(
                "Insufficient history ({} of {} sessions), fallback prediction",
                history.len(),
                self.min_history
            ),
            basis: PredictionBasis::InsufficientData,
            realized_label: None,
            timestamp: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{history_of, HEAD_SESSION};
    use chrono::TimeZone;
    use Label::{High as H, Low as L, Triple as T};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
    }

    fn mixed(len: usize) -> History {
        let cycle = [H, L, L, H, H, H, L, T, H, L, H, L, L];
        let labels: Vec<Label> = cycle.iter().cycle().take(len).copied().collect();
        history_of(&labels)
    }

    #[test]
    fn short_history_uses_fallback() {
        let engine = PredictionEngine::default();
        let history = mixed(9);
        let log = ModelLog::new();
        let (record, updated) = engine.predict(&history, &log, at());
        assert_eq!(record.basis, PredictionBasis::InsufficientData);
        assert_eq!(record.confidence, FALLBACK_CONFIDENCE);
        assert!(record.label.is_side());
        assert_eq!(updated, log);
        assert_eq!(record.session_id, SessionId(HEAD_SESSION + 1));

        let (again, _) = engine.predict(&history, &log, at());
        assert_eq!(again, record);
    }

    #[test]
    fn empty_history_falls_back_to_high() {
        let engine = PredictionEngine::default();
        let (record, _) = engine.predict(&History::empty(), &ModelLog::new(), at());
        assert_eq!(record.label, H);
        assert_eq!(record.based_on, None);
        assert_eq!(record.numeric_totals, [12, 13, 14]);
    }

    #[test]
    fn ensemble_records_votes_at_latest_session() {
        let engine = PredictionEngine::default();
        let history = mixed(30);
        let (record, log) = engine.predict(&history, &ModelLog::new(), at());
        assert_eq!(record.basis, PredictionBasis::Ensemble);
        assert!(record.confidence >= Decimal::ZERO && record.confidence <= Decimal::ONE_HUNDRED);
        assert!(record.rationale.contains(" | "));
        for model in ModelKind::ALL {
            assert!(log.get(model.name(), SessionId(HEAD_SESSION)).is_some());
        }
    }

    #[test]
    fn prediction_is_deterministic() {
        let engine = PredictionEngine::default();
        let history = mixed(40);
        let mut log = ModelLog::new();
        log.record("trend", SessionId(HEAD_SESSION - 1), H);
        let first = engine.predict(&history, &log, at());
        let second = engine.predict(&history, &log, at());
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn evaluation_exposes_scores_for_every_model() {
        let engine = PredictionEngine::default();
        let evaluation = engine.evaluate(&mixed(20), &ModelLog::new()).unwrap();
        assert_eq!(evaluation.votes.len(), ModelKind::ALL.len());
        assert!(evaluation.scores.values().all(|s| s.multiplier == 1.0));
        assert!(engine.evaluate(&mixed(5), &ModelLog::new()).is_none());
    }
}

//! Per-model rolling accuracy tracker
//!
//! The model log stores, for every model, the label it predicted at each
//! observed session. A vote logged at session `s` is scored against the
//! event that followed `s` in the history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Event, Label, SessionId};

use super::models::ModelVote;

/// Multipliers are clamped to this range
pub const MAX_MULTIPLIER: f64 = 2.0;

/// model name → (session id → predicted label)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelLog {
    entries: BTreeMap<String, BTreeMap<u64, Label>>,
}

impl ModelLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, model: &str, session: SessionId, label: Label) {
        self.entries
            .entry(model.to_string())
            .or_default()
            .insert(session.value(), label);
    }

    pub fn get(&self, model: &str, session: SessionId) -> Option<Label> {
        self.entries
            .get(model)
            .and_then(|by_session| by_session.get(&session.value()))
            .copied()
    }

    /// Keep only the newest `retention` sessions per model
    pub fn prune(&mut self, retention: usize) {
        for by_session in self.entries.values_mut() {
            while by_session.len() > retention {
                by_session.pop_first();
            }
        }
        self.entries.retain(|_, by_session| !by_session.is_empty());
    }

    /// Logged sessions for one model
    pub fn len_for(&self, model: &str) -> usize {
        self.entries.get(model).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Accuracy summary for one model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    /// Transitions with a logged prediction
    pub evaluated: usize,
    pub correct: usize,
    /// Weight multiplier in [0, 2]
    pub multiplier: f64,
}

/// Scores models from the log and records fresh votes
#[derive(Debug, Clone, Copy)]
pub struct PerformanceTracker {
    lookback: usize,
    retention: usize,
}

impl PerformanceTracker {
    pub fn new(lookback: usize, retention: usize) -> Self {
        Self {
            lookback,
            retention: retention.max(lookback + 1),
        }
    }

    /// Score a model over the most recent realized transitions.
    ///
    /// Only the `lookback` newest transitions are inspected, and only those
    /// with a logged prediction count. No logged predictions → 1.0.
    pub fn score(&self, log: &ModelLog, model: &str, events: &[Event]) -> ModelScore {
        let mut evaluated = 0usize;
        let mut correct = 0usize;

        for pair in events.windows(2).take(self.lookback) {
            let (realized, prior) = (&pair[0], &pair[1]);
            let Some(predicted) = log.get(model, prior.session_id) else {
                continue;
            };
            evaluated += 1;
            if predicted == realized.label {
                correct += 1;
            }
        }

        ModelScore {
            evaluated,
            correct,
            multiplier: multiplier(correct, evaluated),
        }
    }

    /// Log every vote at the latest session and prune old entries.
    pub fn record(&self, log: &mut ModelLog, session: SessionId, votes: &[ModelVote]) {
        for vote in votes {
            log.record(vote.model.as_str(), session, vote.label);
        }
        log.prune(self.retention);
    }
}

/// `1 + (correct - n/2) / (n/2)`, clamped to [0, 2]; 1.0 when `n == 0`.
pub fn multiplier(correct: usize, evaluated: usize) -> f64 {
    if evaluated == 0 {
        return 1.0;
    }
    let half = evaluated as f64 / 2.0;
    (1.0 + (correct as f64 - half) / half).clamp(0.0, MAX_MULTIPLIER)
}

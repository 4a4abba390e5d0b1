//! Performance-weighted ensemble combiner
//!
//! Each vote adds `base_weight × multiplier` to the High or Low score. The
//! scores are damped on noisy windows and nudged toward the bridge-break
//! model when a break looks likely.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Label;

use super::models::{ModelKind, ModelVote};
use super::streak::StreakInfo;

/// Damping applied to both scores on a noisy window
pub const NOISY_DAMPING: f64 = 0.5;

/// Boost toward the bridge label when break probability > 0.5
pub const STRONG_BRIDGE_BOOST: f64 = 0.4;

/// Boost toward the bridge label on a run of 3+
pub const RUN_BRIDGE_BOOST: f64 = 0.3;

/// Label returned when both scores are equal
pub const TIE_BREAK_LABEL: Label = Label::High;

/// Base weight of a model for the current run length
pub fn base_weight(model: ModelKind, streak: &StreakInfo) -> f64 {
    let run = streak.streak;
    match model {
        ModelKind::Trend => {
            if run >= 3 {
                0.15
            } else {
                0.20
            }
        }
        ModelKind::ShortPattern => {
            if run >= 2 {
                0.30
            } else {
                0.20
            }
        }
        ModelKind::MeanDeviation => 0.25,
        ModelKind::RecentSwitch => 0.20,
        ModelKind::BridgeBreak => {
            if run >= 3 {
                0.30
            } else {
                0.15
            }
        }
        ModelKind::RuleBased => 0.20,
        ModelKind::Markov => 0.15,
    }
}

/// ≥ 6 switches in the last 15, or a run of 7+
pub fn is_noisy(streak: &StreakInfo) -> bool {
    streak.switches >= 6 || streak.streak >= 7
}

/// Additive boost toward the bridge-break label
pub fn bridge_boost(streak: &StreakInfo) -> f64 {
    if streak.break_probability > 0.5 {
        STRONG_BRIDGE_BOOST
    } else if streak.streak >= 3 {
        RUN_BRIDGE_BOOST
    } else {
        0.0
    }
}

/// One model's share of the final scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub model: ModelKind,
    pub label: Label,
    pub weight: f64,
    pub multiplier: f64,
}

/// Combined decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleOutcome {
    pub label: Label,
    pub high_score: f64,
    pub low_score: f64,
    /// Winning share in percent (0-100)
    pub confidence: f64,
    pub noisy: bool,
    pub boost: f64,
    pub contributions: Vec<Contribution>,
}

/// Combine votes into a final label and confidence.
///
/// Models missing from `multipliers` count with 1.0. Votes for Triple are
/// ignored (models never emit them).
pub fn combine(
    votes: &[ModelVote],
    multipliers: &BTreeMap<ModelKind, f64>,
    streak: &StreakInfo,
    bridge_label: Label,
) -> EnsembleOutcome {
    let mut high_score = 0.0_f64;
    let mut low_score = 0.0_f64;
    let mut contributions = Vec::with_capacity(votes.len());

    for vote in votes {
        let multiplier = multipliers.get(&vote.model).copied().unwrap_or(1.0);
        let weight = base_weight(vote.model, streak) * multiplier;
        match vote.label {
            Label::High => high_score += weight,
            Label::Low => low_score += weight,
            Label::Triple => continue,
        }
        contributions.push(Contribution {
            model: vote.model,
            label: vote.label,
            weight,
            multiplier,
        });
    }

    let noisy = is_noisy(streak);
    if noisy {
        high_score *= NOISY_DAMPING;
        low_score *= NOISY_DAMPING;
    }

    let boost = bridge_boost(streak);
    match bridge_label {
        Label::High => high_score += boost,
        Label::Low => low_score += boost,
        Label::Triple => {}
    }

    let label = if high_score > low_score {
        Label::High
    } else if low_score > high_score {
        Label::Low
    } else {
        TIE_BREAK_LABEL
    };

    let total = high_score + low_score;
    let confidence = if total > 0.0 {
        let winner = high_score.max(low_score);
        (winner / total * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    EnsembleOutcome {
        label,
        high_score,
        low_score,
        confidence,
        noisy,
        boost,
        contributions,
    }
}

/// `"<rule-based rationale> | <bridge rationale>"`
pub fn build_rationale(votes: &[ModelVote]) -> String {
    let find = |kind: ModelKind| {
        votes
            .iter()
            .find(|v| v.model == kind)
            .map(|v| v.rationale.as_str())
            .unwrap_or_default()
    };
    format!("{} | {}", find(ModelKind::RuleBased), find(ModelKind::BridgeBreak))
}

//! Heuristic model bank
//!
//! Each model is a variant of [`ModelKind`]. Models are pure functions of the
//! newest-first event window and the current [`StreakInfo`]; they always
//! return High or Low.

use serde::{Deserialize, Serialize};

use crate::domain::{Event, Label};

use super::patterns::{
    continuation, dominant_gram, follow, gram_to_string, invert, invert_latest, last_side,
    side_counts,
};
use super::streak::{count_switches, StreakInfo};

/// Break threshold used by the shared streak override
const OVERRIDE_BREAK_THRESHOLD: f64 = 0.6;

/// Common capability of every predictor in the bank
pub trait HeuristicModel {
    /// Stable identifier, used as the model-log key
    fn name(&self) -> &'static str;

    /// Predict the next label from a newest-first history
    fn predict(&self, events: &[Event], streak: &StreakInfo) -> ModelVote;
}

/// The models in the bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Trend,
    ShortPattern,
    MeanDeviation,
    RecentSwitch,
    BridgeBreak,
    RuleBased,
    Markov,
}

impl ModelKind {
    pub const ALL: [ModelKind; 7] = [
        ModelKind::Trend,
        ModelKind::ShortPattern,
        ModelKind::MeanDeviation,
        ModelKind::RecentSwitch,
        ModelKind::BridgeBreak,
        ModelKind::RuleBased,
        ModelKind::Markov,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Trend => "trend",
            ModelKind::ShortPattern => "short_pattern",
            ModelKind::MeanDeviation => "mean_deviation",
            ModelKind::RecentSwitch => "recent_switch",
            ModelKind::BridgeBreak => "bridge_break",
            ModelKind::RuleBased => "rule_based",
            ModelKind::Markov => "markov",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One model's prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVote {
    pub model: ModelKind,
    pub label: Label,
    pub rationale: String,
}

impl ModelVote {
    fn new(model: ModelKind, label: Label, rationale: impl Into<String>) -> Self {
        Self {
            model,
            label,
            rationale: rationale.into(),
        }
    }
}

impl HeuristicModel for ModelKind {
    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn predict(&self, events: &[Event], streak: &StreakInfo) -> ModelVote {
        match self {
            ModelKind::Trend => trend(events, streak),
            ModelKind::ShortPattern => short_pattern(events, streak),
            ModelKind::MeanDeviation => mean_deviation(events, streak),
            ModelKind::RecentSwitch => recent_switch(events, streak),
            ModelKind::BridgeBreak => {
                let bridge = assess_bridge(events, streak);
                ModelVote::new(ModelKind::BridgeBreak, bridge.label, bridge.rationale)
            }
            ModelKind::RuleBased => rule_based(events, streak),
            ModelKind::Markov => markov(events),
        }
    }
}

/// Follow or break a run of at least `min_streak`.
fn streak_override(
    model: ModelKind,
    min_streak: usize,
    events: &[Event],
    streak: &StreakInfo,
) -> Option<ModelVote> {
    if streak.streak < min_streak {
        return None;
    }
    let current = streak.current_label?;
    let vote = if streak.break_probability > OVERRIDE_BREAK_THRESHOLD {
        ModelVote::new(
            model,
            invert(current, events),
            format!(
                "streak of {} {} likely to break ({:.2})",
                streak.streak, current, streak.break_probability
            ),
        )
    } else {
        ModelVote::new(
            model,
            follow(current, events),
            format!("following streak of {} {}", streak.streak, current),
        )
    };
    Some(vote)
}

fn trend(events: &[Event], streak: &StreakInfo) -> ModelVote {
    const MODEL: ModelKind = ModelKind::Trend;
    if let Some(vote) = streak_override(MODEL, 3, events, streak) {
        return vote;
    }

    let window = &events[..15.min(events.len())];
    let k = window.len();
    let (mut high_w, mut low_w, mut total_w) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (i, event) in window.iter().enumerate() {
        let w = 1.3_f64.powi((k - 1 - i) as i32);
        total_w += w;
        match event.label {
            Label::High => high_w += w,
            Label::Low => low_w += w,
            Label::Triple => {}
        }
    }

    let recent = &events[..10.min(events.len())];
    if let Some((gram, count)) = dominant_gram(recent, 4) {
        if count >= 3 {
            if let Some(next) = continuation(&gram, events) {
                return ModelVote::new(
                    MODEL,
                    invert(next, events),
                    format!("breaking recurring pattern {} (x{count})", gram_to_string(&gram)),
                );
            }
        }
    }

    if k > 0 && (high_w - low_w).abs() >= 0.25 * total_w {
        let label = if high_w > low_w { Label::High } else { Label::Low };
        return ModelVote::new(
            MODEL,
            label,
            format!("weighted majority {label} ({high_w:.2} vs {low_w:.2})"),
        );
    }

    ModelVote::new(MODEL, invert_latest(events), "no clear trend, inverting latest")
}

fn short_pattern(events: &[Event], streak: &StreakInfo) -> ModelVote {
    const MODEL: ModelKind = ModelKind::ShortPattern;
    if let Some(vote) = streak_override(MODEL, 2, events, streak) {
        return vote;
    }

    let recent = &events[..8.min(events.len())];
    if let Some((gram, count)) = dominant_gram(recent, 2) {
        if count >= 2 {
            if let Some(next) = continuation(&gram, events) {
                return ModelVote::new(
                    MODEL,
                    invert(next, events),
                    format!("breaking pair {} (x{count})", gram_to_string(&gram)),
                );
            }
        }
    }

    ModelVote::new(MODEL, invert_latest(events), "no repeating pair, inverting latest")
}

fn mean_deviation(events: &[Event], streak: &StreakInfo) -> ModelVote {
    const MODEL: ModelKind = ModelKind::MeanDeviation;
    if let Some(vote) = streak_override(MODEL, 2, events, streak) {
        return vote;
    }

    let window = &events[..12.min(events.len())];
    if window.is_empty() {
        return ModelVote::new(MODEL, invert_latest(events), "no history, inverting latest");
    }

    let (highs, lows) = side_counts(window);
    let deviation = (highs as f64 - lows as f64).abs() / window.len() as f64;
    if deviation < 0.2 {
        return ModelVote::new(
            MODEL,
            invert_latest(events),
            format!("balanced window (deviation {deviation:.2}), inverting latest"),
        );
    }

    let minority = if highs < lows { Label::High } else { Label::Low };
    ModelVote::new(
        MODEL,
        minority,
        format!("reverting toward minority {minority} ({highs}H/{lows}L)"),
    )
}

#[allow(clippy::if_same_then_else)]
fn recent_switch(events: &[Event], streak: &StreakInfo) -> ModelVote {
    const MODEL: ModelKind = ModelKind::RecentSwitch;
    if let Some(vote) = streak_override(MODEL, 2, events, streak) {
        return vote;
    }

    let switches = count_switches(&events[..10.min(events.len())]);
    // Both branches invert; the threshold only changes the rationale.
    let label = if switches >= 5 {
        invert_latest(events)
    } else {
        invert_latest(events)
    };
    ModelVote::new(
        MODEL,
        label,
        format!("{switches} switches in last 10, inverting latest"),
    )
}

/// Result of the bridge-break assessment
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeAssessment {
    pub label: Label,
    /// Adjusted break probability
    pub break_probability: f64,
    /// Mean absolute deviation of recent totals
    pub score_deviation: f64,
    pub rationale: String,
}

/// Adjust the detector's break probability with total volatility and
/// pattern stability, then break if it exceeds 0.5.
pub fn assess_bridge(events: &[Event], streak: &StreakInfo) -> BridgeAssessment {
    if events.len() < 5 {
        return BridgeAssessment {
            label: last_side(events),
            break_probability: 0.0,
            score_deviation: 0.0,
            rationale: "[Bridge] Not enough history to judge a break".to_string(),
        };
    }

    let window = &events[..20.min(events.len())];
    let n = window.len() as f64;
    let mean = window.iter().map(|e| e.total as f64).sum::<f64>() / n;
    let deviation = window
        .iter()
        .map(|e| (e.total as f64 - mean).abs())
        .sum::<f64>()
        / n;

    let dominant = dominant_gram(window, 2);
    let stable = dominant.as_ref().filter(|(_, count)| *count >= 3);

    let current = streak.current_label.unwrap_or(Label::High);
    let last5_all_current = events[..5].iter().all(|e| e.label == current);
    let run = streak.streak;
    let p = streak.break_probability;

    let (adjusted, rationale) = if run >= 3 && deviation < 2.0 && stable.is_none() {
        (
            (p - 0.25).max(0.1),
            format!("[Bridge] Stable run of {run} {current}, keep following"),
        )
    } else if run >= 6 {
        (
            (p + 0.3).min(0.95),
            format!("[Bridge] Run of {run} {current} is overextended, break likely"),
        )
    } else if run >= 3 && deviation > 3.5 {
        (
            (p + 0.25).min(0.9),
            format!("[Bridge] Volatile totals (deviation {deviation:.1}), break more likely"),
        )
    } else if let (Some((gram, _)), true) = (stable, last5_all_current) {
        (
            (p + 0.2).min(0.85),
            format!(
                "[Bridge] Repeating pattern {} detected, break possible",
                gram_to_string(gram)
            ),
        )
    } else {
        (
            (p - 0.2).max(0.2),
            "[Bridge] No strong break signal, keep following".to_string(),
        )
    };

    let label = if adjusted > 0.5 {
        invert(current, events)
    } else {
        follow(current, events)
    };

    BridgeAssessment {
        label,
        break_probability: adjusted,
        score_deviation: deviation,
        rationale,
    }
}

fn rule_based(events: &[Event], streak: &StreakInfo) -> ModelVote {
    const MODEL: ModelKind = ModelKind::RuleBased;
    let labels: Vec<Label> = events.iter().take(5).map(|e| e.label).collect();
    let run = streak.streak;
    let current = streak.current_label.unwrap_or(Label::High);

    if (2..=4).contains(&run) {
        return ModelVote::new(
            MODEL,
            follow(current, events),
            format!("[Rules] Short run of {run} {current}, following"),
        );
    }

    use Label::{High as H, Low as L};
    if labels.len() >= 3 {
        match labels[..3] {
            [H, L, H] => {
                return ModelVote::new(MODEL, L, "[Rules] Alternating High,Low,High, expecting Low")
            }
            [L, H, L] => {
                return ModelVote::new(MODEL, H, "[Rules] Alternating Low,High,Low, expecting High")
            }
            _ => {}
        }
    }

    if labels.len() >= 4 {
        match labels[..4] {
            [L, H, H, L] => {
                return ModelVote::new(MODEL, L, "[Rules] Double block Low,High,High,Low, expecting Low")
            }
            [H, L, L, H] => {
                return ModelVote::new(MODEL, H, "[Rules] Double block High,Low,Low,High, expecting High")
            }
            _ => {}
        }
    }

    if run >= 7 {
        return ModelVote::new(
            MODEL,
            invert(current, events),
            format!("[Rules] Run of {run} {current} exhausted, breaking"),
        );
    }

    if events.len() >= 5 {
        let last5 = &events[..5];
        let avg = last5.iter().map(|e| e.total as f64).sum::<f64>() / 5.0;
        if avg > 11.0 {
            return ModelVote::new(
                MODEL,
                Label::High,
                format!("[Rules] Recent totals average {avg:.1}, leaning High"),
            );
        }
        if avg < 7.0 {
            return ModelVote::new(
                MODEL,
                Label::Low,
                format!("[Rules] Recent totals average {avg:.1}, leaning Low"),
            );
        }

        let (highs, lows) = side_counts(last5);
        if highs.abs_diff(lows) > 1 {
            let majority = if highs > lows { Label::High } else { Label::Low };
            return ModelVote::new(
                MODEL,
                majority,
                format!("[Rules] {majority} dominates the last 5 ({highs}H/{lows}L)"),
            );
        }
    }

    let (highs, lows) = side_counts(events);
    if highs != lows {
        let (majority, inverse) = if highs > lows {
            (Label::High, Label::Low)
        } else {
            (Label::Low, Label::High)
        };
        return ModelVote::new(
            MODEL,
            inverse,
            format!("[Rules] Overall more {majority}, expecting {inverse}"),
        );
    }

    ModelVote::new(
        MODEL,
        invert_latest(events),
        "[Rules] Overall balanced, inverting latest",
    )
}

fn markov(events: &[Event]) -> ModelVote {
    const MODEL: ModelKind = ModelKind::Markov;
    if events.len() < 3 {
        return ModelVote::new(MODEL, last_side(events), "too little history, following side");
    }

    let context: Vec<Label> = events[..3].iter().map(|e| e.label).collect();
    let (mut high_next, mut low_next) = (0usize, 0usize);
    for j in 0..events.len().saturating_sub(3) {
        let prior = &events[j + 1..j + 4];
        if prior.iter().map(|e| e.label).eq(context.iter().copied()) {
            match events[j].label {
                Label::High => high_next += 1,
                Label::Low => low_next += 1,
                Label::Triple => {}
            }
        }
    }

    if high_next + low_next >= 3 && high_next != low_next {
        let label = if high_next > low_next { Label::High } else { Label::Low };
        return ModelVote::new(
            MODEL,
            label,
            format!(
                "context {} followed by {high_next}H/{low_next}L",
                gram_to_string(&context.iter().rev().copied().collect::<Vec<_>>())
            ),
        );
    }

    match context[..] {
        [Label::High, Label::High, Label::High] => {
            ModelVote::new(MODEL, Label::Low, "three High in a row, breaking")
        }
        [Label::Low, Label::Low, Label::Low] => {
            ModelVote::new(MODEL, Label::High, "three Low in a row, breaking")
        }
        _ => ModelVote::new(MODEL, last_side(events), "following latest side"),
    }
}

//! Streak and break-probability detection
//!
//! Classifies how "stretched" the current run is from three signals over
//! the recent window: run length, switch count, and High/Low imbalance.

use serde::{Deserialize, Serialize};

use crate::domain::{Event, Label};

/// Events inspected for switches and imbalance
pub const VOLATILITY_WINDOW: usize = 15;

/// Break probability never exceeds this
pub const MAX_BREAK_PROBABILITY: f64 = 0.95;

/// Current run and its estimated likelihood of ending
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreakInfo {
    /// Consecutive most-recent events sharing `current_label`
    pub streak: usize,
    pub current_label: Option<Label>,
    /// Heuristic chance the run ends next session (0.0-0.95)
    pub break_probability: f64,
    /// Label changes between adjacent events in the volatility window
    pub switches: usize,
    /// |High - Low| / 15 over the volatility window
    pub imbalance: f64,
}

impl StreakInfo {
    pub fn empty() -> Self {
        Self {
            streak: 0,
            current_label: None,
            break_probability: 0.0,
            switches: 0,
            imbalance: 0.0,
        }
    }
}

/// Detect the current streak over a newest-first history.
pub fn detect(events: &[Event]) -> StreakInfo {
    let Some(first) = events.first() else {
        return StreakInfo::empty();
    };

    let current = first.label;
    let streak = events.iter().take_while(|e| e.label == current).count();

    let window = &events[..VOLATILITY_WINDOW.min(events.len())];
    let switches = count_switches(window);
    let highs = window.iter().filter(|e| e.label == Label::High).count() as f64;
    let lows = window.iter().filter(|e| e.label == Label::Low).count() as f64;
    let imbalance = (highs - lows).abs() / VOLATILITY_WINDOW as f64;

    StreakInfo {
        streak,
        current_label: Some(current),
        break_probability: break_probability(streak, switches, imbalance),
        switches,
        imbalance,
    }
}

/// Break-probability policy.
pub fn break_probability(streak: usize, switches: usize, imbalance: f64) -> f64 {
    let switches = switches as f64;
    let p = if streak >= 6 {
        (0.8 + switches / 15.0 + imbalance * 0.3).min(0.95)
    } else if streak >= 4 {
        (0.5 + switches / 12.0 + imbalance * 0.25).min(0.90)
    } else if streak >= 2 && switches >= 5.0 {
        0.45
    } else if streak == 1 && switches >= 6.0 {
        0.30
    } else {
        0.0
    };
    p.clamp(0.0, MAX_BREAK_PROBABILITY)
}

/// Number of adjacent label changes in a window
pub fn count_switches(events: &[Event]) -> usize {
    events
        .windows(2)
        .filter(|pair| pair[0].label != pair[1].label)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::history_of;
    use Label::{High as H, Low as L, Triple as T};

    #[test]
    fn empty_history_has_no_streak() {
        let info = detect(&[]);
        assert_eq!(info.streak, 0);
        assert_eq!(info.current_label, None);
        assert_eq!(info.break_probability, 0.0);
    }

    #[test]
    fn counts_leading_run() {
        let history = history_of(&[H, H, H, L, L]);
        let info = detect(history.events());
        assert_eq!(info.streak, 3);
        assert_eq!(info.current_label, Some(H));
        assert_eq!(info.switches, 1);
    }

    #[test]
    fn triple_breaks_runs() {
        let history = history_of(&[T, H, H, H]);
        let info = detect(history.events());
        assert_eq!(info.streak, 1);
        assert_eq!(info.current_label, Some(T));
    }

    #[test]
    fn long_streak_policy_caps_at_095() {
        // streak 8, one switch, 8 High vs 7 Low
        let mut labels = vec![H; 8];
        labels.extend(vec![L; 7]);
        let history = history_of(&labels);
        let info = detect(history.events());
        assert_eq!(info.streak, 8);
        assert_eq!(info.switches, 1);
        let expected = (0.8 + 1.0 / 15.0 + (1.0 / 15.0) * 0.3_f64).min(0.95);
        assert!((info.break_probability - expected).abs() < 1e-12);
    }

    #[test]
    fn medium_streak_policy() {
        let history = history_of(&[L, L, L, L, H, L]);
        let info = detect(history.events());
        assert_eq!(info.streak, 4);
        assert_eq!(info.switches, 2);
        // 5 Low vs 1 High
        let expected = 0.5 + 2.0 / 12.0 + (4.0 / 15.0) * 0.25;
        assert!((info.break_probability - expected).abs() < 1e-12);
    }

    #[test]
    fn choppy_window_fixed_values() {
        assert_eq!(break_probability(2, 5, 0.0), 0.45);
        assert_eq!(break_probability(3, 4, 0.0), 0.0);
        assert_eq!(break_probability(1, 6, 0.0), 0.30);
        assert_eq!(break_probability(1, 5, 0.0), 0.0);
    }

    #[test]
    fn extreme_inputs_stay_clamped() {
        assert!(break_probability(20, 14, 1.0) <= MAX_BREAK_PROBABILITY);
        assert!(break_probability(5, 14, 1.0) <= 0.90);
    }
}

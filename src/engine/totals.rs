//! Most-likely totals for a predicted label

use std::collections::BTreeMap;

use crate::domain::{Event, Label};

/// Below this many matching events the defaults are returned
pub const MIN_LABEL_EVENTS: usize = 5;

/// Recency decay per position: weight = e^(-0.2 · i)
pub const RECENCY_DECAY: f64 = 0.2;

/// Fixed answer when a label has too little history
pub fn default_totals(label: Label) -> [i32; 3] {
    match label {
        Label::High => [12, 13, 14],
        Label::Low => [7, 8, 9],
        Label::Triple => [9, 12, 6],
    }
}

/// Ordered padding candidates per label
fn fallback_order(label: Label) -> &'static [i32] {
    match label {
        Label::High => &[12, 13, 14, 11, 15, 16, 17],
        Label::Low => &[9, 8, 10, 7, 6, 5, 4],
        Label::Triple => &[9, 12, 6, 15, 3, 18],
    }
}

/// Top three totals for `label`, by exponentially decayed frequency.
pub fn estimate_totals(events: &[Event], label: Label) -> [i32; 3] {
    let matching: Vec<&Event> = events.iter().filter(|e| e.label == label).collect();
    if matching.len() < MIN_LABEL_EVENTS {
        return default_totals(label);
    }

    let mut weights: BTreeMap<i32, f64> = BTreeMap::new();
    for (i, event) in matching.iter().enumerate() {
        *weights.entry(event.total).or_insert(0.0) += (-RECENCY_DECAY * i as f64).exp();
    }

    let mut ranked: Vec<(i32, f64)> = weights.into_iter().collect();
    // BTreeMap order makes equal weights fall back to the smaller total
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut picked: Vec<i32> = ranked.iter().take(3).map(|(total, _)| *total).collect();
    for candidate in fallback_order(label) {
        if picked.len() == 3 {
            break;
        }
        if !picked.contains(candidate) {
            picked.push(*candidate);
        }
    }

    let mut out = default_totals(label);
    for (slot, total) in out.iter_mut().zip(picked) {
        *slot = total;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{history_of, history_with_totals};
    use Label::{High as H, Low as L};

    #[test]
    fn few_events_return_fixed_defaults() {
        let history = history_of(&[H, H, L, H, H, L, L, L]);
        for _ in 0..3 {
            assert_eq!(estimate_totals(history.events(), H), [12, 13, 14]);
        }
        assert_eq!(estimate_totals(&[], L), [7, 8, 9]);
    }

    #[test]
    fn ranks_by_decayed_frequency() {
        let history = history_with_totals(&[
            (H, 15),
            (H, 11),
            (H, 15),
            (H, 11),
            (H, 11),
            (H, 17),
            (L, 4),
        ]);
        // 15: 1 + e^-0.4 = 1.670; 11: e^-0.2 + e^-0.6 + e^-0.8 = 1.817; 17: e^-1.0
        assert_eq!(estimate_totals(history.events(), H), [11, 15, 17]);
    }

    #[test]
    fn pads_with_ordered_fallbacks() {
        let history = history_with_totals(&[(L, 9), (L, 9), (L, 4), (L, 9), (L, 4)]);
        assert_eq!(estimate_totals(history.events(), L), [9, 4, 8]);

        let single = history_with_totals(&[(H, 13); 6]);
        assert_eq!(estimate_totals(single.events(), H), [13, 12, 14]);
    }
}

//! History builders for engine unit tests

use crate::domain::{Event, History, Label, SessionId};

/// Newest session id used by the builders
pub const HEAD_SESSION: u64 = 1_000;

/// Faces summing to `total` for the given label
pub fn faces_for(label: Label, total: i32) -> [u8; 3] {
    if label == Label::Triple {
        let f = (total / 3) as u8;
        return [f, f, f];
    }
    let a = (total - 2).min(6);
    let rest = total - a;
    let b = (rest - 1).min(6);
    let c = rest - b;
    [a as u8, b as u8, c as u8]
}

fn default_total(label: Label) -> i32 {
    match label {
        Label::High => 12,
        Label::Low => 8,
        Label::Triple => 9,
    }
}

/// History from newest-first labels with default totals
pub fn history_of(labels: &[Label]) -> History {
    let pairs: Vec<(Label, i32)> = labels.iter().map(|l| (*l, default_total(*l))).collect();
    history_with_totals(&pairs)
}

/// History from newest-first (label, total) pairs
pub fn history_with_totals(pairs: &[(Label, i32)]) -> History {
    let events = pairs
        .iter()
        .enumerate()
        .map(|(i, (label, total))| Event {
            session_id: SessionId(HEAD_SESSION - i as u64),
            label: *label,
            total: *total,
            faces: faces_for(*label, *total),
        })
        .collect();
    History::from_events(events, usize::MAX)
}

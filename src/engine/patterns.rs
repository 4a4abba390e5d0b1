//! N-gram and side helpers shared by the model bank

use std::collections::HashMap;

use crate::domain::{Event, Label};

/// Most frequent n-gram over a newest-first window.
///
/// Grams are returned oldest → newest with their occurrence count. Ties go
/// to the gram whose latest occurrence is most recent.
pub fn dominant_gram(events: &[Event], n: usize) -> Option<(Vec<Label>, usize)> {
    if n == 0 || events.len() < n {
        return None;
    }

    let chronological: Vec<Label> = events.iter().rev().map(|e| e.label).collect();
    let mut counts: HashMap<&[Label], (usize, usize)> = HashMap::new();
    for (end, gram) in chronological.windows(n).enumerate() {
        let entry = counts.entry(gram).or_insert((0, end));
        entry.0 += 1;
        entry.1 = end;
    }

    counts
        .into_iter()
        .max_by_key(|(_, (count, last_end))| (*count, *last_end))
        .map(|(gram, (count, _))| (gram.to_vec(), count))
}

/// Label that continues a recurring gram given the newest events.
///
/// If the newest `n-1` events (oldest → newest) match the gram's prefix, the
/// gram continues with its last label; otherwise it restarts with its first.
pub fn continuation(gram: &[Label], events: &[Event]) -> Option<Label> {
    let n = gram.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some(gram[0]);
    }
    if events.len() >= n - 1 {
        let suffix: Vec<Label> = events[..n - 1].iter().rev().map(|e| e.label).collect();
        if suffix[..] == gram[..n - 1] {
            return Some(gram[n - 1]);
        }
    }
    Some(gram[0])
}

/// Most recent High/Low label, skipping triples. High when there is none.
pub fn last_side(events: &[Event]) -> Label {
    events
        .iter()
        .map(|e| e.label)
        .find(Label::is_side)
        .unwrap_or(Label::High)
}

/// Opposite side. A Triple inverts the most recent side.
pub fn invert(label: Label, events: &[Event]) -> Label {
    match label.opposite() {
        Some(opposite) => opposite,
        None => match last_side(events) {
            Label::Low => Label::High,
            _ => Label::Low,
        },
    }
}

/// Same side. A Triple follows the most recent side.
pub fn follow(label: Label, events: &[Event]) -> Label {
    if label.is_side() {
        label
    } else {
        last_side(events)
    }
}

/// Inverse of the newest label (Low on an empty history)
pub fn invert_latest(events: &[Event]) -> Label {
    let latest = events.first().map(|e| e.label).unwrap_or(Label::High);
    invert(latest, events)
}

/// (High, Low) counts in a window
pub fn side_counts(events: &[Event]) -> (usize, usize) {
    events.iter().fold((0, 0), |(h, l), e| match e.label {
        Label::High => (h + 1, l),
        Label::Low => (h, l + 1),
        Label::Triple => (h, l),
    })
}

/// Short display form for rationales, e.g. "High,Low"
pub fn gram_to_string(gram: &[Label]) -> String {
    gram.iter()
        .map(|l| l.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::history_of;
    use Label::{High as H, Low as L, Triple as T};

    #[test]
    fn dominant_gram_reads_oldest_to_newest() {
        // newest-first H L L H L L -> chronological L L H L L H
        let history = history_of(&[H, L, L, H, L, L]);
        let (gram, count) = dominant_gram(history.events(), 3).unwrap();
        assert_eq!(gram, vec![L, L, H]);
        assert_eq!(count, 2);
    }

    #[test]
    fn dominant_gram_ties_prefer_most_recent() {
        // chronological H L H L -> "H,L" x2, "L,H" x1
        let history = history_of(&[L, H, L, H]);
        let (gram, count) = dominant_gram(history.events(), 2).unwrap();
        assert_eq!(gram, vec![H, L]);
        assert_eq!(count, 2);

        // chronological H L -> one each of nothing else, single gram
        let short = history_of(&[L, H]);
        assert_eq!(dominant_gram(short.events(), 2).unwrap().0, vec![H, L]);
        assert!(dominant_gram(short.events(), 3).is_none());
    }

    #[test]
    fn continuation_follows_matching_prefix() {
        let history = history_of(&[H, L]); // chronological L H
        assert_eq!(continuation(&[L, H, H], history.events()), Some(H));
        assert_eq!(continuation(&[H, H, L], history.events()), Some(H));
        assert_eq!(continuation(&[L, L, H], history.events()), Some(L));
    }

    #[test]
    fn triple_inverts_last_side() {
        let history = history_of(&[T, L, H]);
        assert_eq!(last_side(history.events()), L);
        assert_eq!(invert(T, history.events()), H);
        assert_eq!(follow(T, history.events()), L);
        assert_eq!(invert_latest(history.events()), H);
        assert_eq!(invert_latest(&[]), L);
    }

    #[test]
    fn side_counts_ignore_triples() {
        let history = history_of(&[H, T, L, H]);
        assert_eq!(side_counts(history.events()), (2, 1));
        assert_eq!(gram_to_string(&[H, L]), "High,Low");
    }
}

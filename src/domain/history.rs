use serde::{Deserialize, Serialize};
use tracing::warn;

use super::event::{Event, Label, RawOutcome, SessionId};

/// Newest-first sequence of classified events.
///
/// Invariants: strictly descending session ids, no duplicates, at most
/// `capacity` events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    events: Vec<Event>,
}

/// Counters from building a history out of raw feed rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: usize,
    pub malformed: usize,
    pub duplicates: usize,
}

impl History {
    pub fn empty() -> Self {
        Self { events: Vec::new() }
    }

    /// Classify raw rows, dropping malformed ones.
    pub fn from_raw(rows: &[RawOutcome], capacity: usize) -> (Self, IngestStats) {
        let mut malformed = 0usize;
        let events: Vec<Event> = rows
            .iter()
            .filter_map(|row| {
                let event = Event::classify(row);
                if event.is_none() {
                    malformed += 1;
                    warn!(game_num = %row.game_num, "dropping malformed feed row");
                }
                event
            })
            .collect();

        let (history, duplicates) = Self::build(events, capacity);
        let stats = IngestStats {
            accepted: history.len(),
            malformed,
            duplicates,
        };
        (history, stats)
    }

    /// Order newest-first, de-duplicate by session and truncate.
    pub fn from_events(events: Vec<Event>, capacity: usize) -> Self {
        Self::build(events, capacity).0
    }

    fn build(mut events: Vec<Event>, capacity: usize) -> (Self, usize) {
        events.sort_by(|a, b| b.session_id.cmp(&a.session_id));
        let before = events.len();
        events.dedup_by_key(|e| e.session_id);
        let duplicates = before - events.len();
        events.truncate(capacity);
        (Self { events }, duplicates)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The `n` most recent events (fewer if the history is shorter)
    pub fn recent(&self, n: usize) -> &[Event] {
        &self.events[..n.min(self.events.len())]
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn latest(&self) -> Option<&Event> {
        self.events.first()
    }

    pub fn latest_session(&self) -> Option<SessionId> {
        self.latest().map(|e| e.session_id)
    }

    /// Labels, newest-first
    pub fn labels(&self) -> Vec<Label> {
        self.events.iter().map(|e| e.label).collect()
    }

    /// The event for a session, if present
    pub fn find(&self, session_id: SessionId) -> Option<&Event> {
        self.events.iter().find(|e| e.session_id == session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(n: u64, faces: [i32; 3]) -> RawOutcome {
        RawOutcome {
            game_num: format!("#{n}"),
            faces_list: Some(faces.to_vec()),
            score: Some(faces.iter().sum()),
        }
    }

    #[test]
    fn orders_newest_first_and_dedups() {
        let rows = vec![
            row(10, [1, 2, 3]),
            row(12, [6, 5, 4]),
            row(11, [2, 2, 1]),
            row(12, [6, 5, 4]),
        ];
        let (history, stats) = History::from_raw(&rows, 100);
        let ids: Vec<u64> = history.events().iter().map(|e| e.session_id.0).collect();
        assert_eq!(ids, vec![12, 11, 10]);
        assert_eq!(stats.accepted, 3);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.malformed, 0);
    }

    #[test]
    fn drops_malformed_and_truncates() {
        let mut rows: Vec<RawOutcome> = (1..=5).map(|n| row(n, [3, 4, 5])).collect();
        rows.push(RawOutcome {
            game_num: "#6".into(),
            faces_list: None,
            score: None,
        });
        let (history, stats) = History::from_raw(&rows, 3);
        assert_eq!(stats.malformed, 1);
        assert_eq!(history.len(), 3);
        assert_eq!(history.latest_session(), Some(SessionId(5)));
    }

    #[test]
    fn recent_clamps_to_length() {
        let (history, _) = History::from_raw(&[row(1, [1, 1, 2])], 10);
        assert_eq!(history.recent(15).len(), 1);
        assert!(History::empty().recent(3).is_empty());
    }
}

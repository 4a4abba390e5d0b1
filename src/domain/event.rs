use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Totals at or above this value are High
pub const HIGH_THRESHOLD: i32 = 11;

/// Smallest and largest possible three-dice totals
pub const MIN_TOTAL: i32 = 3;
pub const MAX_TOTAL: i32 = 18;

/// Sequential game session identifier (`#123456` on the feed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(&self) -> Self {
        SessionId(self.0.saturating_add(1))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('#');
        trimmed
            .parse::<u64>()
            .map(SessionId)
            .map_err(|_| format!("invalid session id: {s:?}"))
    }
}

/// Categorical outcome of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    High,
    Low,
    Triple,
}

impl Label {
    /// Label for a total when the faces are not a triple
    pub fn from_total(total: i32) -> Self {
        if total >= HIGH_THRESHOLD {
            Label::High
        } else {
            Label::Low
        }
    }

    /// High or Low (a Triple is neither)
    pub fn is_side(&self) -> bool {
        matches!(self, Label::High | Label::Low)
    }

    /// High ↔ Low. A Triple has no opposite side.
    pub fn opposite(&self) -> Option<Self> {
        match self {
            Label::High => Some(Label::Low),
            Label::Low => Some(Label::High),
            Label::Triple => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::High => "High",
            Label::Low => "Low",
            Label::Triple => "Triple",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Label::High),
            "low" => Ok(Label::Low),
            "triple" => Ok(Label::Triple),
            other => Err(format!("unknown label: {other:?}")),
        }
    }
}

/// One result row as delivered by the upstream feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOutcome {
    /// Session number, e.g. "#2345678"
    pub game_num: String,
    /// The three die faces
    #[serde(default)]
    pub faces_list: Option<Vec<i32>>,
    /// Stated total of the faces
    #[serde(default)]
    pub score: Option<i32>,
}

/// A classified session outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub session_id: SessionId,
    pub label: Label,
    pub total: i32,
    pub faces: [u8; 3],
}

impl Event {
    /// Classify a raw feed row. Returns `None` when the row is malformed:
    /// unparsable session, missing or out-of-range faces, or a stated
    /// total that disagrees with the faces.
    pub fn classify(raw: &RawOutcome) -> Option<Event> {
        let session_id = raw.game_num.parse::<SessionId>().ok()?;
        let faces = raw.faces_list.as_deref()?;
        let (label, total, faces) = classify_faces(faces, raw.score)?;

        Some(Event {
            session_id,
            label,
            total,
            faces,
        })
    }

    /// Build an event from known-good faces
    pub fn from_faces(session_id: u64, faces: [u8; 3]) -> Option<Event> {
        let as_i32 = faces.map(i32::from);
        let (label, total, faces) = classify_faces(&as_i32, None)?;
        Some(Event {
            session_id: SessionId(session_id),
            label,
            total,
            faces,
        })
    }
}

/// Derive label and total from die faces.
pub fn classify_faces(faces: &[i32], stated_total: Option<i32>) -> Option<(Label, i32, [u8; 3])> {
    let [a, b, c] = <[i32; 3]>::try_from(faces).ok()?;
    if [a, b, c].iter().any(|f| !(1..=6).contains(f)) {
        return None;
    }

    let total = a + b + c;
    if let Some(stated) = stated_total {
        if stated != total {
            return None;
        }
    }

    let label = if a == b && b == c {
        Label::Triple
    } else {
        Label::from_total(total)
    };

    Some((label, total, [a as u8, b as u8, c as u8]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(game_num: &str, faces: Option<Vec<i32>>, score: Option<i32>) -> RawOutcome {
        RawOutcome {
            game_num: game_num.to_string(),
            faces_list: faces,
            score,
        }
    }

    #[test]
    fn triple_faces_classify_as_triple() {
        let event = Event::classify(&raw("#100", Some(vec![4, 4, 4]), Some(12))).unwrap();
        assert_eq!(event.label, Label::Triple);
        assert_eq!(event.total, 12);
        assert_eq!(event.session_id, SessionId(100));
    }

    #[test]
    fn high_low_boundary_is_eleven() {
        assert_eq!(classify_faces(&[6, 4, 2], None).unwrap().0, Label::High);
        assert_eq!(classify_faces(&[2, 3, 4], None).unwrap().0, Label::Low);
        assert_eq!(classify_faces(&[5, 4, 2], None).unwrap().0, Label::High);
        assert_eq!(classify_faces(&[5, 3, 2], None).unwrap().0, Label::Low);
    }

    #[test]
    fn malformed_rows_are_rejected() {
        assert!(Event::classify(&raw("#1", None, Some(10))).is_none());
        assert!(Event::classify(&raw("#1", Some(vec![1, 2]), None)).is_none());
        assert!(Event::classify(&raw("#1", Some(vec![1, 2, 7]), None)).is_none());
        assert!(Event::classify(&raw("#1", Some(vec![1, 2, 3]), Some(9))).is_none());
        assert!(Event::classify(&raw("abc", Some(vec![1, 2, 3]), Some(6))).is_none());
    }

    #[test]
    fn session_id_parses_and_displays() {
        let id: SessionId = "#2345678".parse().unwrap();
        assert_eq!(id, SessionId(2_345_678));
        assert_eq!(id.to_string(), "#2345678");
        assert_eq!(id.next(), SessionId(2_345_679));
        assert_eq!("42".parse::<SessionId>().unwrap(), SessionId(42));
    }

    #[test]
    fn raw_outcome_deserializes_feed_shape() {
        let json = r##"{"gameNum":"#77","facesList":[1,5,6],"score":12}"##;
        let row: RawOutcome = serde_json::from_str(json).unwrap();
        let event = Event::classify(&row).unwrap();
        assert_eq!(event.label, Label::High);
        assert_eq!(event.faces, [1, 5, 6]);
    }

    #[test]
    fn label_parsing_is_case_insensitive() {
        assert_eq!("HIGH".parse::<Label>().unwrap(), Label::High);
        assert_eq!(" low ".parse::<Label>().unwrap(), Label::Low);
        assert!("big".parse::<Label>().is_err());
        assert_eq!(Label::High.opposite(), Some(Label::Low));
        assert_eq!(Label::Triple.opposite(), None);
    }
}

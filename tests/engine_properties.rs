//! End-to-end properties of the prediction engine

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use sicbo::domain::{Event, History, Label, PredictionBasis, SessionId};
use sicbo::engine::{detect, estimate_totals, ModelKind, ModelLog, PredictionEngine};

use Label::{High as H, Low as L, Triple as T};

const HEAD: u64 = 2_000_000;

fn faces(label: Label) -> [u8; 3] {
    match label {
        H => [6, 4, 2],
        L => [1, 3, 4],
        T => [3, 3, 3],
    }
}

/// Newest-first labels ending at session `HEAD`
fn history(labels: &[Label]) -> History {
    let events: Vec<Event> = labels
        .iter()
        .enumerate()
        .filter_map(|(i, label)| Event::from_faces(HEAD - i as u64, faces(*label)))
        .collect();
    History::from_events(events, 100)
}

fn alternating(len: usize) -> History {
    let labels: Vec<Label> = (0..len).map(|i| if i % 2 == 0 { H } else { L }).collect();
    history(&labels)
}

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

#[test]
fn short_history_returns_fallback_with_unchanged_log() {
    let engine = PredictionEngine::default();
    let mut log = ModelLog::new();
    log.record("trend", SessionId(HEAD - 1), H);

    let (record, updated) = engine.predict(&alternating(9), &log, at());

    assert_eq!(record.basis, PredictionBasis::InsufficientData);
    assert_eq!(record.confidence, dec!(50.00));
    assert!(record.label == H || record.label == L);
    assert_eq!(record.session_id, SessionId(HEAD + 1));
    assert_eq!(updated, log);
}

#[test]
fn confidence_stays_in_range() {
    let engine = PredictionEngine::default();
    let shapes: Vec<Vec<Label>> = vec![
        vec![H; 30],
        vec![L; 12],
        (0..40).map(|i| if i % 3 == 0 { L } else { H }).collect(),
        (0..25).map(|i| if i % 7 == 0 { T } else if i % 2 == 0 { L } else { H }).collect(),
        [vec![H; 6], vec![L; 6], vec![H; 6]].concat(),
    ];

    for labels in shapes {
        let (record, _) = engine.predict(&history(&labels), &ModelLog::new(), at());
        assert!(record.confidence >= Decimal::ZERO);
        assert!(record.confidence <= Decimal::ONE_HUNDRED);
        assert_eq!(record.confidence, record.confidence.round_dp(2));
        assert!(record.label.is_side());
    }
}

#[test]
fn identical_inputs_give_identical_outputs() {
    let engine = PredictionEngine::default();
    let labels: Vec<Label> = (0..50).map(|i| if i % 5 < 2 { H } else { L }).collect();
    let hist = history(&labels);
    let mut log = ModelLog::new();
    log.record("markov", SessionId(HEAD - 2), L);
    log.record("bridge_break", SessionId(HEAD - 1), H);

    let first = engine.predict(&hist, &log, at());
    let second = engine.predict(&hist, &log, at());
    assert_eq!(first, second);
}

#[test]
fn three_highs_then_lows_is_a_high_streak_of_three() {
    let hist = history(&[H, H, H, L, L]);
    let info = detect(hist.events());
    assert_eq!(info.streak, 3);
    assert_eq!(info.current_label, Some(H));
}

#[test]
fn classification_edges() {
    let triple = Event::from_faces(1, [4, 4, 4]).unwrap();
    assert_eq!(triple.label, T);
    assert_eq!(triple.total, 12);

    assert_eq!(Event::from_faces(2, [6, 5, 1]).unwrap().label, H);
    assert_eq!(Event::from_faces(3, [3, 3, 3]).unwrap().label, T);
    assert_eq!(Event::from_faces(4, [2, 3, 4]).unwrap().label, L);
    assert_eq!(Event::from_faces(5, [5, 4, 2]).unwrap().label, H);
    assert!(Event::from_faces(6, [7, 1, 1]).is_none());
}

#[test]
fn totals_default_when_label_is_rare() {
    let hist = history(&[L, L, H, L, L, H, L, H, H]);
    assert_eq!(estimate_totals(hist.events(), H), [12, 13, 14]);
}

#[test]
fn fully_discredited_models_tie_to_high() {
    let engine = PredictionEngine::default();
    let hist = alternating(30);

    // Every model predicted the wrong side on each of the last 10 transitions
    let mut log = ModelLog::new();
    for pair in hist.events().windows(2).take(10) {
        let (realized, prior) = (&pair[0], &pair[1]);
        let wrong = if realized.label == H { L } else { H };
        for model in ModelKind::ALL {
            log.record(model.as_str(), prior.session_id, wrong);
        }
    }

    let evaluation = engine.evaluate(&hist, &log).unwrap();
    assert!(evaluation.scores.values().all(|s| s.multiplier == 0.0));
    assert_eq!(evaluation.outcome.high_score, 0.0);
    assert_eq!(evaluation.outcome.low_score, 0.0);

    for _ in 0..3 {
        let (record, _) = engine.predict(&hist, &log, at());
        assert_eq!(record.label, H);
        assert_eq!(record.confidence, Decimal::ZERO);
        assert_eq!(record.basis, PredictionBasis::Ensemble);
    }
}

#[test]
fn missing_log_means_neutral_multipliers() {
    let engine = PredictionEngine::default();
    let evaluation = engine.evaluate(&alternating(20), &ModelLog::new()).unwrap();
    assert_eq!(evaluation.scores.len(), ModelKind::ALL.len());
    assert!(evaluation.scores.values().all(|s| s.multiplier == 1.0));
}

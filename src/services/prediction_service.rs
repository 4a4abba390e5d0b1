//! Hosting service around the prediction engine.
//!
//! Owns the history snapshot, the model log and the last prediction. Feed
//! I/O runs outside the state lock; "read history → predict → write cache"
//! runs inside it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::time;
use tracing::{debug, info, warn};

use crate::adapters::HistorySource;
use crate::domain::{Event, History, IngestStats, Label, PredictionRecord, SessionId};
use crate::engine::{ModelLog, PredictionEngine};
use crate::error::{Result, SicboError};
use crate::persistence::PredictionStore;

#[derive(Debug, Default)]
struct ServiceState {
    history: History,
    model_log: ModelLog,
    last: Option<PredictionRecord>,
    last_refresh: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Result of one refresh cycle
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub stats: IngestStats,
    /// Set when this refresh produced a new prediction
    pub prediction: Option<PredictionRecord>,
    /// Session whose realized label was reported this cycle
    pub reported: Option<(SessionId, Label)>,
}

/// Latest observed event together with the prediction built on it
#[derive(Debug, Clone)]
pub struct PredictionSnapshot {
    pub latest: Event,
    pub prediction: PredictionRecord,
    pub history_len: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub started_at: DateTime<Utc>,
    pub history_len: usize,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

pub struct PredictionService {
    source: Arc<dyn HistorySource>,
    store: Arc<dyn PredictionStore>,
    engine: PredictionEngine,
    capacity: usize,
    state: Mutex<ServiceState>,
    started_at: DateTime<Utc>,
}

impl PredictionService {
    pub fn new(
        source: Arc<dyn HistorySource>,
        store: Arc<dyn PredictionStore>,
        engine: PredictionEngine,
        capacity: usize,
    ) -> Self {
        Self {
            source,
            store,
            engine,
            capacity,
            state: Mutex::new(ServiceState::default()),
            started_at: Utc::now(),
        }
    }

    /// Load the persisted model log into memory
    pub async fn restore(&self) -> Result<()> {
        let log = self.store.load_model_log().await?;
        let models = log.models().count();
        self.state.lock().await.model_log = log;
        info!(models, "restored model log");
        Ok(())
    }

    /// Fetch the feed, swap in the new snapshot and predict the next session.
    ///
    /// On fetch failure the previous snapshot stays in place and the error is
    /// returned. A page older than the current snapshot is ignored. A session
    /// is predicted at most once.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let fetched = self.source.fetch_history().await;
        let rows = match fetched {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "feed refresh failed, keeping previous history");
                self.state.lock().await.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let (history, stats) = History::from_raw(&rows, self.capacity);
        if stats.malformed > 0 || stats.duplicates > 0 {
            debug!(
                malformed = stats.malformed,
                duplicates = stats.duplicates,
                "feed rows dropped"
            );
        }
        if history.is_empty() {
            let e = SicboError::InvalidFeedData("feed returned no valid rows".to_string());
            warn!(rows = rows.len(), "feed returned no valid rows, keeping previous history");
            self.state.lock().await.last_error = Some(e.to_string());
            return Err(e);
        }

        let now = Utc::now();
        let (prediction, reported, model_log) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;

            // Never step back to an older page than the one already seen
            let current = state.history.latest_session();
            let incoming = history.latest_session();
            let predicted_from = state.last.as_ref().and_then(|last| last.based_on);
            if incoming < current || incoming < predicted_from {
                warn!(
                    incoming = ?incoming,
                    current = ?current,
                    "feed returned an older page, keeping current history"
                );
                state.last_refresh = Some(now);
                return Ok(RefreshOutcome {
                    stats,
                    prediction: None,
                    reported: None,
                });
            }

            state.history = history;
            state.last_refresh = Some(now);
            state.last_error = None;

            let mut reported = None;
            if let Some(last) = state.last.as_mut() {
                if last.realized_label.is_none() {
                    if let Some(event) = state.history.find(last.session_id) {
                        last.realized_label = Some(event.label);
                        reported = Some((last.session_id, event.label));
                    }
                }
            }

            let latest = state.history.latest_session();
            let already_predicted = state
                .last
                .as_ref()
                .is_some_and(|last| last.based_on == latest);

            if already_predicted {
                (None, reported, None)
            } else {
                let (record, log) = self.engine.predict(&state.history, &state.model_log, now);
                state.model_log = log.clone();
                state.last = Some(record.clone());
                (Some(record), reported, Some(log))
            }
        };

        if let Some((session, label)) = reported {
            match self.store.report_outcome(session, label).await {
                Ok(true) => info!(session = %session, label = %label, "outcome recorded"),
                Ok(false) => debug!(session = %session, "no stored prediction for session"),
                Err(e) => warn!(session = %session, error = %e, "failed to record outcome"),
            }
        }

        if let Some(record) = &prediction {
            info!(
                session = %record.session_id,
                label = %record.label,
                confidence = %record.confidence,
                basis = record.basis.as_str(),
                "new prediction"
            );
            if let Err(e) = self.store.save_prediction(record).await {
                warn!(session = %record.session_id, error = %e, "failed to save prediction");
            }
        }

        if let Some(log) = &model_log {
            if let Err(e) = self.store.save_model_log(log).await {
                warn!(error = %e, "failed to save model log");
            }
        }

        Ok(RefreshOutcome {
            stats,
            prediction,
            reported,
        })
    }

    /// Latest event and prediction; `None` until a refresh has succeeded
    pub async fn latest(&self) -> Option<PredictionSnapshot> {
        let state = self.state.lock().await;
        let latest = *state.history.latest()?;
        let prediction = state.last.clone()?;
        Some(PredictionSnapshot {
            latest,
            prediction,
            history_len: state.history.len(),
        })
    }

    /// Store a realized label for a predicted session
    pub async fn report_outcome(&self, session: SessionId, label: Label) -> Result<()> {
        if !self.store.report_outcome(session, label).await? {
            return Err(SicboError::NotFound(session.to_string()));
        }

        let mut state = self.state.lock().await;
        if let Some(last) = state.last.as_mut().filter(|r| r.session_id == session) {
            last.realized_label = Some(label);
        }
        info!(session = %session, label = %label, "outcome reported");
        Ok(())
    }

    pub async fn recent_predictions(&self, limit: usize) -> Result<Vec<PredictionRecord>> {
        self.store.recent_predictions(limit).await
    }

    pub async fn health(&self) -> ServiceHealth {
        let state = self.state.lock().await;
        ServiceHealth {
            started_at: self.started_at,
            history_len: state.history.len(),
            last_refresh: state.last_refresh,
            last_error: state.last_error.clone(),
        }
    }

    /// Refresh every `interval` until `shutdown` flips to true.
    pub async fn run_refresh_loop(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(interval_secs = interval.as_secs(), "starting refresh loop");
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh().await {
                        debug!(error = %e, "refresh cycle failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("refresh loop stopped");
                        return;
                    }
                }
            }
        }
    }
}

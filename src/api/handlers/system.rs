use axum::{extract::State, Json};
use chrono::Utc;

use crate::api::{state::AppState, types::*};

/// GET /health -- liveness plus feed freshness
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let health = state.service.health().await;

    let status = if health.history_len == 0 {
        "starting"
    } else if health.last_error.is_some() {
        "degraded"
    } else {
        "ok"
    };

    Json(HealthResponse {
        status: status.to_string(),
        uptime_secs: (Utc::now() - health.started_at).num_seconds().max(0),
        history_len: health.history_len,
        last_refresh: health.last_refresh,
        last_error: health.last_error,
    })
}

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::api::{state::AppState, types::*};
use crate::domain::{Label, SessionId};
use crate::error::SicboError;

const DEFAULT_LIST_LIMIT: usize = 20;
const MAX_LIST_LIMIT: usize = 200;

/// GET /predict
pub async fn get_prediction(
    State(state): State<AppState>,
) -> std::result::Result<Json<PredictionResponse>, (StatusCode, String)> {
    let snapshot = state.service.latest().await.ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "no history available yet".to_string(),
        )
    })?;

    Ok(Json(PredictionResponse::from(snapshot)))
}

/// GET /predictions?limit=20
pub async fn get_predictions(
    State(state): State<AppState>,
    Query(query): Query<PredictionsQuery>,
) -> std::result::Result<Json<PredictionsListResponse>, (StatusCode, String)> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let predictions = state
        .service
        .recent_predictions(limit)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let resolved: Vec<bool> = predictions.iter().filter_map(|p| p.is_correct()).collect();
    let hit_rate = if resolved.is_empty() {
        None
    } else {
        let hits = resolved.iter().filter(|hit| **hit).count();
        Some(hits as f64 / resolved.len() as f64 * 100.0)
    };

    Ok(Json(PredictionsListResponse {
        total: predictions.len(),
        predictions,
        hit_rate,
    }))
}

/// POST /report
pub async fn report_outcome(
    State(state): State<AppState>,
    Json(req): Json<ReportRequest>,
) -> std::result::Result<Json<ReportResponse>, (StatusCode, String)> {
    let session: SessionId = req
        .session
        .parse()
        .map_err(|e: String| (StatusCode::BAD_REQUEST, e))?;
    let label: Label = req
        .label
        .parse()
        .map_err(|e: String| (StatusCode::BAD_REQUEST, e))?;

    match state.service.report_outcome(session, label).await {
        Ok(()) => Ok(Json(ReportResponse {
            session,
            label,
            recorded: true,
        })),
        Err(e @ SicboError::NotFound(_)) => Err((StatusCode::NOT_FOUND, e.to_string())),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

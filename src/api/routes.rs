use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Prediction endpoints
        .route("/predict", get(handlers::get_prediction))
        .route("/predictions", get(handlers::get_predictions))
        .route("/report", post(handlers::report_outcome))
        // System endpoints
        .route("/health", get(handlers::health_handler))
        // Add state and CORS
        .with_state(state)
        .layer(cors)
}

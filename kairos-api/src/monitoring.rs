use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
}

/// Liveness plus hold-store reachability. A booking platform that cannot
/// reach its hold store cannot take reservations, so that counts as down.
async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, StatusCode> {
    match state.hold_store.ping().await {
        Ok(()) => Ok(Json(json!({
            "status": "ok",
            "hold_store": "reachable",
        }))),
        Err(err) => {
            tracing::error!("Health check failed: {}", err);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

async fn metrics(State(state): State<AppState>) -> Result<String, AppError> {
    state.metrics.render().map_err(AppError::Anyhow)
}

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::types::AppState;

/// GET /health
pub async fn get_health(State(s): State<Arc<AppState>>) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "api_base_url": s.client.base_url(),
        })),
    )
        .into_response()
}

/// GET /cache_stats
///
/// Returns local response cache statistics for monitoring.
pub async fn get_cache_stats(State(s): State<Arc<AppState>>) -> Response {
    (StatusCode::OK, Json(s.client.cache_stats())).into_response()
}

/// POST /invalidate_cache
pub async fn invalidate_cache(State(s): State<Arc<AppState>>) -> Response {
    info!("POST /invalidate_cache");
    s.client.invalidate_cache();
    (StatusCode::OK, Json(json!({ "message": "Cache invalidated" }))).into_response()
}

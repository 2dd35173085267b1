//! Health and statistics handlers.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use filehub_core::AggregateStats;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /api/health - Check both metadata stores and the blob root.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.files.health_check().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/stats - Per-backend and combined counts.
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<AggregateStats>> {
    Ok(Json(state.files.get_stats().await?))
}

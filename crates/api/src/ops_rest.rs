//! Operational endpoints: health, readiness, liveness.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
    pub tracked_hotels: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        tracked_hotels: state.directory.snapshot().len(),
    })
}

/// GET /ready — readiness probe for Kubernetes.
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /live — liveness probe for Kubernetes.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

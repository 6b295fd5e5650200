//! Health check and service banner handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub total_jobs: usize,
    pub active_jobs: usize,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (total_jobs, active_jobs) = state.registry.counts().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "magi-video-generator".to_string(),
        total_jobs,
        active_jobs,
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Service banner.
#[derive(Serialize)]
pub struct RootResponse {
    pub message: String,
    pub health: String,
    pub version: String,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Magi Video Generator API".to_string(),
        health: "/health".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

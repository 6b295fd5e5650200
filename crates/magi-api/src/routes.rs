//! API routes.

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::generate::{generate_video, solve_problem};
use crate::handlers::health::{health, root};
use crate::handlers::jobs::{cancel_job, list_jobs};
use crate::handlers::videos::{download_video, list_videos, video_status};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let api_routes = Router::new()
        .route("/generate-video", post(generate_video))
        .route("/solve-problem", post(solve_problem))
        .route("/video-status/:job_id", get(video_status))
        .route("/video/:job_id", get(download_video))
        .route("/jobs", get(list_jobs))
        .route("/videos", get(list_videos))
        .route("/job/:job_id", delete(cancel_job));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", api_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

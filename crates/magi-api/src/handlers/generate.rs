//! Job creation handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use tracing::info;

use magi_models::{
    GenerateVideoRequest, Job, JobKind, SolveProblemRequest, StartJobResponse,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Start explainer video generation.
pub async fn generate_video(
    State(state): State<AppState>,
    Json(request): Json<GenerateVideoRequest>,
) -> ApiResult<Json<StartJobResponse>> {
    request.validate().map_err(ApiError::bad_request)?;

    let job = Job::new(JobKind::Explainer, request.topic.clone(), request.duration);
    let response = StartJobResponse::started(&job, "Video generation started");
    let job_id = job.id;
    info!(job_id = %job_id, topic = %request.topic, "Created explainer job");

    let handle = state.registry.register(job).await;
    let cancel = state.registry.cancel_token(&job_id).await;
    let pipeline = Arc::clone(&state.pipeline);
    tokio::spawn(async move {
        pipeline
            .run_explainer_job(&request, job_id, &handle, cancel.as_ref())
            .await;
    });

    Ok(Json(response))
}

/// Start step-by-step solution video generation.
pub async fn solve_problem(
    State(state): State<AppState>,
    Json(request): Json<SolveProblemRequest>,
) -> ApiResult<Json<StartJobResponse>> {
    request.validate().map_err(ApiError::bad_request)?;

    let job = Job::new(JobKind::Solver, request.problem.clone(), request.duration);
    let response = StartJobResponse::started(&job, "Solution video generation started");
    let job_id = job.id;
    info!(job_id = %job_id, problem = %request.problem, "Created solver job");

    let handle = state.registry.register(job).await;
    let cancel = state.registry.cancel_token(&job_id).await;
    let pipeline = Arc::clone(&state.pipeline);
    tokio::spawn(async move {
        pipeline
            .run_solver_job(&request, job_id, &handle, cancel.as_ref())
            .await;
    });

    Ok(Json(response))
}

//! Job listing and cancellation handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use magi_jobs::CancelOutcome;
use magi_models::{JobId, JobListEntry, JobListResponse};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// List all jobs.
pub async fn list_jobs(State(state): State<AppState>) -> Json<JobListResponse> {
    let jobs = state
        .registry
        .list()
        .await
        .iter()
        .map(JobListEntry::from_job)
        .collect();

    Json(JobListResponse { jobs })
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub message: String,
}

/// Cancel a running job.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<CancelResponse>> {
    let id = JobId::parse(&job_id).map_err(|_| ApiError::not_found("Job not found"))?;

    match state.registry.cancel(&id).await {
        CancelOutcome::Cancelled => {
            info!(job_id = %job_id, "Job cancelled by user");
            Ok(Json(CancelResponse {
                message: format!("Job {job_id} cancelled"),
            }))
        }
        CancelOutcome::NotFound => Err(ApiError::not_found("Job not found")),
        CancelOutcome::AlreadyTerminal(status) => Err(ApiError::bad_request(format!(
            "Cannot cancel {} job",
            status.as_str()
        ))),
    }
}

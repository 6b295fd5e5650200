//! Video status, download, and listing handlers.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use tracing::info;

use magi_models::{JobId, JobState, JobStatusResponse, VideoListEntry, VideoListResponse};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn lookup_id(raw: &str) -> ApiResult<JobId> {
    JobId::parse(raw).map_err(|_| ApiError::not_found(format!("Job {raw} not found")))
}

/// Poll generation status for one job.
pub async fn video_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let id = lookup_id(&job_id)?;
    let job = state
        .registry
        .get(&id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Job {job_id} not found")))?;

    Ok(Json(JobStatusResponse::from_job(&job)))
}

/// Download the generated video file.
pub async fn download_video(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let id = lookup_id(&job_id)?;
    let job = state
        .registry
        .get(&id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Job {job_id} not found")))?;

    if job.state != JobState::Completed {
        return Err(ApiError::bad_request(format!(
            "Video not ready. Status: {}",
            job.state.as_str()
        )));
    }

    let video_path = job
        .video_path
        .ok_or_else(|| ApiError::not_found("Video path not found"))?;

    let bytes = tokio::fs::read(&video_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::not_found(format!("Video file not found at {}", video_path.display()))
        } else {
            ApiError::Io(e)
        }
    })?;

    info!(job_id = %job_id, path = %video_path.display(), "Serving video download");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"magi_video_{job_id}.mp4\""),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {e}")))
}

/// List completed videos.
pub async fn list_videos(State(state): State<AppState>) -> Json<VideoListResponse> {
    let videos = state
        .registry
        .list()
        .await
        .iter()
        .filter(|job| job.state == JobState::Completed)
        .map(VideoListEntry::from_job)
        .collect();

    Json(VideoListResponse { videos })
}

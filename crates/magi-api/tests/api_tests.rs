//! API integration tests.
//!
//! The router is exercised end to end with stub pipeline collaborators,
//! so job creation, polling, download, and cancellation run without any
//! external service.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::watch;
use tower::ServiceExt;

use magi_ai::{AiResult, CompletionParams, CompletionService, SpeechService};
use magi_api::{create_router, ApiConfig, AppState};
use magi_jobs::JobRegistry;
use magi_media::{MediaMux, MediaResult};
use magi_models::{Job, JobKind};
use magi_worker::{PipelineContext, PromptLibrary, RenderOutcome, SceneRenderer, WorkerConfig};

struct SequencedLlm {
    script: String,
    code: String,
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionService for SequencedLlm {
    async fn complete(&self, _system: &str, _user: &str, _params: CompletionParams) -> String {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.script.clone()
        } else {
            self.code.clone()
        }
    }
}

struct StubSpeech;

#[async_trait]
impl SpeechService for StubSpeech {
    async fn synthesize(
        &self,
        _text: &str,
        output: &Path,
        _silent_fallback: bool,
    ) -> AiResult<PathBuf> {
        tokio::fs::write(output, b"mp3").await?;
        Ok(output.to_path_buf())
    }
}

struct StubRenderer;

#[async_trait]
impl SceneRenderer for StubRenderer {
    async fn render(&self, source: &Path, _scene_class: &str, working_dir: &Path) -> RenderOutcome {
        let stem = source.file_stem().unwrap().to_string_lossy().to_string();
        let dir = working_dir
            .join("media")
            .join("videos")
            .join(&stem)
            .join("1080p60");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{stem}.mp4")), stem.as_bytes()).unwrap();
        RenderOutcome {
            success: true,
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

struct ByteMux;

#[async_trait]
impl MediaMux for ByteMux {
    async fn combine_audio_chunks(
        &self,
        chunks: &[PathBuf],
        output: &Path,
        _cancel: Option<&watch::Receiver<bool>>,
    ) -> MediaResult<PathBuf> {
        let mut bytes = Vec::new();
        for chunk in chunks {
            bytes.extend(tokio::fs::read(chunk).await?);
        }
        tokio::fs::write(output, bytes).await?;
        Ok(output.to_path_buf())
    }

    async fn mux_scene(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        _cancel: Option<&watch::Receiver<bool>>,
    ) -> MediaResult<()> {
        let mut bytes = tokio::fs::read(video).await?;
        bytes.extend(tokio::fs::read(audio).await?);
        tokio::fs::write(output, bytes).await?;
        Ok(())
    }

    async fn concat_scenes(
        &self,
        clips: &[PathBuf],
        output: &Path,
        _cancel: Option<&watch::Receiver<bool>>,
    ) -> MediaResult<()> {
        let mut bytes = Vec::new();
        for clip in clips {
            bytes.extend(tokio::fs::read(clip).await?);
        }
        tokio::fs::write(output, bytes).await?;
        Ok(())
    }
}

const SCRIPT: &str = "[NEW CONCEPT]\n\
    The derivative measures the instantaneous rate of change of a function.\n\
    [END CONCEPT|| Scene description: Show a curve with a tangent line]\n\
    [NEW CONCEPT]\n\
    We compute derivatives using limits of difference quotients.\n\
    [END CONCEPT|| Scene description: Show the limit definition formula]\n";

const CODE: &str =
    "```python\nfrom manim import *\n\nclass Demo(Scene):\n    def construct(self):\n        self.wait(2.0)\n```";

fn test_state(output_dir: &Path) -> AppState {
    let config = WorkerConfig {
        output_dir: output_dir.to_path_buf(),
        max_retries: 1,
        ..WorkerConfig::default()
    };
    let prompts = Arc::new(PromptLibrary::load(&config).unwrap());
    let pipeline = PipelineContext {
        config,
        llm: Arc::new(SequencedLlm {
            script: SCRIPT.to_string(),
            code: CODE.to_string(),
            calls: AtomicUsize::new(0),
        }),
        tts: Arc::new(StubSpeech),
        renderer: Arc::new(StubRenderer),
        mux: Arc::new(ByteMux),
        prompts,
    };

    AppState {
        config: ApiConfig::default(),
        registry: JobRegistry::new(),
        pipeline: Arc::new(pipeline),
    }
}

/// The Prometheus recorder can only be installed once per process.
fn metrics_handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE.get_or_init(magi_api::metrics::init_metrics).clone()
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

async fn wait_for_status(app: &Router, job_id: &str, wanted: &str) -> serde_json::Value {
    for _ in 0..400 {
        let (status, body) = get_json(app, &format!("/api/video-status/{job_id}")).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] == wanted {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job never reached status {wanted}");
}

#[tokio::test]
async fn test_generate_video_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    let app = create_router(state, None);

    let (status, body) = post_json(
        &app,
        "/api/generate-video",
        serde_json::json!({ "topic": "Derivatives", "duration": 5, "dry_run": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "started");
    assert_eq!(body["message"], "Video generation started");
    assert_eq!(body["estimated_time"], "10-15 minutes");
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let final_status = wait_for_status(&app, &job_id, "completed").await;
    assert_eq!(final_status["progress"], 100);
    assert_eq!(
        final_status["video_url"],
        format!("/api/video/{job_id}").as_str()
    );

    // Download the finished video.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/video/{job_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "video/mp4"
    );
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.contains(&format!("magi_video_{job_id}.mp4")));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(!bytes.is_empty());

    // Both listings see the job.
    let (status, body) = get_json(&app, "/api/jobs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jobs"].as_array().unwrap().len(), 1);
    assert_eq!(body["jobs"][0]["topic"], "Derivatives");

    let (status, body) = get_json(&app, "/api/videos").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["videos"].as_array().unwrap().len(), 1);
    assert_eq!(body["videos"][0]["duration"], 5);
}

#[tokio::test]
async fn test_solve_problem_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    let app = create_router(state, None);

    let (status, body) = post_json(
        &app,
        "/api/solve-problem",
        serde_json::json!({ "problem": "Solve: 2x + 5 = 13", "dry_run": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "started");
    assert_eq!(body["message"], "Solution video generation started");
    assert_eq!(body["estimated_time"], "6-9 minutes");
}

#[tokio::test]
async fn test_validation_rejects_bad_requests() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    let app = create_router(state, None);

    let (status, body) =
        post_json(&app, "/api/generate-video", serde_json::json!({ "topic": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Topic is required");

    let (status, body) = post_json(
        &app,
        "/api/generate-video",
        serde_json::json!({ "topic": "x", "level": 5 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Level must be 1, 2, or 3");

    let (status, body) = post_json(
        &app,
        "/api/generate-video",
        serde_json::json!({ "topic": "x", "duration": 30 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Duration must be between 2-15 minutes");

    let (status, body) =
        post_json(&app, "/api/solve-problem", serde_json::json!({ "problem": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Problem is required");
}

#[tokio::test]
async fn test_unknown_job_ids_return_404() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    let app = create_router(state, None);

    let missing = "550e8400-e29b-41d4-a716-446655440000";
    let (status, body) = get_json(&app, &format!("/api/video-status/{missing}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], format!("Job {missing} not found").as_str());

    // A malformed id cannot name a job either.
    let (status, _) = get_json(&app, "/api/video-status/not-a-job-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get_json(&app, &format!("/api/video/{missing}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_before_completion_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    let app = create_router(state.clone(), None);

    let job = Job::new(JobKind::Explainer, "Pending topic", 5);
    let job_id = job.id;
    state.registry.register(job).await;

    let (status, body) = get_json(&app, &format!("/api/video/{job_id}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Video not ready. Status: started");
}

#[tokio::test]
async fn test_cancel_flow() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    let app = create_router(state.clone(), None);

    let job = Job::new(JobKind::Explainer, "Cancel me", 5);
    let job_id = job.id;
    state.registry.register(job).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/job/{job_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], format!("Job {job_id} cancelled").as_str());

    let status_body = wait_for_status(&app, &job_id.to_string(), "cancelled").await;
    assert_eq!(status_body["current_step"], "Cancelled by user");

    // A second cancel hits the terminal-state guard.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/job/{job_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["detail"], "Cannot cancel cancelled job");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/job/550e8400-e29b-41d4-a716-446655440000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_banner() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    let app = create_router(state.clone(), None);

    let job = Job::new(JobKind::Explainer, "Topic", 5);
    state.registry.register(job).await;

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "magi-video-generator");
    assert_eq!(body["total_jobs"], 1);
    assert_eq!(body["active_jobs"], 1);

    let (status, body) = get_json(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Magi Video Generator API");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    let app = create_router(state, Some(metrics_handle()));

    // Drive one request through the metrics middleware first.
    let (status, _) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("magi_http_requests_total"));
}

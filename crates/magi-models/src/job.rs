//! Job lifecycle models.
//!
//! Jobs live only in process memory. The registry in `magi-jobs` owns the
//! canonical copy; these types define the shape and the legal transitions.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error parsing a job identifier from a path segment.
#[derive(Debug, Error)]
#[error("invalid job id: {0}")]
pub struct JobIdError(String);

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id from its string form.
    pub fn parse(s: &str) -> Result<Self, JobIdError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| JobIdError(s.to_string()))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of pipeline the job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Explain a topic
    Explainer,
    /// Walk through a specific problem
    Solver,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explainer => "explainer",
            Self::Solver => "solver",
        }
    }
}

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted, pipeline not yet running
    Started,
    /// Pipeline running
    Processing,
    /// Final video produced (possibly from a subset of scenes)
    Completed,
    /// No video produced
    Failed,
    /// Cancelled before completion
    Cancelled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A video generation job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique id
    pub id: JobId,
    /// Pipeline kind
    pub kind: JobKind,
    /// Topic or problem statement the job was created for
    pub topic: String,
    /// Requested video length in minutes
    pub duration_minutes: u32,
    /// Current lifecycle state
    pub state: JobState,
    /// Percent complete, 0-100
    pub progress: u8,
    /// Human-readable description of the current phase
    pub current_step: String,
    /// Failure reason, set when `state` is `Failed`
    pub error: Option<String>,
    /// Final video file, set when `state` is `Completed`
    pub video_path: Option<PathBuf>,
    /// Subtitle sidecar file, when one was written
    pub subtitle_path: Option<PathBuf>,
    /// Scenes that rendered successfully
    pub scenes_succeeded: Option<u32>,
    /// Total scenes attempted
    pub scenes_total: Option<u32>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job in the `Started` state.
    pub fn new(kind: JobKind, topic: impl Into<String>, duration_minutes: u32) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            kind,
            topic: topic.into(),
            duration_minutes,
            state: JobState::Started,
            progress: 0,
            current_step: "Job queued".to_string(),
            error: None,
            video_path: None,
            subtitle_path: None,
            scenes_succeeded: None,
            scenes_total: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record pipeline progress. Moves `Started` jobs into `Processing`.
    pub fn with_progress(mut self, progress: u8, step: impl Into<String>) -> Self {
        if self.state == JobState::Started {
            self.state = JobState::Processing;
        }
        self.progress = progress.min(100);
        self.current_step = step.into();
        self.updated_at = Utc::now();
        self
    }

    /// Mark the job completed with its output artifacts.
    pub fn complete(
        mut self,
        video_path: PathBuf,
        subtitle_path: Option<PathBuf>,
        scenes_succeeded: u32,
        scenes_total: u32,
    ) -> Self {
        self.state = JobState::Completed;
        self.progress = 100;
        self.current_step = format!(
            "Video generation complete ({}/{} scenes rendered)",
            scenes_succeeded, scenes_total
        );
        self.video_path = Some(video_path);
        self.subtitle_path = subtitle_path;
        self.scenes_succeeded = Some(scenes_succeeded);
        self.scenes_total = Some(scenes_total);
        self.updated_at = Utc::now();
        self
    }

    /// Mark the job failed with a reason.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        let error = error.into();
        let brief: String = error.chars().take(100).collect();
        self.state = JobState::Failed;
        self.progress = 0;
        self.current_step = format!("Generation failed: {}...", brief);
        self.error = Some(error);
        self.updated_at = Utc::now();
        self
    }

    /// Mark the job cancelled.
    pub fn cancel(mut self) -> Self {
        self.state = JobState::Cancelled;
        self.current_step = "Cancelled by user".to_string();
        self.updated_at = Utc::now();
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Success rate as a display string, e.g. "2/3".
    pub fn success_rate(&self) -> Option<String> {
        match (self.scenes_succeeded, self.scenes_total) {
            (Some(ok), Some(total)) => Some(format!("{}/{}", ok, total)),
            _ => None,
        }
    }

    /// Download URL for the finished video, present once completed.
    pub fn video_url(&self) -> Option<String> {
        if self.state == JobState::Completed {
            Some(format!("/api/video/{}", self.id))
        } else {
            None
        }
    }
}

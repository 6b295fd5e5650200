//! Structured job logging utilities.
//!
//! Keeps pipeline log lines uniform: every event carries the job ID and
//! the stage that emitted it, so a single job can be traced across
//! scripting, audio, rendering, and assembly.

use magi_models::JobId;
use tracing::{error, info, warn, Span};

/// Logger scoped to one job and one pipeline stage.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    stage: String,
}

impl JobLogger {
    /// Create a logger for a job stage (e.g. "script", "scene_render", "assembly").
    pub fn new(job_id: JobId, stage: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            stage: stage.to_string(),
        }
    }

    /// Derive a logger for a sub-stage of the same job.
    pub fn stage(&self, stage: &str) -> Self {
        Self {
            job_id: self.job_id.clone(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            stage = %self.stage,
            "Started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            stage = %self.stage,
            "Progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            stage = %self.stage,
            "Warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            stage = %self.stage,
            "Error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            stage = %self.stage,
            "Completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Create a tracing span carrying the job context.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            stage = %self.stage
        )
    }
}

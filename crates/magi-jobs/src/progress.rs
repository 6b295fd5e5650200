//! Progress events flowing from pipeline tasks to the registry writer.

use std::path::PathBuf;

use tokio::sync::mpsc;

use magi_models::JobId;

/// A state transition requested for one job.
///
/// Updates are applied in arrival order by the registry's writer task,
/// which is the only place job records are mutated while a pipeline
/// runs. Updates for jobs already in a terminal state are discarded.
#[derive(Debug, Clone)]
pub enum JobUpdate {
    /// Progress percentage and human readable step description.
    Progress {
        job_id: JobId,
        progress: u8,
        step: String,
    },
    /// The pipeline produced a final video.
    Completed {
        job_id: JobId,
        video_path: PathBuf,
        subtitle_path: Option<PathBuf>,
        scenes_succeeded: u32,
        scenes_total: u32,
    },
    /// The pipeline gave up.
    Failed { job_id: JobId, error: String },
    /// The pipeline observed a cancellation request and stopped.
    Cancelled { job_id: JobId },
}

impl JobUpdate {
    /// The job this update applies to.
    pub fn job_id(&self) -> JobId {
        match self {
            Self::Progress { job_id, .. }
            | Self::Completed { job_id, .. }
            | Self::Failed { job_id, .. }
            | Self::Cancelled { job_id } => *job_id,
        }
    }
}

/// Cloneable handle a pipeline task uses to report state for one job.
///
/// Sends are fire and forget: if the registry has shut down the update
/// is dropped silently, which only happens during process teardown.
#[derive(Clone)]
pub struct ProgressHandle {
    job_id: JobId,
    tx: mpsc::UnboundedSender<JobUpdate>,
}

impl ProgressHandle {
    pub(crate) fn new(job_id: JobId, tx: mpsc::UnboundedSender<JobUpdate>) -> Self {
        Self { job_id, tx }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Report a progress milestone.
    pub fn progress(&self, progress: u8, step: impl Into<String>) {
        self.tx
            .send(JobUpdate::Progress {
                job_id: self.job_id,
                progress,
                step: step.into(),
            })
            .ok();
    }

    /// Report successful completion with the final artifacts.
    pub fn completed(
        &self,
        video_path: PathBuf,
        subtitle_path: Option<PathBuf>,
        scenes_succeeded: u32,
        scenes_total: u32,
    ) {
        self.tx
            .send(JobUpdate::Completed {
                job_id: self.job_id,
                video_path,
                subtitle_path,
                scenes_succeeded,
                scenes_total,
            })
            .ok();
    }

    /// Report a terminal failure.
    pub fn failed(&self, error: impl Into<String>) {
        self.tx
            .send(JobUpdate::Failed {
                job_id: self.job_id,
                error: error.into(),
            })
            .ok();
    }

    /// Report that the pipeline stopped in response to a cancellation.
    pub fn cancelled(&self) {
        self.tx
            .send(JobUpdate::Cancelled {
                job_id: self.job_id,
            })
            .ok();
    }
}

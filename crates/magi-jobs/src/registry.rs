//! In-memory job registry.
//!
//! Job records live in a shared map guarded by an async `RwLock`.
//! Handlers read through cheap clones; state transitions arrive on an
//! unbounded channel and are applied by a single writer task, so
//! concurrent pipeline tasks can never interleave a read-modify-write.
//! The one exception is user cancellation, which is applied inline
//! under the same write lock so the HTTP response can report the
//! outcome synchronously. Every mutation path checks the terminal
//! guard: a completed, failed, or cancelled job is never overwritten.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, warn};

use magi_models::{Job, JobId, JobState};

use crate::progress::{JobUpdate, ProgressHandle};

type JobMap = Arc<RwLock<HashMap<JobId, Job>>>;
type CancelMap = Arc<RwLock<HashMap<JobId, watch::Sender<bool>>>>;

/// Outcome of a cancellation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job was running and is now cancelled.
    Cancelled,
    /// No job with that id exists.
    NotFound,
    /// The job had already reached a terminal state.
    AlreadyTerminal(JobState),
}

/// Shared registry of all jobs known to this process.
#[derive(Clone)]
pub struct JobRegistry {
    jobs: JobMap,
    cancel: CancelMap,
    updates: mpsc::UnboundedSender<JobUpdate>,
}

impl JobRegistry {
    /// Create a registry and spawn its writer task.
    ///
    /// The writer runs until every `ProgressHandle` and the registry
    /// itself have been dropped.
    pub fn new() -> Self {
        let jobs: JobMap = Arc::new(RwLock::new(HashMap::new()));
        let cancel: CancelMap = Arc::new(RwLock::new(HashMap::new()));
        let (updates, rx) = mpsc::unbounded_channel();

        tokio::spawn(run_writer(Arc::clone(&jobs), Arc::clone(&cancel), rx));

        Self {
            jobs,
            cancel,
            updates,
        }
    }

    /// Insert a new job and return the handle its pipeline reports through.
    ///
    /// The job is visible to status queries before this returns, so a
    /// client can poll immediately after submitting.
    pub async fn register(&self, job: Job) -> ProgressHandle {
        let job_id = job.id;
        let (cancel_tx, _) = watch::channel(false);

        self.jobs.write().await.insert(job_id, job);
        self.cancel.write().await.insert(job_id, cancel_tx);

        ProgressHandle::new(job_id, self.updates.clone())
    }

    /// Fetch a snapshot of one job.
    pub async fn get(&self, id: &JobId) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Snapshot all jobs, newest first.
    pub async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Total and non-terminal job counts.
    pub async fn counts(&self) -> (usize, usize) {
        let jobs = self.jobs.read().await;
        let active = jobs.values().filter(|j| !j.is_terminal()).count();
        (jobs.len(), active)
    }

    /// The cancellation token for a job, if it is still registered.
    ///
    /// The receiver flips to `true` when the user cancels; pipelines
    /// check it between phases.
    pub async fn cancel_token(&self, id: &JobId) -> Option<watch::Receiver<bool>> {
        self.cancel.read().await.get(id).map(|tx| tx.subscribe())
    }

    /// Cancel a running job.
    ///
    /// Applies the transition inline so the caller sees the outcome
    /// immediately, then fires the watch token so the pipeline stops at
    /// its next phase boundary.
    pub async fn cancel(&self, id: &JobId) -> CancelOutcome {
        let mut jobs = self.jobs.write().await;

        let Some(job) = jobs.get(id) else {
            return CancelOutcome::NotFound;
        };
        if job.is_terminal() {
            return CancelOutcome::AlreadyTerminal(job.state);
        }

        if let Some(job) = jobs.remove(id) {
            jobs.insert(*id, job.cancel());
        }
        drop(jobs);

        if let Some(tx) = self.cancel.write().await.remove(id) {
            tx.send(true).ok();
        }

        CancelOutcome::Cancelled
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Single writer applying job updates in arrival order.
async fn run_writer(
    jobs: JobMap,
    cancel: CancelMap,
    mut rx: mpsc::UnboundedReceiver<JobUpdate>,
) {
    while let Some(update) = rx.recv().await {
        let job_id = update.job_id();
        let mut map = jobs.write().await;

        let Some(job) = map.remove(&job_id) else {
            warn!("Dropping update for unknown job {}", job_id);
            continue;
        };
        if job.is_terminal() {
            debug!(
                "Ignoring late update for job {} in state {}",
                job_id, job.state
            );
            map.insert(job_id, job);
            continue;
        }

        let next = match update {
            JobUpdate::Progress { progress, step, .. } => job.with_progress(progress, step),
            JobUpdate::Completed {
                video_path,
                subtitle_path,
                scenes_succeeded,
                scenes_total,
                ..
            } => job.complete(video_path, subtitle_path, scenes_succeeded, scenes_total),
            JobUpdate::Failed { error, .. } => job.fail(error),
            JobUpdate::Cancelled { .. } => job.cancel(),
        };

        let terminal = next.is_terminal();
        map.insert(job_id, next);
        drop(map);

        // Terminal jobs no longer need a cancellation token
        if terminal {
            cancel.write().await.remove(&job_id);
        }
    }
}

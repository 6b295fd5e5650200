//! Pipeline metrics.
//!
//! Counter and histogram names live here so the API layer and dashboards
//! agree on them. The Prometheus recorder itself is installed by the
//! server binary; these helpers are no-ops until that happens.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_STARTED_TOTAL: &str = "magi_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "magi_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "magi_jobs_failed_total";
    pub const JOBS_CANCELLED_TOTAL: &str = "magi_jobs_cancelled_total";

    pub const SCENES_RENDERED_TOTAL: &str = "magi_scenes_rendered_total";
    pub const SCENE_FAILURES_TOTAL: &str = "magi_scene_failures_total";
    pub const REPAIR_ATTEMPTS_TOTAL: &str = "magi_repair_attempts_total";
    pub const TIMING_MISMATCHES_TOTAL: &str = "magi_timing_mismatches_total";

    pub const RENDER_DURATION_SECONDS: &str = "magi_render_duration_seconds";
    pub const ASSEMBLY_DURATION_SECONDS: &str = "magi_assembly_duration_seconds";
}

/// Record a job accepted for processing.
pub fn record_job_started(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::JOBS_STARTED_TOTAL, &labels).increment(1);
}

/// Record a job that produced a final video.
pub fn record_job_completed(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
}

/// Record a job that failed outright.
pub fn record_job_failed(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

/// Record a job cancelled by the user.
pub fn record_job_cancelled(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::JOBS_CANCELLED_TOTAL, &labels).increment(1);
}

/// Record one scene render success.
pub fn record_scene_rendered() {
    counter!(names::SCENES_RENDERED_TOTAL).increment(1);
}

/// Record one scene that exhausted its attempts.
pub fn record_scene_failure() {
    counter!(names::SCENE_FAILURES_TOTAL).increment(1);
}

/// Record one repair round sent to the code generator.
pub fn record_repair_attempt() {
    counter!(names::REPAIR_ATTEMPTS_TOTAL).increment(1);
}

/// Record generated code disagreeing with its timing manifest.
pub fn record_timing_mismatch() {
    counter!(names::TIMING_MISMATCHES_TOTAL).increment(1);
}

/// Record wall time of one renderer invocation.
pub fn record_render_duration(duration_secs: f64) {
    histogram!(names::RENDER_DURATION_SECONDS).record(duration_secs);
}

/// Record wall time of final assembly.
pub fn record_assembly_duration(duration_secs: f64) {
    histogram!(names::ASSEMBLY_DURATION_SECONDS).record(duration_secs);
}

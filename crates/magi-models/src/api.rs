//! API request/response schemas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::{Job, JobState};

fn default_level() -> u8 {
    2
}

fn default_duration() -> u32 {
    5
}

fn default_solver_duration() -> u32 {
    3
}

fn default_subtitle_style() -> String {
    "modern".to_string()
}

fn default_wpm() -> u32 {
    150
}

/// Request to generate an explainer video for a topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateVideoRequest {
    /// Topic to explain
    pub topic: String,
    /// Audience sophistication, 1-3
    #[serde(default = "default_level")]
    pub level: u8,
    /// Target video length in minutes
    #[serde(default = "default_duration")]
    pub duration: u32,
    /// Subtitle style name
    #[serde(default = "default_subtitle_style")]
    pub subtitle_style: String,
    /// Narration speaking rate in words per minute
    #[serde(default = "default_wpm")]
    pub wpm: u32,
    /// Skip paid services, producing silent placeholder audio
    #[serde(default)]
    pub dry_run: bool,
}

impl GenerateVideoRequest {
    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.topic.trim().is_empty() {
            return Err("Topic is required".to_string());
        }
        if !(1..=3).contains(&self.level) {
            return Err("Level must be 1, 2, or 3".to_string());
        }
        if !(2..=15).contains(&self.duration) {
            return Err("Duration must be between 2-15 minutes".to_string());
        }
        if !(60..=300).contains(&self.wpm) {
            return Err("WPM must be between 60-300".to_string());
        }
        Ok(())
    }
}

/// Request to generate a step-by-step solution video for a problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveProblemRequest {
    /// Problem statement to solve
    pub problem: String,
    /// Explanation detail, 1-3
    #[serde(default = "default_level")]
    pub detail_level: u8,
    /// Target video length in minutes
    #[serde(default = "default_solver_duration")]
    pub duration: u32,
    /// Skip paid services, producing silent placeholder audio
    #[serde(default)]
    pub dry_run: bool,
}

impl SolveProblemRequest {
    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.problem.trim().is_empty() {
            return Err("Problem is required".to_string());
        }
        if !(1..=3).contains(&self.detail_level) {
            return Err("Detail level must be 1, 2, or 3".to_string());
        }
        if !(2..=15).contains(&self.duration) {
            return Err("Duration must be between 2-15 minutes".to_string());
        }
        Ok(())
    }
}

/// Response returned when a job is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartJobResponse {
    pub job_id: String,
    pub status: String,
    pub message: String,
    /// Rough wall-clock estimate, e.g. "10-15 minutes"
    pub estimated_time: String,
}

impl StartJobResponse {
    pub fn started(job: &Job, message: impl Into<String>) -> Self {
        Self {
            job_id: job.id.to_string(),
            status: JobState::Started.as_str().to_string(),
            message: message.into(),
            estimated_time: format!(
                "{}-{} minutes",
                job.duration_minutes * 2,
                job.duration_minutes * 3
            ),
        }
    }
}

/// Polling response for a single job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: String,
    pub progress: u8,
    pub current_step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl JobStatusResponse {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            status: job.state.as_str().to_string(),
            progress: job.progress,
            current_step: job.current_step.clone(),
            error: job.error.clone(),
            video_url: job.video_url(),
        }
    }
}

/// One entry in the job listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListEntry {
    pub job_id: String,
    pub status: String,
    pub progress: u8,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub current_step: String,
}

impl JobListEntry {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            status: job.state.as_str().to_string(),
            progress: job.progress,
            topic: job.topic.clone(),
            created_at: job.created_at,
            current_step: job.current_step.clone(),
        }
    }
}

/// Listing of all jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobListEntry>,
}

/// One completed video in the video listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoListEntry {
    pub job_id: String,
    pub topic: String,
    pub duration: u32,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl VideoListEntry {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            topic: job.topic.clone(),
            duration: job.duration_minutes,
            created_at: job.created_at,
            video_url: job.video_url(),
        }
    }
}

/// Listing of completed videos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoListResponse {
    pub videos: Vec<VideoListEntry>,
}

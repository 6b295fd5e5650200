//! Shared data models for the Magi video pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Scripts and their narration/visual segments
//! - Narration chunks and timing manifests
//! - Per-scene render and audio results
//! - Jobs and their lifecycle states
//! - API request/response schemas

pub mod api;
pub mod chunk;
pub mod job;
pub mod render;
pub mod script;

// Re-export common types
pub use api::{
    GenerateVideoRequest, JobListEntry, JobListResponse, JobStatusResponse, SolveProblemRequest,
    StartJobResponse, VideoListEntry, VideoListResponse,
};
pub use chunk::{ChunkTiming, NarrationChunk, TimingManifest};
pub use job::{Job, JobId, JobIdError, JobKind, JobState};
pub use render::{SceneAudioChunkResult, SceneRenderResult};
pub use script::{Script, Segment, SophisticationLevel};

//! Video generation worker.
//!
//! This crate provides:
//! - Script generation and narration chunking
//! - Per-chunk speech synthesis with duration probing
//! - Scene code generation with render/repair retry loops
//! - A bounded parallel scene scheduler
//! - Final assembly (mux, concat) and SRT subtitles
//! - The pipeline orchestrating all of the above per job

pub mod assembler;
pub mod audio;
pub mod chunker;
pub mod codegen;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod paths;
pub mod pipeline;
pub mod prompts;
pub mod renderer;
pub mod scheduler;
pub mod script;
pub mod subtitles;
pub mod timing;

pub use assembler::VideoAssembler;
pub use audio::generate_scene_audio;
pub use chunker::SegmentChunker;
pub use codegen::{SceneGenerator, ScenePlan};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use paths::{slugify, OutputLayout};
pub use pipeline::PipelineContext;
pub use prompts::PromptLibrary;
pub use renderer::{ManimRenderer, RenderOutcome, SceneRenderer};
pub use scheduler::SceneScheduler;
pub use script::ScriptGenerator;
pub use subtitles::{build_srt, write_subtitles};

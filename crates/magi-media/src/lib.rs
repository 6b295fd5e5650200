//! FFmpeg CLI wrapper for scene assembly.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Cancellation and timeout support via tokio
//! - Scene mux/concat operations behind the `MediaMux` trait
//! - Media duration probing via FFprobe

pub mod assemble;
pub mod command;
pub mod error;
pub mod probe;

pub use assemble::{FfmpegMux, MediaMux};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::probe_duration;

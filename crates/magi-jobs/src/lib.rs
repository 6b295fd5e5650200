//! In-process job tracking for the Magi video generator.
//!
//! This crate provides:
//! - A shared registry of job records behind an async `RwLock`
//! - A single writer task applying state transitions in order
//! - Per-job cancellation tokens checked between pipeline phases

pub mod progress;
pub mod registry;

pub use progress::{JobUpdate, ProgressHandle};
pub use registry::{CancelOutcome, JobRegistry};

//! Narration chunks and timing manifests.
//!
//! A segment's narration is split into chunks sized to align with
//! discrete visual beats. The `TimingManifest` is the structured record
//! of those chunk durations, used both to build the timing prompt for
//! code generation and to validate the generated scene afterwards.

use serde::{Deserialize, Serialize};

/// A sub-division of a segment's narration aligned to one visual beat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationChunk {
    /// Chunk narration text
    pub text: String,
    /// Estimated speaking time at the configured words-per-minute rate
    pub estimated_duration_secs: f64,
    /// Whether the chunk text mentions a visual cue from the scene description
    pub mentions_visual_cue: bool,
}

impl NarrationChunk {
    pub fn new(text: impl Into<String>, estimated_duration_secs: f64, mentions_visual_cue: bool) -> Self {
        Self {
            text: text.into(),
            estimated_duration_secs,
            mentions_visual_cue,
        }
    }

    /// Whitespace-delimited word count.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// One manifest entry: the wait duration owed to one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkTiming {
    /// Chunk position within the scene (0-based)
    pub index: usize,
    /// Required wait duration in seconds
    pub duration_secs: f64,
    /// Whether this chunk introduces a visual cue
    pub mentions_visual_cue: bool,
}

/// Structured timing record for one scene.
///
/// The number of entries equals the number of chunks, and each entry's
/// duration equals the chunk's estimated duration. Generated scene code
/// is expected to contain exactly one wait call per entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingManifest {
    /// Scene this manifest belongs to
    pub scene_index: usize,
    /// Per-chunk timings, in chunk order
    pub entries: Vec<ChunkTiming>,
}

impl TimingManifest {
    /// Build a manifest from a scene's chunk list.
    pub fn from_chunks(scene_index: usize, chunks: &[NarrationChunk]) -> Self {
        let entries = chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| ChunkTiming {
                index,
                duration_secs: chunk.estimated_duration_secs,
                mentions_visual_cue: chunk.mentions_visual_cue,
            })
            .collect();
        Self {
            scene_index,
            entries,
        }
    }

    /// Number of wait calls the generated scene must contain.
    pub fn wait_count(&self) -> usize {
        self.entries.len()
    }

    /// Required wait durations, in chunk order.
    pub fn wait_durations(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.duration_secs).collect()
    }

    /// Total scene duration in seconds.
    pub fn total_duration_secs(&self) -> f64 {
        self.entries.iter().map(|e| e.duration_secs).sum()
    }
}

//! Per-scene render and audio result types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Outcome of one scene's generate/render/repair cycle.
///
/// Produced exactly once per segment by the scheduler. The assembler
/// indexes results by `scene_index` to restore playback order regardless
/// of completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneRenderResult {
    /// Stable ordinal of the segment in playback order
    pub scene_index: usize,
    /// Whether a usable video file was produced
    pub success: bool,
    /// Rendered scene video, present iff `success`
    pub video_path: Option<PathBuf>,
    /// Diagnostic text from the last failed attempt
    pub error: Option<String>,
    /// Render attempts consumed (1 = first render succeeded)
    pub attempts: u32,
}

impl SceneRenderResult {
    /// A successful render.
    pub fn succeeded(scene_index: usize, video_path: PathBuf, attempts: u32) -> Self {
        Self {
            scene_index,
            success: true,
            video_path: Some(video_path),
            error: None,
            attempts,
        }
    }

    /// A failed render with the final diagnostic.
    pub fn failed(scene_index: usize, error: impl Into<String>, attempts: u32) -> Self {
        Self {
            scene_index,
            success: false,
            video_path: None,
            error: Some(error.into()),
            attempts,
        }
    }
}

/// One synthesized audio chunk belonging to a scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneAudioChunkResult {
    /// Scene the chunk belongs to
    pub scene_index: usize,
    /// Chunk position within the scene (0-based)
    pub chunk_index: usize,
    /// Synthesized audio file on disk
    pub audio_path: PathBuf,
    /// Measured duration of the audio file in seconds
    pub actual_duration_secs: f64,
    /// Duration the chunker estimated for this text
    pub expected_duration_secs: f64,
    /// Narration text the audio was synthesized from
    pub text: String,
}

impl SceneAudioChunkResult {
    /// Signed difference between measured and estimated duration.
    pub fn drift_secs(&self) -> f64 {
        self.actual_duration_secs - self.expected_duration_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_constructors() {
        let ok = SceneRenderResult::succeeded(2, PathBuf::from("/out/scene_2.mp4"), 1);
        assert!(ok.success);
        assert_eq!(ok.scene_index, 2);
        assert!(ok.video_path.is_some());
        assert!(ok.error.is_none());

        let bad = SceneRenderResult::failed(5, "render timed out", 3);
        assert!(!bad.success);
        assert_eq!(bad.attempts, 3);
        assert!(bad.video_path.is_none());
        assert_eq!(bad.error.as_deref(), Some("render timed out"));
    }

    #[test]
    fn test_audio_drift() {
        let chunk = SceneAudioChunkResult {
            scene_index: 0,
            chunk_index: 1,
            audio_path: PathBuf::from("/audio/scene_0_chunk_1.mp3"),
            actual_duration_secs: 3.4,
            expected_duration_secs: 3.0,
            text: "Hello.".to_string(),
        };
        assert!((chunk.drift_secs() - 0.4).abs() < 1e-9);
    }
}

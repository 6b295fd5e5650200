//! Per-chunk speech synthesis for one scene.

use magi_ai::SpeechService;
use magi_media::probe_duration;
use magi_models::{NarrationChunk, SceneAudioChunkResult};
use tracing::{debug, warn};

use crate::paths::OutputLayout;

/// Drift above which the chunker's estimate is logged as off.
const DRIFT_WARN_SECS: f64 = 1.0;

/// Synthesize one audio file per narration chunk of a scene.
///
/// A chunk whose synthesis fails is skipped with a warning rather than
/// failing the scene; a scene that ends up with no audio at all is
/// assembled video-only downstream. When a produced file cannot be
/// probed the chunker's estimate stands in for the measured duration.
pub async fn generate_scene_audio(
    tts: &dyn SpeechService,
    scene_index: usize,
    chunks: &[NarrationChunk],
    layout: &OutputLayout,
    silent_fallback: bool,
) -> Vec<SceneAudioChunkResult> {
    let mut results = Vec::with_capacity(chunks.len());

    for (chunk_index, chunk) in chunks.iter().enumerate() {
        let output = layout.chunk_audio(scene_index, chunk_index);

        let audio_path = match tts.synthesize(&chunk.text, &output, silent_fallback).await {
            Ok(path) => path,
            Err(e) => {
                warn!(
                    scene_index,
                    chunk_index,
                    "Speech synthesis failed, skipping chunk: {e}"
                );
                continue;
            }
        };

        let actual = match probe_duration(&audio_path).await {
            Ok(duration) => duration,
            Err(e) => {
                debug!(
                    scene_index,
                    chunk_index,
                    "Could not probe audio duration, using estimate: {e}"
                );
                chunk.estimated_duration_secs
            }
        };

        let result = SceneAudioChunkResult {
            scene_index,
            chunk_index,
            audio_path,
            actual_duration_secs: actual,
            expected_duration_secs: chunk.estimated_duration_secs,
            text: chunk.text.clone(),
        };
        if result.drift_secs().abs() > DRIFT_WARN_SECS {
            warn!(
                scene_index,
                chunk_index,
                drift_secs = result.drift_secs(),
                "Audio duration drifts from chunker estimate"
            );
        }
        results.push(result);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use magi_ai::{AiError, AiResult};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSpeech {
        fail_on: Option<usize>,
        calls: AtomicUsize,
    }

    impl StubSpeech {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                fail_on,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SpeechService for StubSpeech {
        async fn synthesize(
            &self,
            _text: &str,
            output: &Path,
            _silent_fallback: bool,
        ) -> AiResult<PathBuf> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(call) == self.fail_on {
                return Err(AiError::request_failed("elevenlabs", "scripted failure"));
            }
            tokio::fs::write(output, b"mp3").await?;
            Ok(output.to_path_buf())
        }
    }

    fn chunks() -> Vec<NarrationChunk> {
        vec![
            NarrationChunk::new("First chunk of narration.", 2.0, false),
            NarrationChunk::new("Second chunk shows a triangle.", 3.0, true),
            NarrationChunk::new("Third chunk wraps up.", 2.5, false),
        ]
    }

    async fn layout() -> (tempfile::TempDir, OutputLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), "audio test");
        layout.ensure_dirs().await.unwrap();
        (dir, layout)
    }

    #[tokio::test]
    async fn test_one_result_per_chunk() {
        let tts = StubSpeech::new(None);
        let (_dir, layout) = layout().await;

        let results = generate_scene_audio(&tts, 0, &chunks(), &layout, true).await;

        assert_eq!(results.len(), 3);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.scene_index, 0);
            assert_eq!(result.chunk_index, i);
            assert!(result.audio_path.exists());
        }
    }

    #[tokio::test]
    async fn test_failed_chunk_is_skipped() {
        let tts = StubSpeech::new(Some(1));
        let (_dir, layout) = layout().await;

        let results = generate_scene_audio(&tts, 2, &chunks(), &layout, true).await;

        let indices: Vec<usize> = results.iter().map(|r| r.chunk_index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_unprobeable_file_falls_back_to_estimate() {
        // The stub writes three bytes that no probe can make sense of,
        // so the measured duration must equal the chunker's estimate.
        let tts = StubSpeech::new(None);
        let (_dir, layout) = layout().await;

        let results = generate_scene_audio(&tts, 0, &chunks(), &layout, true).await;

        for (result, chunk) in results.iter().zip(chunks()) {
            assert_eq!(result.actual_duration_secs, chunk.estimated_duration_secs);
            assert_eq!(result.drift_secs(), 0.0);
        }
    }

    #[tokio::test]
    async fn test_no_chunks_no_results() {
        let tts = StubSpeech::new(None);
        let (_dir, layout) = layout().await;

        let results = generate_scene_audio(&tts, 0, &[], &layout, true).await;
        assert!(results.is_empty());
    }
}

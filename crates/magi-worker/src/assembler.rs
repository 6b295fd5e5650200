//! Final video assembly.
//!
//! Pairs each successful scene's video with its combined narration
//! track, then concatenates the per-scene clips into one file. Clips
//! are emitted by walking the result map's keys upward, so playback
//! order is ascending scene index regardless of render completion
//! order. Scenes without audio pass through video-only; they are never
//! dropped from the sequence.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use magi_media::MediaMux;
use magi_models::{JobId, SceneAudioChunkResult, SceneRenderResult};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::paths::OutputLayout;

pub struct VideoAssembler {
    mux: Arc<dyn MediaMux>,
}

impl VideoAssembler {
    pub fn new(mux: Arc<dyn MediaMux>) -> Self {
        Self { mux }
    }

    /// Assemble the final video from successfully rendered scenes.
    ///
    /// Multiplexer failures propagate; a scene that reached this stage
    /// must not be silently dropped mid-assembly. A fired `cancel`
    /// signal kills the in-flight multiplexer run. On success all
    /// per-scene and per-chunk intermediates are removed, leaving the
    /// final video (and the renderer's own output tree) in place.
    pub async fn assemble(
        &self,
        results: &BTreeMap<usize, SceneRenderResult>,
        audio: &[SceneAudioChunkResult],
        layout: &OutputLayout,
        job_id: JobId,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> WorkerResult<PathBuf> {
        let started = Instant::now();

        let successes: Vec<&SceneRenderResult> = results.values().filter(|r| r.success).collect();
        if successes.is_empty() {
            return Err(WorkerError::assembly_failed(
                "no rendered scenes to assemble",
            ));
        }

        let chunks_by_scene = group_chunks(audio);

        let mut clips = Vec::with_capacity(successes.len());
        let mut synced = Vec::new();
        let mut combined = Vec::new();
        for result in &successes {
            let scene_index = result.scene_index;
            let Some(video) = result.video_path.as_ref() else {
                return Err(WorkerError::assembly_failed(format!(
                    "scene {scene_index} reported success without a video path"
                )));
            };

            match chunks_by_scene.get(&scene_index) {
                None => {
                    warn!("No audio for scene {scene_index}, using video only");
                    clips.push(video.clone());
                }
                Some(chunk_paths) => {
                    let combined_path = layout.combined_audio(scene_index);
                    self.mux
                        .combine_audio_chunks(chunk_paths, &combined_path, cancel)
                        .await?;
                    combined.push(combined_path.clone());

                    let synced_path = layout.synced_scene(scene_index);
                    self.mux
                        .mux_scene(video, &combined_path, &synced_path, cancel)
                        .await?;
                    debug!(scene_index, "Scene paired with audio");
                    synced.push(synced_path.clone());
                    clips.push(synced_path);
                }
            }
        }

        let final_path = layout.final_video(job_id);
        self.mux.concat_scenes(&clips, &final_path, cancel).await?;
        info!(
            scenes = clips.len(),
            path = %final_path.display(),
            "Final video assembled"
        );

        remove_intermediates(
            synced
                .iter()
                .chain(combined.iter())
                .chain(audio.iter().map(|c| &c.audio_path)),
        )
        .await;
        metrics::record_assembly_duration(started.elapsed().as_secs_f64());

        Ok(final_path)
    }
}

/// Chunk audio paths per scene, ordered by chunk index.
fn group_chunks(audio: &[SceneAudioChunkResult]) -> BTreeMap<usize, Vec<PathBuf>> {
    let mut by_scene: BTreeMap<usize, Vec<(usize, PathBuf)>> = BTreeMap::new();
    for chunk in audio {
        by_scene
            .entry(chunk.scene_index)
            .or_default()
            .push((chunk.chunk_index, chunk.audio_path.clone()));
    }
    by_scene
        .into_iter()
        .map(|(scene, mut chunks)| {
            chunks.sort_by_key(|(index, _)| *index);
            (scene, chunks.into_iter().map(|(_, path)| path).collect())
        })
        .collect()
}

async fn remove_intermediates<'a, I>(paths: I)
where
    I: Iterator<Item = &'a PathBuf>,
{
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!(path = %path.display(), "Could not remove intermediate: {e}"),
        }
    }
}

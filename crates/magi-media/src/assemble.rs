//! Audio/video assembly primitives.
//!
//! Thin seam over the external multiplexer: combining per-chunk audio
//! into a scene track, pairing scene video with audio, and concatenating
//! synchronized scene clips into the final artifact. The `MediaMux`
//! trait exists so the pipeline can be driven against a test double.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Upper bound on one assembly run. These are stream copies of local
/// files and finish in seconds.
const MUX_TIMEOUT_SECS: u64 = 120;

/// External multiplexer operations used by the assembly pipeline.
///
/// A fired `cancel` signal kills the in-flight process; the run then
/// surfaces `MediaError::Cancelled`.
#[async_trait]
pub trait MediaMux: Send + Sync {
    /// Combine a scene's per-chunk audio files, in chunk order, into one
    /// track at `output`. A single chunk is copied directly without
    /// invoking the multiplexer.
    async fn combine_audio_chunks(
        &self,
        chunks: &[PathBuf],
        output: &Path,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> MediaResult<PathBuf>;

    /// Pair one scene's video with its audio track, trimming to the
    /// shorter stream.
    async fn mux_scene(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> MediaResult<()>;

    /// Concatenate scene clips, in the given order, into one file.
    async fn concat_scenes(
        &self,
        clips: &[PathBuf],
        output: &Path,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> MediaResult<()>;
}

/// `MediaMux` implementation backed by the FFmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegMux {
    timeout_secs: u64,
}

impl Default for FfmpegMux {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegMux {
    pub fn new() -> Self {
        Self {
            timeout_secs: MUX_TIMEOUT_SECS,
        }
    }

    fn runner(&self, cancel: Option<&watch::Receiver<bool>>) -> FfmpegRunner {
        let runner = FfmpegRunner::new().with_timeout(self.timeout_secs);
        match cancel {
            Some(rx) => runner.with_cancel(rx.clone()),
            None => runner,
        }
    }

    /// Write a concat-demuxer manifest listing `files` in order.
    /// The manifest is deleted when the returned guard is dropped.
    fn write_manifest(files: &[PathBuf], dir: &Path) -> MediaResult<tempfile::NamedTempFile> {
        let mut manifest = tempfile::Builder::new()
            .prefix("concat_")
            .suffix(".txt")
            .tempfile_in(dir)?;

        for file in files {
            if !file.exists() {
                return Err(MediaError::FileNotFound(file.clone()));
            }
            writeln!(manifest, "file '{}'", file.display())?;
        }
        manifest.flush()?;

        Ok(manifest)
    }
}

#[async_trait]
impl MediaMux for FfmpegMux {
    async fn combine_audio_chunks(
        &self,
        chunks: &[PathBuf],
        output: &Path,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> MediaResult<PathBuf> {
        match chunks {
            [] => Err(MediaError::internal("No audio chunks to combine")),
            [single] => {
                // Single chunk: a byte copy, no multiplexer involved.
                debug!("Single audio chunk, copying {} directly", single.display());
                tokio::fs::copy(single, output).await?;
                Ok(output.to_path_buf())
            }
            many => {
                let dir = output.parent().unwrap_or_else(|| Path::new("."));
                let manifest = Self::write_manifest(many, dir)?;

                let cmd = FfmpegCommand::concat_manifest(manifest.path(), output);
                self.runner(cancel).run(&cmd).await?;

                debug!(
                    "Combined {} audio chunks into {}",
                    many.len(),
                    output.display()
                );
                Ok(output.to_path_buf())
            }
        }
    }

    async fn mux_scene(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> MediaResult<()> {
        if !video.exists() {
            return Err(MediaError::FileNotFound(video.to_path_buf()));
        }
        if !audio.exists() {
            return Err(MediaError::FileNotFound(audio.to_path_buf()));
        }

        let cmd = FfmpegCommand::mux_shortest(video, audio, output);
        self.runner(cancel).run(&cmd).await?;

        debug!(
            "Muxed {} + {} -> {}",
            video.display(),
            audio.display(),
            output.display()
        );
        Ok(())
    }

    async fn concat_scenes(
        &self,
        clips: &[PathBuf],
        output: &Path,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> MediaResult<()> {
        if clips.is_empty() {
            return Err(MediaError::internal("No scene clips to concatenate"));
        }

        let dir = output.parent().unwrap_or_else(|| Path::new("."));
        let manifest = Self::write_manifest(clips, dir)?;

        let cmd = FfmpegCommand::concat_manifest(manifest.path(), output);
        self.runner(cancel).run(&cmd).await?;

        info!(
            "Concatenated {} scene clips into {}",
            clips.len(),
            output.display()
        );
        Ok(())
    }
}

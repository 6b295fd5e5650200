//! Output directory layout for generated artifacts.
//!
//! Every job writes under a topic slug so reruns of the same topic reuse
//! one directory tree:
//!
//! ```text
//! output/
//!   code/<slug>/scene_<i>.py
//!   audio/<slug>/scene_<i>_chunk_<j>.mp3
//!   script/<slug>_script.txt
//!   videos/<slug>/...            (renderer media tree + final video)
//! ```

use std::io;
use std::path::{Path, PathBuf};

use magi_models::JobId;

/// Turn free text into a filesystem-safe directory name.
///
/// Lowercases, collapses every run of non-alphanumeric characters into a
/// single dash, and trims leading/trailing dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !slug.is_empty() && !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("untitled");
    }
    slug
}

/// Resolves paths for one job's artifacts under the output root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    slug: String,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, topic: &str) -> Self {
        Self {
            root: root.into(),
            slug: slugify(topic),
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn code_dir(&self) -> PathBuf {
        self.root.join("code").join(&self.slug)
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio").join(&self.slug)
    }

    pub fn video_dir(&self) -> PathBuf {
        self.root.join("videos").join(&self.slug)
    }

    pub fn script_file(&self) -> PathBuf {
        self.root
            .join("script")
            .join(format!("{}_script.txt", self.slug))
    }

    /// Source file the code generator writes for one scene.
    pub fn scene_source(&self, scene_index: usize) -> PathBuf {
        self.code_dir().join(format!("scene_{scene_index}.py"))
    }

    /// Where the renderer leaves the scene video.
    ///
    /// The renderer nests output under `media/videos/<source stem>/1080p60/`
    /// relative to its working directory.
    pub fn rendered_scene(&self, scene_index: usize) -> PathBuf {
        self.video_dir()
            .join("media")
            .join("videos")
            .join(format!("scene_{scene_index}"))
            .join("1080p60")
            .join(format!("scene_{scene_index}.mp4"))
    }

    /// Narration audio for one chunk of one scene.
    pub fn chunk_audio(&self, scene_index: usize, chunk_index: usize) -> PathBuf {
        self.audio_dir()
            .join(format!("scene_{scene_index}_chunk_{chunk_index}.mp3"))
    }

    /// Concatenated narration for one scene, fed to the muxer.
    pub fn combined_audio(&self, scene_index: usize) -> PathBuf {
        self.video_dir()
            .join(format!("scene_{scene_index}_combined.mp3"))
    }

    /// Scene video with narration muxed in, input to final concatenation.
    pub fn synced_scene(&self, scene_index: usize) -> PathBuf {
        self.video_dir()
            .join(format!("synced_scene_{scene_index}.mp4"))
    }

    pub fn final_video(&self, job_id: JobId) -> PathBuf {
        self.video_dir().join(format!("magi_video_{job_id}.mp4"))
    }

    pub fn subtitles(&self, job_id: JobId) -> PathBuf {
        self.video_dir().join(format!("magi_video_{job_id}.srt"))
    }

    /// Create every directory the pipeline writes into.
    pub async fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [
            self.code_dir(),
            self.audio_dir(),
            self.video_dir(),
            self.root.join("script"),
        ] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

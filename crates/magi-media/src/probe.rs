//! FFprobe wrapper for media duration queries.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Measure a media file's duration in seconds.
pub async fn probe_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    debug!("Probing duration of {}", path.display());

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffprobe_failed(
            format!("FFprobe exited with status {:?}", output.status.code()),
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| {
            MediaError::ffprobe_failed(
                format!("No duration reported for {}", path.display()),
                None,
            )
        })
}

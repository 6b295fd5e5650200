//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// One input stream together with the arguments placed before its `-i`.
#[derive(Debug, Clone)]
struct FfmpegInput {
    args: Vec<String>,
    source: String,
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input streams, in `-i` order
    inputs: Vec<FfmpegInput>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after all inputs)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Mux one video and one audio stream, trimming to the shorter of the two.
    /// Video is stream-copied; audio is re-encoded to AAC.
    pub fn mux_shortest(
        video: impl AsRef<Path>,
        audio: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Self {
        Self::new(output).input(video).input(audio).output_args([
            "-c:v", "copy", "-c:a", "aac", "-map", "0:v:0", "-map", "1:a:0", "-shortest",
        ])
    }

    /// Lossless stream-copy concatenation driven by a concat-demuxer manifest.
    pub fn concat_manifest(list_path: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self::new(output)
            .input_with_args(
                ["-f", "concat", "-safe", "0"],
                list_path.as_ref().to_string_lossy(),
            )
            .output_args(["-c", "copy"])
    }

    /// Generate a silent stereo MP3 of the given length.
    pub fn silence(duration_secs: f64, output: impl AsRef<Path>) -> Self {
        Self::new(output)
            .input_with_args(["-f", "lavfi"], "anullsrc=r=44100:cl=stereo")
            .output_args(["-t", &format!("{:.3}", duration_secs)])
            .output_args(["-c:a", "libmp3lame", "-b:a", "128k"])
    }

    /// Add a plain file input.
    pub fn input(mut self, path: impl AsRef<Path>) -> Self {
        self.inputs.push(FfmpegInput {
            args: Vec::new(),
            source: path.as_ref().to_string_lossy().to_string(),
        });
        self
    }

    /// Add an input with arguments placed before its `-i`.
    pub fn input_with_args<I, S>(mut self, args: I, source: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(FfmpegInput {
            args: args.into_iter().map(Into::into).collect(),
            source: source.into(),
        });
        self
    }

    /// Add an output argument (after all inputs).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        // Overwrite flag
        if self.overwrite {
            args.push("-y".to_string());
        }

        // Log level
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Inputs with their pre-`-i` arguments
        for input in &self.inputs {
            args.extend(input.args.clone());
            args.push("-i".to_string());
            args.push(input.source.clone());
        }

        // Output args
        args.extend(self.output_args.clone());

        // Output file
        args.push(self.output.to_string_lossy().to_string());

        args
    }

    /// The output path this command writes to.
    pub fn output_path(&self) -> &Path {
        &self.output
    }
}

enum WaitOutcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    Cancelled,
}

/// Runner for FFmpeg commands with cancellation and timeout.
pub struct FfmpegRunner {
    /// Cancellation signal receiver
    cancel_rx: Option<watch::Receiver<bool>>,
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self {
            cancel_rx: None,
            timeout_secs: None,
        }
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command, capturing stderr for diagnostics.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let stderr = child.stderr.take();
        let stderr_handle = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf).await;
            }
            buf
        });

        let outcome = self.wait_for_completion(&mut child).await;
        let stderr_text = stderr_handle.await.unwrap_or_default();

        match outcome? {
            status if status.success() => Ok(()),
            status => Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(stderr_text),
                status.code(),
            )),
        }
    }

    /// Wait for the child process, honoring cancellation and timeout.
    async fn wait_for_completion(
        &self,
        child: &mut Child,
    ) -> MediaResult<std::process::ExitStatus> {
        let mut cancel_rx = self.cancel_rx.clone();

        let wait = async {
            match cancel_rx.as_mut() {
                Some(rx) => {
                    if *rx.borrow() {
                        return WaitOutcome::Cancelled;
                    }
                    tokio::select! {
                        status = child.wait() => WaitOutcome::Exited(status),
                        _ = cancel_fired(rx) => WaitOutcome::Cancelled,
                    }
                }
                None => WaitOutcome::Exited(child.wait().await),
            }
        };

        let outcome = match self.timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), wait).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        "FFmpeg timed out after {} seconds, killing process",
                        secs
                    );
                    let _ = child.kill().await;
                    return Err(MediaError::Timeout(secs));
                }
            },
            None => wait.await,
        };

        match outcome {
            WaitOutcome::Exited(status) => Ok(status?),
            WaitOutcome::Cancelled => {
                info!("FFmpeg cancelled, killing process");
                let _ = child.kill().await;
                Err(MediaError::Cancelled)
            }
        }
    }
}

/// Resolves when the cancel signal fires. Pends forever if the sender
/// goes away without cancelling, so a dropped handle never kills work.
async fn cancel_fired(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mux_shortest_args() {
        let cmd = FfmpegCommand::mux_shortest("scene_0.mp4", "scene_0.mp3", "synced_0.mp4");
        let args = cmd.build_args();

        assert_eq!(args[0], "-y");
        let joined = args.join(" ");
        assert!(joined.contains("-i scene_0.mp4 -i scene_0.mp3"));
        assert!(joined.contains("-c:v copy"));
        assert!(joined.contains("-map 0:v:0 -map 1:a:0 -shortest"));
        assert!(joined.ends_with("synced_0.mp4"));
    }

    #[test]
    fn test_concat_manifest_args() {
        let cmd = FfmpegCommand::concat_manifest("list.txt", "final.mp4");
        let joined = cmd.build_args().join(" ");

        assert!(joined.contains("-f concat -safe 0 -i list.txt"));
        assert!(joined.contains("-c copy"));
    }

    #[test]
    fn test_silence_args() {
        let cmd = FfmpegCommand::silence(4.4, "chunk.mp3");
        let joined = cmd.build_args().join(" ");

        assert!(joined.contains("-f lavfi -i anullsrc=r=44100:cl=stereo"));
        assert!(joined.contains("-t 4.400"));
        assert!(joined.contains("-c:a libmp3lame -b:a 128k"));
    }
}

//! Scene rendering through the Manim CLI.
//!
//! The renderer is a trait so the generate/repair loop and the scheduler
//! can be exercised without a Manim install. The real implementation
//! shells out to `manim <source> <class> -o <stem>.mp4` with the scene's
//! video directory as the working directory, which puts the output under
//! `media/videos/<stem>/1080p60/` relative to that directory.

use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

static SCENE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"class\s+(\w+)\s*\(.*?Scene\)").unwrap());

/// Class name passed to the CLI when the source declares none we can find.
const DEFAULT_SCENE_CLASS: &str = "Scene";

/// Captured output of one renderer invocation.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl RenderOutcome {
    /// A failure that never reached the renderer (spawn error, timeout).
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: message.into(),
        }
    }

    /// Best diagnostic text for a failed run.
    pub fn diagnostic(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// First `class X(...Scene)` name in the source, or the default.
pub fn extract_scene_class(code: &str) -> String {
    SCENE_CLASS_RE
        .captures(code)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_SCENE_CLASS.to_string())
}

/// Renders one scene source file to video.
#[async_trait]
pub trait SceneRenderer: Send + Sync {
    /// Render `source` with `working_dir` as the current directory.
    /// Output lands at `media/videos/<stem>/1080p60/<stem>.mp4` under
    /// the working directory.
    async fn render(&self, source: &Path, scene_class: &str, working_dir: &Path) -> RenderOutcome;
}

/// Production renderer invoking the `manim` CLI.
pub struct ManimRenderer {
    timeout: Duration,
}

impl ManimRenderer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl SceneRenderer for ManimRenderer {
    async fn render(&self, source: &Path, scene_class: &str, working_dir: &Path) -> RenderOutcome {
        if which::which("manim").is_err() {
            return RenderOutcome::failure(
                "manim not found in PATH; install manim to render scenes",
            );
        }

        let output_name = match source.file_stem() {
            Some(stem) => format!("{}.mp4", stem.to_string_lossy()),
            None => "scene.mp4".to_string(),
        };

        debug!(
            source = %source.display(),
            scene_class = %scene_class,
            "Invoking renderer"
        );

        let mut child = match Command::new("manim")
            .arg(source)
            .arg(scene_class)
            .arg("-o")
            .arg(&output_name)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return RenderOutcome::failure(format!("failed to spawn manim: {e}")),
        };

        let stdout = child.stdout.take();
        let stdout_handle = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut stdout) = stdout {
                let _ = stdout.read_to_string(&mut buf).await;
            }
            buf
        });
        let stderr = child.stderr.take();
        let stderr_handle = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf).await;
            }
            buf
        });

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return RenderOutcome::failure(format!("renderer wait failed: {e}")),
            Err(_) => {
                warn!(
                    source = %source.display(),
                    "Render timed out after {} seconds, killing process",
                    self.timeout.as_secs()
                );
                let _ = child.kill().await;
                return RenderOutcome::failure(format!(
                    "Render timed out after {} seconds",
                    self.timeout.as_secs()
                ));
            }
        };

        let stdout = stdout_handle.await.unwrap_or_default();
        let stderr = stderr_handle.await.unwrap_or_default();

        RenderOutcome {
            success: status.success(),
            stdout,
            stderr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_scene_class() {
        let code = "from manim import *\n\nclass PythagoreanProof(Scene):\n    def construct(self):\n        pass\n";
        assert_eq!(extract_scene_class(code), "PythagoreanProof");
    }

    #[test]
    fn test_extract_scene_class_subclass() {
        let code = "class Rotation3D(ThreeDScene):\n    pass";
        assert_eq!(extract_scene_class(code), "Rotation3D");
    }

    #[test]
    fn test_extract_scene_class_fallback() {
        assert_eq!(extract_scene_class("print('no class here')"), "Scene");
    }

    #[test]
    fn test_first_scene_class_wins() {
        let code = "class First(Scene):\n    pass\n\nclass Second(Scene):\n    pass";
        assert_eq!(extract_scene_class(code), "First");
    }

    #[test]
    fn test_diagnostic_prefers_stderr() {
        let outcome = RenderOutcome {
            success: false,
            stdout: "some progress output".to_string(),
            stderr: "Traceback: NameError".to_string(),
        };
        assert_eq!(outcome.diagnostic(), "Traceback: NameError");

        let outcome = RenderOutcome {
            success: false,
            stdout: "only stdout had content".to_string(),
            stderr: "  \n".to_string(),
        };
        assert_eq!(outcome.diagnostic(), "only stdout had content");
    }
}

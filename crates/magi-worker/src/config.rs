//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the video generation pipeline.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root directory for generated artifacts (code, audio, videos)
    pub output_dir: PathBuf,
    /// Maximum scenes rendered in parallel within a single job
    pub max_workers: usize,
    /// Total render attempts per scene (initial render plus repairs)
    pub max_retries: u32,
    /// Hard ceiling on a single renderer invocation
    pub render_timeout: Duration,
    /// Speaking rate used for narration duration estimates
    pub words_per_minute: u32,
    /// Treat wait-call mismatches in generated code as render failures
    pub strict_timing: bool,
    /// Override for the renderer usage reference shipped with the binary
    pub knowledge_path: Option<PathBuf>,
    /// Override for the code generation task prompt
    pub prompt_path: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            max_workers: 2,
            max_retries: 3,
            render_timeout: Duration::from_secs(300), // 5 minutes
            words_per_minute: 150,
            strict_timing: false,
            knowledge_path: None,
            prompt_path: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            output_dir: std::env::var("MAGI_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("output")),
            max_workers: std::env::var("MAGI_MAX_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            max_retries: std::env::var("MAGI_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            render_timeout: Duration::from_secs(
                std::env::var("MAGI_RENDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            words_per_minute: std::env::var("MAGI_WORDS_PER_MINUTE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(150),
            strict_timing: std::env::var("MAGI_STRICT_TIMING")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
            knowledge_path: std::env::var("MAGI_KNOWLEDGE_PATH").ok().map(PathBuf::from),
            prompt_path: std::env::var("MAGI_PROMPT_PATH").ok().map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.render_timeout, Duration::from_secs(300));
        assert_eq!(config.words_per_minute, 150);
        assert!(!config.strict_timing);
        assert!(config.knowledge_path.is_none());
    }
}

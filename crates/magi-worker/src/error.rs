//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Script generation failed: {0}")]
    ScriptGeneration(String),

    #[error("Scene generation failed: {0}")]
    SceneGeneration(String),

    #[error("Audio generation failed: {0}")]
    AudioFailed(String),

    #[error("Assembly failed: {0}")]
    AssemblyFailed(String),

    #[error("Job cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("AI service error: {0}")]
    Ai(#[from] magi_ai::AiError),

    #[error("Media error: {0}")]
    Media(#[from] magi_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn script_generation(msg: impl Into<String>) -> Self {
        Self::ScriptGeneration(msg.into())
    }

    pub fn scene_generation(msg: impl Into<String>) -> Self {
        Self::SceneGeneration(msg.into())
    }

    pub fn audio_failed(msg: impl Into<String>) -> Self {
        Self::AudioFailed(msg.into())
    }

    pub fn assembly_failed(msg: impl Into<String>) -> Self {
        Self::AssemblyFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if this error came from a user-requested cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            WorkerError::Cancelled | WorkerError::Media(magi_media::MediaError::Cancelled)
        )
    }
}

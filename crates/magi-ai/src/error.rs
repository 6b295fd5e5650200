//! Error types for external AI service calls.

use thiserror::Error;

use crate::retry::RetryClass;

/// Result type for AI service operations.
pub type AiResult<T> = Result<T, AiError>;

/// Errors from language model and text-to-speech calls.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("{service} request failed: {message}")]
    RequestFailed { service: String, message: String },

    #[error("{service} returned HTTP {status}: {message}")]
    HttpStatus {
        service: String,
        status: u16,
        message: String,
    },

    #[error("{service} request timed out")]
    Timeout { service: String },

    #[error("{service} returned an empty response")]
    EmptyResponse { service: String },

    #[error("API key for {service} not set ({env_var})")]
    MissingApiKey { service: String, env_var: String },

    #[error("Media error: {0}")]
    Media(#[from] magi_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AiError {
    /// Create a request failure error.
    pub fn request_failed(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error.
    pub fn http_status(service: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::HttpStatus {
            service: service.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(service: impl Into<String>) -> Self {
        Self::Timeout {
            service: service.into(),
        }
    }

    /// Create an empty-response error.
    pub fn empty_response(service: impl Into<String>) -> Self {
        Self::EmptyResponse {
            service: service.into(),
        }
    }

    /// How a retry loop should treat this error.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Timeout { .. } => RetryClass::Retryable,
            Self::HttpStatus { status: 429, .. } => RetryClass::RateLimited,
            Self::HttpStatus { status, .. } if (500..600).contains(status) => {
                RetryClass::Retryable
            }
            Self::HttpStatus { .. } => RetryClass::Fatal,
            Self::RequestFailed { .. } => RetryClass::Retryable,
            Self::EmptyResponse { .. }
            | Self::MissingApiKey { .. }
            | Self::Media(_)
            | Self::Io(_) => RetryClass::Fatal,
        }
    }
}

/// Convert a reqwest error into an `AiError` for the named service.
pub fn from_reqwest(service: &str, err: reqwest::Error) -> AiError {
    if err.is_timeout() {
        AiError::timeout(service)
    } else {
        AiError::request_failed(service, err.to_string())
    }
}

//! Text to speech synthesis through the ElevenLabs API.
//!
//! Narration audio is best effort: a missing API key or an exhausted
//! retry budget degrades to a silent track sized from the word count,
//! so the pipeline always receives a playable file. Only a failure to
//! produce the silent fallback itself surfaces as an error.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use magi_media::{FfmpegCommand, FfmpegRunner};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{from_reqwest, AiError, AiResult};
use crate::retry::{retry_with_policy, RetryPolicy};

/// Speaking rate used to size silent fallback audio, in words per second.
const FALLBACK_WORDS_PER_SECOND: f64 = 2.5;

/// Speech synthesis boundary used by the pipeline.
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Synthesize `text` into an audio file at `output`.
    ///
    /// With `silent_fallback` set the API is skipped entirely and a
    /// silent track of the estimated duration is written instead.
    async fn synthesize(&self, text: &str, output: &Path, silent_fallback: bool)
        -> AiResult<PathBuf>;
}

/// ElevenLabs client configuration.
#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub api_key: Option<String>,
    pub voice_id: String,
    pub model_id: String,
    pub output_format: String,
    pub base_url: String,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            voice_id: "JBFqnCBsd6RMkjVDRZzb".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            output_format: "mp3_44100_128".to_string(),
            base_url: "https://api.elevenlabs.io".to_string(),
        }
    }
}

impl ElevenLabsConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("ELEVENLABS_API_KEY").ok(),
            voice_id: std::env::var("ELEVENLABS_VOICE_ID").unwrap_or(defaults.voice_id),
            model_id: std::env::var("ELEVENLABS_MODEL_ID").unwrap_or(defaults.model_id),
            output_format: std::env::var("ELEVENLABS_OUTPUT_FORMAT")
                .unwrap_or(defaults.output_format),
            base_url: defaults.base_url,
        }
    }
}

/// ElevenLabs text to speech client.
pub struct ElevenLabsClient {
    client: Client,
    config: ElevenLabsConfig,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest {
    text: String,
    model_id: String,
}

impl ElevenLabsClient {
    /// Create a new client.
    pub fn new(config: ElevenLabsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            retry: RetryPolicy::new("tts_synthesis"),
        }
    }

    /// Create a client configured from the environment.
    pub fn from_env() -> Self {
        Self::new(ElevenLabsConfig::from_env())
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn request_audio(&self, text: &str, api_key: &str) -> AiResult<Vec<u8>> {
        let url = format!(
            "{}/v1/text-to-speech/{}?output_format={}",
            self.config.base_url, self.config.voice_id, self.config.output_format
        );
        let request = SynthesisRequest {
            text: text.to_string(),
            model_id: self.config.model_id.clone(),
        };

        debug!("Requesting speech synthesis for {} chars", text.len());

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| from_reqwest("elevenlabs", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::http_status("elevenlabs", status, body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| from_reqwest("elevenlabs", e))?;

        if bytes.is_empty() {
            return Err(AiError::empty_response("elevenlabs"));
        }

        Ok(bytes.to_vec())
    }

    /// Write a silent track sized from the word count of `text`.
    async fn write_silence(&self, text: &str, output: &Path) -> AiResult<PathBuf> {
        let words = text.split_whitespace().count();
        let duration = words as f64 / FALLBACK_WORDS_PER_SECOND;

        let cmd = FfmpegCommand::silence(duration, output);
        FfmpegRunner::new().run(&cmd).await?;

        Ok(output.to_path_buf())
    }
}

#[async_trait]
impl SpeechService for ElevenLabsClient {
    async fn synthesize(
        &self,
        text: &str,
        output: &Path,
        silent_fallback: bool,
    ) -> AiResult<PathBuf> {
        if silent_fallback {
            debug!("Silent mode requested, skipping speech API");
            return self.write_silence(text, output).await;
        }

        let Some(api_key) = self.config.api_key.clone() else {
            warn!("ELEVENLABS_API_KEY not set, writing silent audio");
            return self.write_silence(text, output).await;
        };

        let result = retry_with_policy(&self.retry, AiError::retry_class, || {
            self.request_audio(text, &api_key)
        })
        .await;

        match result.into_result() {
            Ok(bytes) => {
                tokio::fs::write(output, &bytes).await?;
                Ok(output.to_path_buf())
            }
            Err(e) => {
                warn!("Speech synthesis failed, writing silent audio: {}", e);
                self.write_silence(text, output).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer, api_key: Option<&str>) -> ElevenLabsClient {
        let config = ElevenLabsConfig {
            api_key: api_key.map(String::from),
            base_url: server.uri(),
            ..Default::default()
        };
        ElevenLabsClient::new(config).with_retry(
            RetryPolicy::new("test")
                .with_max_attempts(2)
                .with_base_delay(Duration::from_millis(1))
                .with_rate_limit_delay(Duration::from_millis(1)),
        )
    }

    #[tokio::test]
    async fn test_synthesis_writes_audio_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/JBFqnCBsd6RMkjVDRZzb"))
            .and(header("xi-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3data".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("chunk_0.mp3");
        let client = test_client(&server, Some("test-key"));

        let written = client.synthesize("hello world", &out, false).await.unwrap();
        assert_eq!(written, out);
        assert_eq!(std::fs::read(&out).unwrap(), b"mp3data");
    }

    #[tokio::test]
    async fn test_empty_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(Vec::new()))
            .mount(&server)
            .await;

        let config = ElevenLabsConfig {
            api_key: Some("test-key".to_string()),
            base_url: server.uri(),
            ..Default::default()
        };
        let client = ElevenLabsClient::new(config);

        let err = client
            .request_audio("hello", "test-key")
            .await
            .expect_err("empty body should fail");
        assert!(matches!(err, AiError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn test_rate_limited_request_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limit"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3data".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("chunk_0.mp3");
        let client = test_client(&server, Some("test-key"));

        client.synthesize("hello world", &out, false).await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"mp3data");
    }
}

//! Language model client for script and scene code generation.
//!
//! Dispatches on the configured model name: `claude-*` models go to the
//! Anthropic messages API, everything else to the OpenAI chat completions
//! API. The `CompletionService` boundary absorbs every failure into an
//! empty string so callers have a single failure signal to check.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{from_reqwest, AiError, AiResult};
use crate::retry::{retry_with_policy, RetryPolicy};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Sampling parameters for one completion request.
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionParams {
    /// Parameters tuned for narration script generation.
    pub fn script() -> Self {
        Self {
            max_tokens: 8000,
            temperature: 0.7,
        }
    }

    /// Parameters tuned for scene code generation and repair.
    pub fn code() -> Self {
        Self {
            max_tokens: 4000,
            temperature: 0.3,
        }
    }
}

/// Text completion boundary used by the pipeline.
///
/// Implementations must never let an error escape: any failure is
/// reported as an empty string, which callers treat as the sole
/// failure signal.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Request a completion for the given system context and user prompt.
    async fn complete(&self, system: &str, user: &str, params: CompletionParams) -> String;
}

/// Language model client configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model name; `claude-*` selects the Anthropic API
    pub model: String,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub openai_base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            anthropic_api_key: None,
            openai_api_key: None,
            anthropic_base_url: "https://api.anthropic.com".to_string(),
            openai_base_url: "https://api.openai.com".to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl LlmConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            model: std::env::var("MAGI_LLM_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            request_timeout: Duration::from_secs(
                std::env::var("MAGI_LLM_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            ..Default::default()
        }
    }

    fn uses_anthropic(&self) -> bool {
        self.model.starts_with("claude")
    }
}

/// Language model API client.
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

impl LlmClient {
    /// Create a new client.
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            retry: RetryPolicy::new("llm_completion"),
        }
    }

    /// Create a client configured from the environment.
    pub fn from_env() -> Self {
        Self::new(LlmConfig::from_env())
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Issue one completion request, propagating errors.
    pub async fn try_complete(
        &self,
        system: &str,
        user: &str,
        params: CompletionParams,
    ) -> AiResult<String> {
        retry_with_policy(&self.retry, AiError::retry_class, || {
            self.single_request(system, user, params)
        })
        .await
        .into_result()
    }

    async fn single_request(
        &self,
        system: &str,
        user: &str,
        params: CompletionParams,
    ) -> AiResult<String> {
        if self.config.uses_anthropic() {
            self.anthropic_request(system, user, params).await
        } else {
            self.openai_request(system, user, params).await
        }
    }

    async fn anthropic_request(
        &self,
        system: &str,
        user: &str,
        params: CompletionParams,
    ) -> AiResult<String> {
        let api_key =
            self.config
                .anthropic_api_key
                .as_deref()
                .ok_or_else(|| AiError::MissingApiKey {
                    service: "anthropic".to_string(),
                    env_var: "ANTHROPIC_API_KEY".to_string(),
                })?;

        let url = format!("{}/v1/messages", self.config.anthropic_base_url);
        let request = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system: system.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        };

        debug!("Requesting completion from {} ({})", url, self.config.model);

        let response = self
            .client
            .post(&url)
            .timeout(self.config.request_timeout)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| from_reqwest("anthropic", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::http_status("anthropic", status, body));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| AiError::request_failed("anthropic", e.to_string()))?;

        parsed
            .content
            .first()
            .and_then(|c| c.text.clone())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AiError::empty_response("anthropic"))
    }

    async fn openai_request(
        &self,
        system: &str,
        user: &str,
        params: CompletionParams,
    ) -> AiResult<String> {
        let api_key =
            self.config
                .openai_api_key
                .as_deref()
                .ok_or_else(|| AiError::MissingApiKey {
                    service: "openai".to_string(),
                    env_var: "OPENAI_API_KEY".to_string(),
                })?;

        let url = format!("{}/v1/chat/completions", self.config.openai_base_url);
        let request = OpenAiRequest {
            model: self.config.model.clone(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
        };

        debug!("Requesting completion from {} ({})", url, self.config.model);

        let response = self
            .client
            .post(&url)
            .timeout(self.config.request_timeout)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| from_reqwest("openai", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::http_status("openai", status, body));
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| AiError::request_failed("openai", e.to_string()))?;

        parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AiError::empty_response("openai"))
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, system: &str, user: &str, params: CompletionParams) -> String {
        match self.try_complete(system, user, params).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Completion request failed, returning empty output: {}", e);
                String::new()
            }
        }
    }
}

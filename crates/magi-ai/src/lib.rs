//! External AI service clients for the Magi video generator.
//!
//! This crate owns the two network boundaries the pipeline depends on:
//! language model completions (Anthropic or OpenAI, selected by model
//! name) and ElevenLabs speech synthesis. Both sit behind traits so the
//! pipeline can be driven by fakes in tests, and both share a single
//! retry policy that classifies failures as retryable, rate limited,
//! or fatal.

pub mod completion;
pub mod error;
pub mod retry;
pub mod speech;

pub use completion::{CompletionParams, CompletionService, LlmClient, LlmConfig};
pub use error::{from_reqwest, AiError, AiResult};
pub use retry::{retry_with_policy, Backoff, RetryClass, RetryPolicy, RetryResult};
pub use speech::{ElevenLabsClient, ElevenLabsConfig, SpeechService};

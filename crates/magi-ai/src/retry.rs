//! Retry policy shared by external service clients.
//!
//! One configurable policy covers both the language model and the
//! text-to-speech clients: transient failures back off along the
//! configured curve, rate limits back off linearly on their own (longer)
//! base delay, and fatal errors stop immediately.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// How a failed call should be treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Transient failure, retry on the standard backoff curve
    Retryable,
    /// Service asked us to slow down, retry on the rate-limit delay
    RateLimited,
    /// Permanent failure, do not retry
    Fatal,
}

/// Backoff growth curve for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// delay = base * 2^attempt
    Exponential,
    /// delay = base * (attempt + 1)
    Linear,
}

/// Configuration for retrying an external call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Base delay for transient failures.
    pub base_delay: Duration,
    /// Base delay for rate-limited failures (grows linearly).
    pub rate_limit_delay: Duration,
    /// Cap applied to every computed delay.
    pub max_delay: Duration,
    /// Growth curve for transient failures.
    pub backoff: Backoff,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            rate_limit_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(60),
            backoff: Backoff::Exponential,
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryPolicy {
    /// Create a new policy with the given operation name.
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    /// Set the total number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the base delay for transient failures.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Set the base delay for rate-limited failures.
    pub fn with_rate_limit_delay(mut self, rate_limit_delay: Duration) -> Self {
        self.rate_limit_delay = rate_limit_delay;
        self
    }

    /// Set the backoff curve.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Delay before the try following failed attempt `attempt` (0-based).
    fn delay_for(&self, class: RetryClass, attempt: u32) -> Duration {
        let delay = match class {
            RetryClass::RateLimited => self.rate_limit_delay.saturating_mul(attempt + 1),
            RetryClass::Retryable => match self.backoff {
                Backoff::Exponential => {
                    self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
                }
                Backoff::Linear => self.base_delay.saturating_mul(attempt + 1),
            },
            RetryClass::Fatal => Duration::ZERO,
        };
        delay.min(self.max_delay)
    }
}

/// Result of a retried operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded.
    Success(T),
    /// Operation failed after the given number of attempts.
    Failed { error: E, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    /// Returns true if the operation succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success(_))
    }

    /// Convert into a plain `Result`, discarding the attempt count.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(v) => Ok(v),
            RetryResult::Failed { error, .. } => Err(error),
        }
    }
}

/// Execute an async operation under a retry policy.
///
/// `classify` decides, per error, whether and how to retry. Fatal errors
/// and exhausted attempts end the loop with `RetryResult::Failed`.
pub async fn retry_with_policy<F, Fut, T, E, C>(
    policy: &RetryPolicy,
    classify: C,
    operation: F,
) -> RetryResult<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    C: Fn(&E) -> RetryClass,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return RetryResult::Success(value),
            Err(e) => {
                let class = classify(&e);
                let exhausted = attempt + 1 >= policy.max_attempts;

                if class == RetryClass::Fatal || exhausted {
                    return RetryResult::Failed {
                        error: e,
                        attempts: attempt + 1,
                    };
                }

                let delay = policy.delay_for(class, attempt);
                debug!(
                    "{} attempt {} failed ({:?}), retrying in {:?}: {}",
                    policy.operation_name,
                    attempt + 1,
                    class,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

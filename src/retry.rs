//! Retry with exponential backoff for mailbox API calls.
//!
//! Only the mailbox collaborator retries. Outbound unsubscribe requests are
//! sent exactly once.

use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::errors::UnsubscriberError;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt)
    pub max_attempts: u32,

    /// Initial delay between retries
    pub initial_delay: Duration,

    /// Maximum delay between retries (for exponential backoff)
    pub max_delay: Duration,

    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,

    /// Whether to add jitter to prevent thundering herd
    pub jitter: bool,

    /// Maximum total time to spend retrying
    pub max_total_duration: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
            max_total_duration: Some(Duration::from_secs(120)),
        }
    }
}

/// Policy for determining if an operation should be retried
pub trait RetryPolicy<E> {
    /// Returns true if the operation should be retried for this error
    fn should_retry(&self, error: &E, attempt: u32) -> bool;
}

/// Retries timeouts, connection failures, 429 and 5xx responses.
pub struct MailboxRetryPolicy;

impl RetryPolicy<UnsubscriberError> for MailboxRetryPolicy {
    fn should_retry(&self, error: &UnsubscriberError, _attempt: u32) -> bool {
        error.is_transient()
    }
}

/// Retry executor that handles the retry logic
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor with the given configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute an async operation with retry logic
    pub async fn execute<F, Fut, T, E, P>(&self, operation: F, policy: P) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        P: RetryPolicy<E>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();
        let mut delay = self.config.initial_delay;
        let mut attempt = 0;

        loop {
            let error = match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            let out_of_time = self
                .config
                .max_total_duration
                .is_some_and(|max| start_time.elapsed() >= max);
            if attempt >= self.config.max_attempts
                || out_of_time
                || !policy.should_retry(&error, attempt)
            {
                return Err(error);
            }

            let actual_delay = if self.config.jitter {
                add_jitter(delay)
            } else {
                delay
            };
            debug!(
                attempt = attempt + 1,
                delay_ms = actual_delay.as_millis() as u64,
                "retrying after error: {error}"
            );
            sleep(actual_delay).await;

            delay = std::cmp::min(
                Duration::from_millis(
                    (delay.as_millis() as f64 * self.config.backoff_multiplier) as u64,
                ),
                self.config.max_delay,
            );
            attempt += 1;
        }
    }
}

/// Add random jitter to prevent thundering herd problems
fn add_jitter(delay: Duration) -> Duration {
    use rand::Rng;

    let jitter_range = delay.as_millis() as f64 * 0.1; // 10% jitter
    let mut rng = rand::rng();
    let jitter: f64 = rng.random_range(-jitter_range..=jitter_range);

    let jittered_ms = (delay.as_millis() as f64 + jitter).max(0.0) as u64;
    Duration::from_millis(jittered_ms)
}

/// Builder pattern for creating retry configurations
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }

    /// Set the maximum number of retry attempts
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Set the initial delay between retries
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.config.initial_delay = delay;
        self
    }

    /// Enable or disable jitter
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.config.jitter = enabled;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> RetryConfig {
        self.config
    }
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

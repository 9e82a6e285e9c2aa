//! Retry strategies for davpub's remote operations.
//!
//! This crate provides configurable retry strategies with support for:
//! - Multiple backoff strategies (immediate, exponential, linear, constant)
//! - Jitter for spreading out retries against a struggling server
//! - Outcome classification, so a call that *returned* a value (for example a
//!   `503` status) can still ask to be replayed
//!
//! The default policy is six attempts in total with no delay between them,
//! which is what the WebDAV client uses for server-side (`5xx`) failures.
//!
//! # Example
//!
//! ```
//! use davpub_retry::RetryExecutor;
//!
//! let executor = RetryExecutor::default();
//! let status = executor.run_with_classification(|attempt| {
//!     let status = if attempt < 3 { 503 } else { 201 };
//!     Ok::<_, ()>((status, status >= 500))
//! });
//! assert_eq!(status, Ok(201));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Total attempts (initial call plus retries) made by the default policy.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;

/// Strategy type for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategyType {
    /// No delay between retries - replay immediately (default)
    #[default]
    Immediate,
    /// Exponential backoff: delay doubles each attempt
    Exponential,
    /// Linear backoff: delay increases linearly each attempt
    Linear,
    /// Constant delay: same delay every attempt
    Constant,
}

/// Configuration for a retry strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryStrategyConfig {
    /// Strategy type for calculating delay between retries.
    #[serde(default)]
    pub strategy: RetryStrategyType,
    /// Total number of attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for backoff calculations.
    #[serde(default = "default_base_delay")]
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Maximum delay cap for backoff.
    #[serde(default = "default_max_delay")]
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Jitter factor for randomized delays (0.0 = no jitter, 1.0 = full jitter).
    #[serde(default)]
    pub jitter: f64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

/// Six attempts, replayed immediately.
impl Default for RetryStrategyConfig {
    fn default() -> Self {
        Self {
            strategy: RetryStrategyType::Immediate,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: 0.0,
        }
    }
}

/// Calculate the delay before the next attempt.
///
/// `attempt` is the number of the attempt that just failed (1-indexed).
///
/// ```
/// use davpub_retry::{RetryStrategyConfig, RetryStrategyType, calculate_delay};
/// use std::time::Duration;
///
/// let config = RetryStrategyConfig {
///     strategy: RetryStrategyType::Exponential,
///     base_delay: Duration::from_secs(1),
///     max_delay: Duration::from_secs(60),
///     jitter: 0.0,
///     max_attempts: 10,
/// };
///
/// assert_eq!(calculate_delay(&config, 1), Duration::from_secs(1));
/// assert_eq!(calculate_delay(&config, 3), Duration::from_secs(4));
/// ```
pub fn calculate_delay(config: &RetryStrategyConfig, attempt: u32) -> Duration {
    let delay = match config.strategy {
        RetryStrategyType::Immediate => return Duration::ZERO,
        RetryStrategyType::Exponential => {
            let pow = attempt.saturating_sub(1).min(16);
            config.base_delay.saturating_mul(2_u32.saturating_pow(pow))
        }
        RetryStrategyType::Linear => config.base_delay.saturating_mul(attempt),
        RetryStrategyType::Constant => config.base_delay,
    };

    let capped = delay.min(config.max_delay);

    if config.jitter > 0.0 {
        apply_jitter(capped, config.jitter)
    } else {
        capped
    }
}

/// Jitter factor of 0.5 means delay * (0.5 to 1.5).
fn apply_jitter(delay: Duration, jitter: f64) -> Duration {
    use rand::Rng;

    let jitter = jitter.clamp(0.0, 1.0);
    let jitter_range = 2.0 * jitter;
    let mut rng = rand::thread_rng();
    let random_value: f64 = rng.r#gen();
    let random_factor = 1.0 - jitter + (random_value * jitter_range);
    let millis = (delay.as_millis() as f64 * random_factor).round() as u64;
    Duration::from_millis(millis)
}

/// Runs an operation until it succeeds, asks to stop, or runs out of attempts.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryStrategyConfig,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryStrategyConfig::default())
    }
}

impl RetryExecutor {
    /// Create a new retry executor with the given configuration.
    pub fn new(config: RetryStrategyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryStrategyConfig {
        &self.config
    }

    /// Attempts actually permitted; a configured `0` still runs the operation once.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Execute an operation whose successful results may still be retryable.
    ///
    /// The operation returns `Ok((value, should_retry))`. A value flagged for
    /// retry is replayed while attempts remain; once the ceiling is reached the
    /// last value is returned as-is. An `Err` is always retried and surfaces
    /// only when it is the outcome of the final attempt.
    pub fn run_with_classification<T, E, F>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Result<(T, bool), E>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            let exhausted = attempt >= max_attempts;
            match operation(attempt) {
                Ok((value, should_retry)) => {
                    if !should_retry || exhausted {
                        return Ok(value);
                    }
                }
                Err(e) => {
                    if exhausted {
                        return Err(e);
                    }
                }
            }

            let delay = calculate_delay(&self.config, attempt);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            attempt += 1;
        }
    }
}

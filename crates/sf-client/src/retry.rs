//! Per-request retry policy.
//!
//! Retries apply to a single HTTP exchange (429, 5xx, timeouts, dropped
//! connections). They are unrelated to bulk job polling, which waits for as
//! long as the job takes.

use rand::Rng;
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff: BackoffStrategy,
    /// Honour `Retry-After` on 429 responses.
    pub respect_retry_after: bool,
    /// Upper bound applied to `Retry-After`.
    pub max_retry_after: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff: BackoffStrategy::ExponentialWithJitter { factor: 2.0 },
            respect_retry_after: true,
            max_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// A config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }
}

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy)]
pub enum BackoffStrategy {
    Constant,
    /// `initial * (attempt + 1)`
    Linear,
    /// `initial * factor^attempt`
    Exponential { factor: f64 },
    /// Exponential plus a random share of the base delay.
    ExponentialWithJitter { factor: f64 },
}

impl BackoffStrategy {
    /// Delay before retry number `attempt` (0-indexed), capped at `max_delay`.
    pub fn delay(&self, attempt: u32, initial_delay: Duration, max_delay: Duration) -> Duration {
        let exponential = |factor: f64| initial_delay.as_secs_f64() * factor.powi(attempt as i32);

        let delay = match *self {
            BackoffStrategy::Constant => initial_delay,
            BackoffStrategy::Linear => initial_delay.saturating_mul(attempt + 1),
            BackoffStrategy::Exponential { factor } => secs(exponential(factor), max_delay),
            BackoffStrategy::ExponentialWithJitter { factor } => {
                let base = exponential(factor);
                let jitter = rand::rng().random::<f64>() * base;
                secs(base + jitter, max_delay)
            }
        };

        delay.min(max_delay)
    }
}

// Duration::from_secs_f64 panics on overflow; clamp first.
fn secs(value: f64, max_delay: Duration) -> Duration {
    if !value.is_finite() || value >= max_delay.as_secs_f64() {
        max_delay
    } else {
        Duration::from_secs_f64(value.max(0.0))
    }
}

/// Tracks attempts for one logical request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    attempt: u32,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Number of retries consumed so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn should_retry(&self) -> bool {
        self.attempt < self.config.max_attempts
    }

    /// Consume one retry and return how long to wait, or `None` when exhausted.
    pub fn next_delay(&mut self, retry_after: Option<Duration>) -> Option<Duration> {
        if !self.should_retry() {
            return None;
        }

        let delay = match retry_after {
            Some(wait) if self.config.respect_retry_after => wait.min(self.config.max_retry_after),
            _ => self.config.backoff.delay(
                self.attempt,
                self.config.initial_delay,
                self.config.max_delay,
            ),
        };

        self.attempt += 1;
        Some(delay)
    }
}

//! Attempt and redirect budgets with exponential backoff.
//!
//! The same policy drives both loops of the dispatcher: the delay before the next
//! whole attempt, and the delay before following the next redirect hop.

use std::time::Duration;

use rand::Rng;

/// Default number of whole attempts per operation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default number of redirect hops followed within one attempt.
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Retry and redirect limits for one client.
///
/// ```text
/// delay(attempt) = min(base_delay * multiplier^(attempt - 1), max_delay) + jitter
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    max_redirects: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
    jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(max_attempts: u32, max_redirects: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            max_redirects,
            ..Self::default()
        }
    }

    /// A policy that never sleeps between attempts or hops.
    #[must_use]
    pub fn immediate(max_attempts: u32, max_redirects: u32) -> Self {
        Self::new(max_attempts, max_redirects).with_delays(Duration::ZERO, Duration::ZERO)
    }

    #[must_use]
    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay.max(base_delay);
        self
    }

    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn max_redirects(&self) -> u32 {
        self.max_redirects
    }

    /// Delay to wait after `attempt` (1-indexed) before the next one.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let scaled_ms =
            self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped_ms = scaled_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64) + self.sample_jitter()
    }

    fn sample_jitter(&self) -> Duration {
        let max_ms = self.jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

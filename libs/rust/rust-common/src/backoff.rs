//! Bounded exponential backoff for consecutive failures.
//!
//! [`Backoff`] counts failures in a row and hands out the delay before the
//! next attempt until the configured bound is reached.

use std::time::Duration;

/// Backoff configuration.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Upper bound on any single delay (before jitter)
    pub max_delay: Duration,
    /// Multiplier applied per additional failure
    pub multiplier: f64,
    /// Add up to 25% random jitter to each delay
    pub jitter: bool,
    /// Consecutive failures after which no further attempt is made
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: true,
            max_attempts: 3,
        }
    }
}

impl BackoffConfig {
    /// Set the delay after the first failure.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the failure bound. Zero is treated as one.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Disable jitter.
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }
}

/// Consecutive-failure tracker.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    failures: u32,
}

impl Backoff {
    /// Create a tracker with no recorded failures.
    #[must_use]
    pub const fn new(config: BackoffConfig) -> Self {
        Self { config, failures: 0 }
    }

    /// Delay before retrying after failure number `attempt + 1`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_ms =
            self.config.initial_delay.as_millis() as f64 * self.config.multiplier.powi(exponent);
        let capped_ms = base_ms.min(self.config.max_delay.as_millis() as f64);

        let delay_ms = if self.config.jitter {
            capped_ms * (1.0 + rand::random::<f64>() * 0.25)
        } else {
            capped_ms
        };

        Duration::from_millis(delay_ms as u64)
    }

    /// Record a failure.
    ///
    /// Returns the delay before the next attempt, or `None` once the number of
    /// consecutive failures has reached `max_attempts`.
    pub fn record_failure(&mut self) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);
        if self.is_exhausted() {
            None
        } else {
            Some(self.delay_for_attempt(self.failures - 1))
        }
    }

    /// Clear the failure count after a success.
    pub const fn reset(&mut self) {
        self.failures = 0;
    }

    /// Number of consecutive failures recorded so far.
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    /// Whether the failure bound has been reached.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.failures >= self.config.max_attempts
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &BackoffConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(max_attempts: u32) -> Backoff {
        Backoff::new(
            BackoffConfig::default()
                .without_jitter()
                .with_max_attempts(max_attempts),
        )
    }

    #[test]
    fn test_delay_doubles_until_cap() {
        let backoff = fixed(10);
        assert_eq!(backoff.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(backoff.delay_for_attempt(4), Duration::from_secs(10));
        assert_eq!(backoff.delay_for_attempt(40), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_stays_within_quarter() {
        let backoff = Backoff::new(BackoffConfig::default());
        for _ in 0..50 {
            let delay = backoff.delay_for_attempt(1);
            assert!(delay >= Duration::from_secs(2));
            assert!(delay <= Duration::from_millis(2500));
        }
    }

    #[test]
    fn test_record_failure_until_exhausted() {
        let mut backoff = fixed(3);
        assert_eq!(backoff.record_failure(), Some(Duration::from_secs(1)));
        assert_eq!(backoff.record_failure(), Some(Duration::from_secs(2)));
        assert_eq!(backoff.record_failure(), None);
        assert!(backoff.is_exhausted());
        assert_eq!(backoff.failures(), 3);
    }

    #[test]
    fn test_reset_clears_failures() {
        let mut backoff = fixed(2);
        backoff.record_failure();
        backoff.reset();
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.record_failure(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let mut backoff = fixed(0);
        assert_eq!(backoff.record_failure(), None);
    }
}

//! Retry policy: attempt ceiling and backoff schedule.

use std::time::Duration;

use rand::Rng;

/// Configuration for retrying failed sends.
///
/// Transient failures back off exponentially from `initial_delay`,
/// multiplied by `multiplier` per attempt and capped at `max_delay`.
/// Throttled sends wait for the server-supplied delay instead. Both
/// schedules add random jitter of up to `jitter_percent` so that requests
/// failing together do not retry together.
///
/// # Defaults
///
/// - `max_attempts`: 3
/// - `initial_delay`: 1 second
/// - `max_delay`: 30 seconds
/// - `multiplier`: 2.0
/// - `jitter_percent`: 20
///
/// # Example
///
/// ```
/// use webhook_dispatch::dispatch::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new()
///     .with_max_attempts(5)
///     .with_initial_delay(Duration::from_millis(500))
///     .with_jitter_percent(0);
///
/// assert_eq!(policy.backoff_for(1), Duration::from_millis(500));
/// assert_eq!(policy.backoff_for(2), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of transport attempts (including the first).
    ///
    /// A value of 1 means no retries. Also bounds how many consecutive
    /// rate-limit waits one request may go through before giving up.
    pub max_attempts: u32,

    /// Delay before the first retry of a transient failure.
    pub initial_delay: Duration,

    /// Cap on the backoff delay (jitter included).
    ///
    /// Server-supplied rate-limit delays are not capped.
    pub max_delay: Duration,

    /// Factor applied to the delay after each attempt.
    pub multiplier: f64,

    /// Maximum random deviation, as a percentage of the base delay.
    pub jitter_percent: u8,
}

impl RetryPolicy {
    /// Default maximum attempts.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Default initial delay (1 second).
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

    /// Default maximum delay (30 seconds).
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

    /// Default multiplier (2.0).
    pub const DEFAULT_MULTIPLIER: f64 = 2.0;

    /// Default jitter (20%).
    pub const DEFAULT_JITTER_PERCENT: u8 = 20;

    /// Minimum value for `max_attempts`.
    pub const MIN_MAX_ATTEMPTS: u32 = 1;

    /// Maximum value for `jitter_percent`.
    pub const MAX_JITTER_PERCENT: u8 = 100;

    /// Creates a new retry policy with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            initial_delay: Self::DEFAULT_INITIAL_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
            multiplier: Self::DEFAULT_MULTIPLIER,
            jitter_percent: Self::DEFAULT_JITTER_PERCENT,
        }
    }

    /// Sets the maximum number of attempts.
    ///
    /// # Panics
    ///
    /// Panics if `max_attempts` is less than 1.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        assert!(
            max_attempts >= Self::MIN_MAX_ATTEMPTS,
            "max_attempts must be at least 1"
        );
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum backoff delay.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the delay multiplier.
    ///
    /// # Panics
    ///
    /// Panics if `multiplier` is below 1.0, which would shrink the delay
    /// between attempts.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        assert!(multiplier >= 1.0, "multiplier must be at least 1.0");
        self.multiplier = multiplier;
        self
    }

    /// Sets the jitter percentage. Zero makes every delay deterministic.
    ///
    /// # Panics
    ///
    /// Panics if `percent` exceeds 100.
    #[must_use]
    pub const fn with_jitter_percent(mut self, percent: u8) -> Self {
        assert!(
            percent <= Self::MAX_JITTER_PERCENT,
            "jitter_percent must be at most 100"
        );
        self.jitter_percent = percent;
        self
    }

    /// Backoff before the next attempt, before jitter.
    ///
    /// `attempts` is the number of attempts already made (1 after the first
    /// failure). Non-decreasing in `attempts` and never above `max_delay`.
    #[must_use]
    pub fn base_backoff_for(&self, attempts: u32) -> Duration {
        let exponent = i32::try_from(attempts.saturating_sub(1)).unwrap_or(i32::MAX);
        let delay_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }

    /// Backoff before retrying a transient failure: the base delay with
    /// up to ±`jitter_percent` applied, still capped at `max_delay`.
    #[must_use]
    pub fn backoff_for(&self, attempts: u32) -> Duration {
        let base = self.base_backoff_for(attempts);
        if self.jitter_percent == 0 {
            return base;
        }

        let spread = self.jitter_fraction();
        let factor = 1.0 + rand::thread_rng().gen_range(-spread..=spread);
        base.mul_f64(factor).min(self.max_delay)
    }

    /// Delay before retrying a throttled send.
    ///
    /// Never shorter than `retry_after`; adds up to `jitter_percent` on top
    /// so that concurrent senders spread out after a shared reset.
    #[must_use]
    pub fn rate_limit_delay(&self, retry_after: Duration) -> Duration {
        if self.jitter_percent == 0 {
            return retry_after;
        }

        let spread = self.jitter_fraction();
        let factor = 1.0 + rand::thread_rng().gen_range(0.0..=spread);
        retry_after.mul_f64(factor)
    }

    /// Returns true if another attempt is allowed after `attempts` attempts.
    #[must_use]
    pub const fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    fn jitter_fraction(&self) -> f64 {
        f64::from(self.jitter_percent.min(Self::MAX_JITTER_PERCENT)) / 100.0
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

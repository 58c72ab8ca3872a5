//! Wall-clock abstraction for testability.
//!
//! Rate-limit scheduling runs on [`tokio::time::Instant`], but some servers
//! report bucket resets as absolute Unix timestamps. Converting those into
//! a relative delay needs the wall clock, which is injected through the
//! [`Clock`] trait so tests can pin it.

use std::time::{Duration, SystemTime};

/// Abstraction over system time for testability.
///
/// # Example
///
/// ```
/// use webhook_dispatch::time::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let now = clock.now();
/// assert!(now >= std::time::SystemTime::UNIX_EPOCH);
/// ```
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> SystemTime;
}

/// Production clock using actual system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Converts an absolute Unix timestamp (fractional seconds) into the delay
/// remaining from `now`.
///
/// Timestamps in the past (or non-finite input) yield [`Duration::ZERO`];
/// ones beyond what a [`Duration`] can hold yield [`Duration::MAX`].
#[must_use]
pub fn until_epoch_secs(epoch_secs: f64, now: SystemTime) -> Duration {
    if !epoch_secs.is_finite() || epoch_secs <= 0.0 {
        return Duration::ZERO;
    }

    let now_secs = now
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64());

    let remaining = epoch_secs - now_secs;
    if remaining > 0.0 {
        Duration::try_from_secs_f64(remaining).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

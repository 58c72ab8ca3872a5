//! Per-endpoint rate-limit bucket.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tokio::time::Instant;

/// Window assumed for a bucket whose reset interval has never been observed.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Longest a bucket will ever hold requests back for.
pub const MAX_DEFER: Duration = Duration::from_secs(24 * 60 * 60);

/// Returns `now + delay`, with `delay` capped at [`MAX_DEFER`].
#[must_use]
pub fn deadline(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay.min(MAX_DEFER)).unwrap_or(now)
}

/// What to do when a bucket's reset time has passed without a fresh
/// response to confirm the new budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    /// Assume the window refilled to its last known limit.
    #[default]
    Optimistic,
    /// Let one request through, then pace by the last observed window until
    /// the server reports fresh state.
    Probe,
}

impl StalePolicy {
    /// Configuration name of the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Optimistic => "optimistic",
            Self::Probe => "probe",
        }
    }
}

impl fmt::Display for StalePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`StalePolicy`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stale policy '{0}' (expected 'optimistic' or 'probe')")]
pub struct UnknownStalePolicy(pub String);

impl FromStr for StalePolicy {
    type Err = UnknownStalePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optimistic" => Ok(Self::Optimistic),
            "probe" => Ok(Self::Probe),
            _ => Err(UnknownStalePolicy(s.to_string())),
        }
    }
}

/// Answer to [`RateLimitBucket::reserve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Budget was reserved; send now.
    ProceedNow,
    /// No budget until the given instant; ask again then.
    WaitUntil(Instant),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BucketState {
    Unknown,
    Tracked {
        limit: u32,
        remaining: u32,
        reset_at: Instant,
    },
}

/// Remaining budget and reset time for one endpoint.
///
/// A bucket starts `Unknown` and lets the first request through. Every
/// response carrying rate-limit headers moves it to `Tracked` with the
/// server's values, which always replace the local prediction. A bucket
/// is owned by exactly one queue worker and is never shared.
#[derive(Debug, Clone)]
pub struct RateLimitBucket {
    state: BucketState,
    stale_policy: StalePolicy,
    min_interval: Duration,
    window: Option<Duration>,
    last_reserved: Option<Instant>,
}

impl Default for RateLimitBucket {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitBucket {
    /// Creates an `Unknown` bucket with the optimistic stale policy and no
    /// minimum spacing.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: BucketState::Unknown,
            stale_policy: StalePolicy::Optimistic,
            min_interval: Duration::ZERO,
            window: None,
            last_reserved: None,
        }
    }

    /// Sets the stale policy.
    #[must_use]
    pub const fn with_stale_policy(mut self, policy: StalePolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    /// Sets the minimum time between two reservations. Zero disables spacing.
    #[must_use]
    pub const fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Returns true once any rate-limit state has been learned.
    #[must_use]
    pub const fn is_tracked(&self) -> bool {
        matches!(self.state, BucketState::Tracked { .. })
    }

    /// Requests left in the current window, if known.
    #[must_use]
    pub const fn remaining(&self) -> Option<u32> {
        match self.state {
            BucketState::Unknown => None,
            BucketState::Tracked { remaining, .. } => Some(remaining),
        }
    }

    /// When the current window resets, if known.
    #[must_use]
    pub const fn reset_at(&self) -> Option<Instant> {
        match self.state {
            BucketState::Unknown => None,
            BucketState::Tracked { reset_at, .. } => Some(reset_at),
        }
    }

    /// Decides whether a request may be sent at `now`.
    ///
    /// `ProceedNow` consumes one unit of budget. `WaitUntil` consumes
    /// nothing; the caller must ask again at or after the returned instant.
    pub fn reserve(&mut self, now: Instant) -> Decision {
        let blocked_until = self.spacing_ready_at(now).max(self.budget_ready_at(now));
        if let Some(until) = blocked_until {
            return Decision::WaitUntil(until);
        }

        self.take_budget(now);
        self.last_reserved = Some(now);
        Decision::ProceedNow
    }

    /// Replaces local state with the values reported by the server.
    ///
    /// A missing `limit` keeps the previously known one.
    pub fn observe(&mut self, limit: Option<u32>, remaining: u32, reset_at: Instant, now: Instant) {
        let limit = limit
            .or(self.limit())
            .unwrap_or_else(|| remaining.saturating_add(1))
            .max(1);

        let window = reset_at.saturating_duration_since(now);
        if !window.is_zero() {
            self.window = Some(window);
        }

        self.state = BucketState::Tracked {
            limit,
            remaining,
            reset_at,
        };
    }

    /// Records an explicit throttling signal: no budget until
    /// `now + retry_after`.
    pub fn throttle(&mut self, retry_after: Duration, now: Instant) {
        self.state = BucketState::Tracked {
            limit: self.limit().unwrap_or(1),
            remaining: 0,
            reset_at: deadline(now, retry_after),
        };
    }

    fn limit(&self) -> Option<u32> {
        match self.state {
            BucketState::Unknown => None,
            BucketState::Tracked { limit, .. } => Some(limit),
        }
    }

    fn spacing_ready_at(&self, now: Instant) -> Option<Instant> {
        if self.min_interval.is_zero() {
            return None;
        }
        let ready = self.last_reserved? + self.min_interval;
        (ready > now).then_some(ready)
    }

    fn budget_ready_at(&self, now: Instant) -> Option<Instant> {
        match self.state {
            BucketState::Tracked {
                remaining: 0,
                reset_at,
                ..
            } if now < reset_at => Some(reset_at),
            _ => None,
        }
    }

    fn take_budget(&mut self, now: Instant) {
        let BucketState::Tracked {
            limit,
            remaining,
            reset_at,
        } = self.state
        else {
            return;
        };

        if remaining > 0 {
            self.state = BucketState::Tracked {
                limit,
                remaining: remaining - 1,
                reset_at,
            };
            return;
        }

        // Reset time passed with no fresh response: this request is the
        // first of an assumed new window.
        let reset_at = deadline(now, self.window.unwrap_or(DEFAULT_WINDOW));
        let remaining = match self.stale_policy {
            StalePolicy::Optimistic => limit.saturating_sub(1),
            StalePolicy::Probe => 0,
        };
        self.state = BucketState::Tracked {
            limit,
            remaining,
            reset_at,
        };
    }
}

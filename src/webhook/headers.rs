//! Rate-limit information carried by responses.
//!
//! Header names follow the de-facto convention used by Discord and most
//! chat platforms:
//!
//! | Header | Meaning |
//! |--------|---------|
//! | `X-RateLimit-Limit` | Requests allowed per window |
//! | `X-RateLimit-Remaining` | Requests left in the current window |
//! | `X-RateLimit-Reset-After` | Seconds (fractional) until the window resets |
//! | `X-RateLimit-Reset` | Unix time (fractional seconds) of the reset |
//! | `X-RateLimit-Bucket` | Opaque bucket id shared across routes |
//! | `Retry-After` | Seconds to wait after a 429 |

use std::time::{Duration, SystemTime};

use serde::Deserialize;

use super::HttpResponse;
use crate::time::until_epoch_secs;

pub const LIMIT: &str = "x-ratelimit-limit";
pub const REMAINING: &str = "x-ratelimit-remaining";
pub const RESET: &str = "x-ratelimit-reset";
pub const RESET_AFTER: &str = "x-ratelimit-reset-after";
pub const BUCKET: &str = "x-ratelimit-bucket";
pub const GLOBAL: &str = "x-ratelimit-global";
pub const RETRY_AFTER: &str = "retry-after";

/// Delay assumed for a 429 that carries no usable retry hint.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Upper bound on any server-supplied delay, guarding against absurd values.
const MAX_SERVER_DELAY_SECS: f64 = 24.0 * 60.0 * 60.0;

/// Bucket state reported by a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitHeaders {
    /// Window size, if reported.
    pub limit: Option<u32>,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Time until the window resets, relative to when the response was read.
    pub reset_after: Duration,
    /// Server-side bucket id, if reported.
    pub bucket: Option<String>,
}

impl RateLimitHeaders {
    /// Extracts bucket state from a response.
    ///
    /// Returns `None` unless both a remaining count and a reset time are
    /// present. `X-RateLimit-Reset-After` wins over `X-RateLimit-Reset`
    /// because it is immune to clock skew; the absolute form is converted
    /// using `wall_now`.
    #[must_use]
    pub fn parse(response: &HttpResponse, wall_now: SystemTime) -> Option<Self> {
        let remaining = response.header_str(REMAINING)?.parse::<u32>().ok()?;

        let reset_after = response
            .header_str(RESET_AFTER)
            .and_then(parse_seconds)
            .or_else(|| {
                response
                    .header_str(RESET)
                    .and_then(|v| v.parse::<f64>().ok())
                    .map(|epoch| until_epoch_secs(epoch, wall_now))
                    .and_then(|d| seconds_to_duration(d.as_secs_f64()))
            })?;

        Some(Self {
            limit: response
                .header_str(LIMIT)
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|l| *l > 0),
            remaining,
            reset_after,
            bucket: response.header_str(BUCKET).map(ToString::to_string),
        })
    }
}

/// JSON body of a 429 response.
#[derive(Debug, Deserialize)]
struct ThrottleBody {
    retry_after: Option<f64>,
    #[serde(default)]
    global: bool,
}

/// Throttling details extracted from a 429 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryHint {
    /// How long the server asked us to wait.
    pub retry_after: Duration,
    /// True if the limit applies to the whole application, not one route.
    pub global: bool,
}

impl RetryHint {
    /// Determines how long to wait after a throttled response.
    ///
    /// Sources, in order: JSON body `retry_after`, `Retry-After` header,
    /// `X-RateLimit-Reset-After`, then [`DEFAULT_RETRY_AFTER`].
    #[must_use]
    pub fn from_response(response: &HttpResponse) -> Self {
        let body: Option<ThrottleBody> = serde_json::from_slice(&response.body).ok();

        let global = body.as_ref().is_some_and(|b| b.global)
            || response
                .header_str(GLOBAL)
                .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let retry_after = body
            .and_then(|b| b.retry_after)
            .and_then(seconds_to_duration)
            .or_else(|| response.header_str(RETRY_AFTER).and_then(parse_seconds))
            .or_else(|| response.header_str(RESET_AFTER).and_then(parse_seconds))
            .unwrap_or(DEFAULT_RETRY_AFTER);

        Self {
            retry_after,
            global,
        }
    }
}

fn parse_seconds(value: &str) -> Option<Duration> {
    value.parse::<f64>().ok().and_then(seconds_to_duration)
}

fn seconds_to_duration(secs: f64) -> Option<Duration> {
    if secs.is_finite() && secs >= 0.0 {
        Duration::try_from_secs_f64(secs.min(MAX_SERVER_DELAY_SECS)).ok()
    } else {
        None
    }
}

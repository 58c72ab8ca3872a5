//! Default values for configuration options.
//!
//! Centralized constants to avoid magic numbers scattered across the codebase.

/// Default maximum number of attempts per message.
pub const RETRY_MAX_ATTEMPTS: u32 = 3;

/// Default initial retry delay in milliseconds.
pub const RETRY_INITIAL_DELAY_MS: u64 = 1_000;

/// Default maximum retry delay in milliseconds.
pub const RETRY_MAX_DELAY_MS: u64 = 30_000;

/// Default retry backoff multiplier.
pub const RETRY_MULTIPLIER: f64 = 2.0;

/// Default retry jitter percentage.
pub const RETRY_JITTER_PERCENT: u8 = 20;

/// Default bound on transport attempts in flight.
pub const MAX_CONCURRENT: usize = 8;

/// Default per-request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default spacing between sends to one endpoint, in milliseconds (disabled).
pub const MIN_SEND_INTERVAL_MS: u64 = 0;

/// Default stale bucket policy name.
pub const STALE_POLICY: &str = "optimistic";


//! Rate-limited dispatch engine.
//!
//! This module provides:
//! - Endpoint identity ([`EndpointId`])
//! - Per-endpoint rate-limit tracking ([`RateLimitBucket`], [`StalePolicy`])
//! - Retry and backoff configuration ([`RetryPolicy`])
//! - The engine and its completion handles ([`DispatchEngine`], [`SendHandle`])
//! - Terminal results ([`Delivery`], [`DispatchError`])

mod controller;
mod endpoint;
mod engine;
mod error;
mod handle;
mod limiter;
mod queue;
mod retry;

#[cfg(test)]
mod controller_tests;
#[cfg(test)]
mod retry_tests;
#[cfg(test)]
mod test_fixtures;

pub use endpoint::EndpointId;
pub use engine::{DispatchEngine, EngineConfig};
pub use error::{Delivery, DispatchError};
pub use handle::SendHandle;
pub use limiter::{
    DEFAULT_WINDOW, Decision, MAX_DEFER, RateLimitBucket, StalePolicy, UnknownStalePolicy,
};
pub use retry::RetryPolicy;

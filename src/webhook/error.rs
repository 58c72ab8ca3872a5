//! Error types for HTTP operations.

use thiserror::Error;

/// Error type for HTTP operations.
///
/// Describes what went wrong without dictating recovery strategy; the
/// [`Transport`](super::Transport) decides whether a given variant is
/// transient or permanent.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network connection failed.
    ///
    /// This includes DNS resolution failures, connection refused,
    /// connection reset, and body read failures.
    #[error("Connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The request could not be built (bad URL, bad header).
    #[error("Invalid request: {0}")]
    InvalidUrl(String),

    /// The HTTP client itself could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl HttpError {
    /// Returns true for network-level failures that may succeed on retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout)
    }
}

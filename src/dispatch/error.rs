//! Terminal results of a dispatched send.

use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

use crate::webhook::FailureCause;

/// A successfully delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Response status code (2xx).
    pub status: StatusCode,
    /// Raw response body (empty for 204).
    pub body: Vec<u8>,
    /// Transport attempts made, including the successful one.
    pub attempts: u32,
}

impl Delivery {
    /// Returns the response body as UTF-8 text, if valid.
    #[must_use]
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Why a submitted message was not delivered.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The server kept throttling until the attempt ceiling was reached.
    #[error("Rate limited after {attempts} attempt(s), server asked to wait {retry_after:?}")]
    RateLimited {
        /// Transport attempts made
        attempts: u32,
        /// Last server-supplied delay
        retry_after: Duration,
    },

    /// Every attempt failed with a retryable error.
    #[error("Delivery failed after {attempts} attempt(s): {cause}")]
    Transient {
        /// Transport attempts made
        attempts: u32,
        /// The last failure
        #[source]
        cause: FailureCause,
    },

    /// The server rejected the request; it was not retried.
    #[error("Delivery rejected: {cause}")]
    Permanent {
        /// Transport attempts made
        attempts: u32,
        /// Response status, if a response was received
        status: Option<StatusCode>,
        /// What the server (or request builder) reported
        #[source]
        cause: FailureCause,
    },

    /// The caller cancelled the send before it completed.
    #[error("Send cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Transport attempts made before cancellation took effect
        attempts: u32,
    },

    /// The send hit an internal fault; later sends are unaffected.
    #[error("Send aborted by an internal error after {attempts} attempt(s)")]
    Aborted {
        /// Transport attempts made before the fault
        attempts: u32,
    },

    /// The engine stopped before reporting an outcome.
    #[error("Dispatch engine shut down before the send completed")]
    EngineShutdown {
        /// Attempts known to have been made (0 when unknown)
        attempts: u32,
    },
}

impl DispatchError {
    /// Transport attempts made before this outcome.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::RateLimited { attempts, .. }
            | Self::Transient { attempts, .. }
            | Self::Permanent { attempts, .. }
            | Self::Cancelled { attempts }
            | Self::Aborted { attempts }
            | Self::EngineShutdown { attempts } => *attempts,
        }
    }

    /// Returns true if the failure was caused by caller cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

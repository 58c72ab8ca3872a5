//! Caller-side handle to a submitted message.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::error::{Delivery, DispatchError};

/// Completion handle returned by
/// [`DispatchEngine::submit`](super::DispatchEngine::submit).
///
/// Awaiting the handle yields the terminal outcome of the send. Dropping it
/// does not cancel the send; call [`cancel`](Self::cancel) for that.
#[derive(Debug)]
pub struct SendHandle {
    id: u64,
    cancel: CancellationToken,
    rx: oneshot::Receiver<Result<Delivery, DispatchError>>,
}

impl SendHandle {
    pub(crate) const fn new(
        id: u64,
        cancel: CancellationToken,
        rx: oneshot::Receiver<Result<Delivery, DispatchError>>,
    ) -> Self {
        Self { id, cancel, rx }
    }

    /// Engine-unique id of this send, as used in log messages.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Requests cancellation.
    ///
    /// Takes effect before the next transport attempt. An attempt already
    /// on the wire completes, and its outcome is replaced by
    /// [`DispatchError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns a token that cancels this send when triggered.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Future for SendHandle {
    type Output = Result<Delivery, DispatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| {
                received.unwrap_or(Err(DispatchError::EngineShutdown { attempts: 0 }))
            })
    }
}

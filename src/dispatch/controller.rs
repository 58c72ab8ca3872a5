//! Retry controller: drives one send request to a terminal outcome.
//!
//! The request moves through an explicit state machine:
//!
//! ```text
//!            ┌──────────── Waiting(t) ◄──┐
//!            ▼                           │
//! ──► Reserving ──► InFlight ──► Retrying(d)
//!            │          │              │
//!            ▼          ▼              ▼
//!         Terminal ◄────┴──────────────┘ (cancel)
//! ```
//!
//! Cancellation is observed at every suspension point except the network
//! call itself: an attempt that has started runs to completion, its rate
//! limit information is kept, and its outcome is discarded.

use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::{Delivery, DispatchError};
use super::limiter::{self, Decision, RateLimitBucket};
use super::retry::RetryPolicy;
use super::EndpointId;
use crate::encode::EncodedPayload;
use crate::time::{Clock, SystemClock};
use crate::webhook::{Classified, HttpClient, SendOutcome, Transport};

/// Everything the workers of one engine share.
#[derive(Debug)]
pub struct Shared<H, C = SystemClock> {
    pub transport: Transport<H, C>,
    pub retry: RetryPolicy,
    /// Bounds transport attempts in flight across all endpoints.
    pub permits: Semaphore,
}

/// One message on its way to an endpoint.
#[derive(Debug)]
pub struct SendRequest {
    pub id: u64,
    pub endpoint: EndpointId,
    pub payload: EncodedPayload,
    pub submitted_at: Instant,
    /// Transport attempts made so far.
    pub attempts: u32,
    pub max_attempts: u32,
}

type Outcome = Result<Delivery, DispatchError>;

#[derive(Debug)]
enum State {
    /// Asking the bucket for budget.
    Reserving,
    /// No budget until the instant; suspended.
    Waiting(Instant),
    /// Holding budget; one transport attempt to make.
    InFlight,
    /// Backing off before asking for budget again.
    Retrying(Duration),
    Terminal(Outcome),
}

/// Drives a [`SendRequest`] through reserve, send, classify and retry.
pub struct RetryController<'a, H, C> {
    shared: &'a Shared<H, C>,
    bucket: &'a mut RateLimitBucket,
    request: &'a mut SendRequest,
    cancel: CancellationToken,
    /// Rate-limit waits since the last transport attempt.
    waits: u32,
}

impl<'a, H: HttpClient, C: Clock> RetryController<'a, H, C> {
    pub fn new(
        shared: &'a Shared<H, C>,
        bucket: &'a mut RateLimitBucket,
        request: &'a mut SendRequest,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            shared,
            bucket,
            request,
            cancel,
            waits: 0,
        }
    }

    /// Runs the state machine until the request reaches a terminal outcome.
    pub async fn run(mut self) -> Outcome {
        let mut state = State::Reserving;
        loop {
            state = match state {
                State::Reserving => self.reserve(),
                State::Waiting(until) => self.wait_until(until).await,
                State::InFlight => self.attempt().await,
                State::Retrying(delay) => self.back_off(delay).await,
                State::Terminal(outcome) => return outcome,
            };
        }
    }

    fn reserve(&mut self) -> State {
        if self.cancel.is_cancelled() {
            return self.cancelled();
        }

        let now = Instant::now();
        match self.bucket.reserve(now) {
            Decision::ProceedNow => State::InFlight,
            Decision::WaitUntil(until) => {
                self.waits += 1;
                if self.waits > self.request.max_attempts {
                    tracing::error!(
                        "Request #{} to {} gave up waiting for rate limit",
                        self.request.id,
                        self.request.endpoint
                    );
                    return State::Terminal(Err(DispatchError::RateLimited {
                        attempts: self.request.attempts,
                        retry_after: until.saturating_duration_since(now),
                    }));
                }
                tracing::debug!(
                    "Request #{} to {} waiting {:?} for rate limit",
                    self.request.id,
                    self.request.endpoint,
                    until.saturating_duration_since(now)
                );
                State::Waiting(until)
            }
        }
    }

    async fn wait_until(&self, until: Instant) -> State {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => self.cancelled(),
            () = tokio::time::sleep_until(until) => State::Reserving,
        }
    }

    async fn back_off(&self, delay: Duration) -> State {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => self.cancelled(),
            () = tokio::time::sleep(delay) => State::Reserving,
        }
    }

    async fn attempt(&mut self) -> State {
        let permit = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return self.cancelled(),
            permit = self.shared.permits.acquire() => permit,
        };
        let Ok(_permit) = permit else {
            return State::Terminal(Err(DispatchError::EngineShutdown {
                attempts: self.request.attempts,
            }));
        };

        self.request.attempts += 1;
        self.waits = 0;
        tracing::debug!(
            "Request #{} to {}: attempt {}/{}",
            self.request.id,
            self.request.endpoint,
            self.request.attempts,
            self.request.max_attempts
        );

        let classified = self
            .shared
            .transport
            .send(&self.request.endpoint, &self.request.payload)
            .await;
        self.learn(&classified);

        if self.cancel.is_cancelled() {
            return self.cancelled();
        }
        self.settle(classified.outcome)
    }

    /// Feeds rate-limit information from a response into the bucket.
    fn learn(&mut self, classified: &Classified) {
        let now = Instant::now();
        if let Some(limits) = &classified.limits {
            let reset_at = limiter::deadline(now, limits.reset_after);
            self.bucket
                .observe(limits.limit, limits.remaining, reset_at, now);
        }
        if let SendOutcome::RateLimited { retry_after, .. } = classified.outcome {
            self.bucket.throttle(retry_after, now);
        }
    }

    fn settle(&self, outcome: SendOutcome) -> State {
        let attempts = self.request.attempts;
        let can_retry = self.shared.retry.should_retry(attempts);

        match outcome {
            SendOutcome::Success { status, body } => State::Terminal(Ok(Delivery {
                status,
                body,
                attempts,
            })),
            SendOutcome::RateLimited {
                retry_after,
                global,
            } if can_retry => {
                let delay = self.shared.retry.rate_limit_delay(retry_after);
                tracing::warn!(
                    "Request #{} to {} rate limited{}, retrying in {delay:?}",
                    self.request.id,
                    self.request.endpoint,
                    if global { " (global)" } else { "" }
                );
                State::Retrying(delay)
            }
            SendOutcome::RateLimited { retry_after, .. } => {
                State::Terminal(Err(DispatchError::RateLimited {
                    attempts,
                    retry_after,
                }))
            }
            SendOutcome::TransientFailure { cause } if can_retry => {
                let delay = self.shared.retry.backoff_for(attempts);
                tracing::warn!(
                    "Request #{} to {} failed: {cause}, retrying in {delay:?}",
                    self.request.id,
                    self.request.endpoint
                );
                State::Retrying(delay)
            }
            SendOutcome::TransientFailure { cause } => {
                State::Terminal(Err(DispatchError::Transient { attempts, cause }))
            }
            SendOutcome::PermanentFailure { status, cause } => {
                State::Terminal(Err(DispatchError::Permanent {
                    attempts,
                    status,
                    cause,
                }))
            }
        }
    }

    fn cancelled(&self) -> State {
        tracing::debug!(
            "Request #{} to {} cancelled after {} attempt(s)",
            self.request.id,
            self.request.endpoint,
            self.request.attempts
        );
        State::Terminal(Err(DispatchError::Cancelled {
            attempts: self.request.attempts,
        }))
    }
}

//! Per-endpoint FIFO queue and its worker task.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::EndpointId;
use super::controller::{RetryController, SendRequest, Shared};
use super::error::{Delivery, DispatchError};
use super::limiter::RateLimitBucket;
use crate::time::Clock;
use crate::webhook::HttpClient;

/// A queued request plus the channels tying it to its caller.
#[derive(Debug)]
pub struct Job {
    pub request: SendRequest,
    pub cancel: CancellationToken,
    pub reply: oneshot::Sender<Result<Delivery, DispatchError>>,
}

/// Sending half of one endpoint's queue and the worker draining it.
#[derive(Debug)]
pub struct EndpointQueue {
    tx: mpsc::UnboundedSender<Job>,
    worker: JoinHandle<()>,
}

impl EndpointQueue {
    /// Spawns the worker for `endpoint`. The worker owns `bucket`.
    pub fn spawn<H, C>(
        endpoint: EndpointId,
        shared: Arc<Shared<H, C>>,
        bucket: RateLimitBucket,
    ) -> Self
    where
        H: HttpClient + 'static,
        C: Clock + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(endpoint, shared, bucket, rx));
        Self { tx, worker }
    }

    /// Appends a job; hands it back if the worker is gone.
    pub fn push(&self, job: Job) -> Result<(), Box<Job>> {
        self.tx.send(job).map_err(|e| Box::new(e.0))
    }

    /// Closes the queue and waits for the worker to finish what was queued.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            tracing::error!("Endpoint worker failed: {e}");
        }
    }
}

/// Processes jobs strictly one at a time, in arrival order.
async fn run_worker<H, C>(
    endpoint: EndpointId,
    shared: Arc<Shared<H, C>>,
    mut bucket: RateLimitBucket,
    mut rx: mpsc::UnboundedReceiver<Job>,
) where
    H: HttpClient,
    C: Clock,
{
    tracing::debug!("Worker for {endpoint} started");

    while let Some(Job {
        mut request,
        cancel,
        reply,
    }) = rx.recv().await
    {
        let id = request.id;
        let submitted_at = request.submitted_at;
        // A panicking job must not take the rest of the queue with it.
        let run = RetryController::new(&shared, &mut bucket, &mut request, cancel).run();
        let result = AssertUnwindSafe(run).catch_unwind().await;
        let outcome = result.unwrap_or_else(|_| {
            Err(DispatchError::Aborted {
                attempts: request.attempts,
            })
        });

        match &outcome {
            Ok(delivery) => tracing::info!(
                "Request #{id} to {endpoint} delivered ({}) after {} attempt(s) in {:?}",
                delivery.status,
                delivery.attempts,
                submitted_at.elapsed()
            ),
            Err(e) if e.is_cancelled() => {}
            Err(e) => tracing::error!("Request #{id} to {endpoint} failed: {e}"),
        }

        // The caller may have dropped its handle; the outcome is still final.
        let _ = reply.send(outcome);
    }

    tracing::debug!("Worker for {endpoint} stopped");
}

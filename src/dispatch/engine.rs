//! Public entry point: encode, enqueue, and hand back a completion handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Semaphore, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::controller::{SendRequest, Shared};
use super::handle::SendHandle;
use super::limiter::{RateLimitBucket, StalePolicy};
use super::queue::{EndpointQueue, Job};
use super::{EndpointId, RetryPolicy};
use crate::encode::{EncodedPayload, EncodingError, PayloadEncoder, PayloadLimits};
use crate::message::WebhookMessage;
use crate::time::{Clock, SystemClock};
use crate::webhook::{HttpClient, Transport};

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Retry ceiling and backoff schedule.
    pub retry: RetryPolicy,
    /// Maximum transport attempts in flight across all endpoints.
    pub max_concurrent: usize,
    /// Behaviour when a bucket's reset time passes unconfirmed.
    pub stale_policy: StalePolicy,
    /// Minimum spacing between sends to one endpoint; zero disables it.
    pub min_send_interval: Duration,
    /// Size and count limits enforced before queuing.
    pub limits: PayloadLimits,
}

impl EngineConfig {
    /// Default in-flight attempt bound.
    pub const DEFAULT_MAX_CONCURRENT: usize = 8;
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_concurrent: Self::DEFAULT_MAX_CONCURRENT,
            stale_policy: StalePolicy::default(),
            min_send_interval: Duration::ZERO,
            limits: PayloadLimits::default(),
        }
    }
}

/// Rate-limited, per-endpoint ordered webhook dispatcher.
///
/// Every [`EndpointId`] gets its own FIFO queue, drained by one worker task
/// that owns the endpoint's [`RateLimitBucket`]. Different endpoints run in
/// parallel, bounded only by the shared in-flight attempt limit.
///
/// # Type Parameters
///
/// - `H`: The HTTP client implementation
/// - `C`: Wall clock for absolute reset headers (defaults to [`SystemClock`])
///
/// # Example
///
/// ```no_run
/// use webhook_dispatch::dispatch::{DispatchEngine, EndpointId};
/// use webhook_dispatch::message::WebhookMessage;
/// use webhook_dispatch::webhook::ReqwestClient;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = DispatchEngine::new(ReqwestClient::new());
/// let endpoint = EndpointId::parse("https://discord.com/api/webhooks/1/token")?;
///
/// let delivery = engine.submit(endpoint, &WebhookMessage::text("hello"))?.await?;
/// println!("delivered with status {}", delivery.status);
///
/// engine.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DispatchEngine<H, C = SystemClock> {
    shared: Arc<Shared<H, C>>,
    encoder: PayloadEncoder,
    stale_policy: StalePolicy,
    min_send_interval: Duration,
    queues: Mutex<HashMap<EndpointId, EndpointQueue>>,
    next_id: AtomicU64,
}

impl<H> DispatchEngine<H, SystemClock> {
    /// Creates an engine with default settings around `client`.
    #[must_use]
    pub fn new(client: H) -> Self {
        Self::with_transport(Transport::new(client), EngineConfig::default())
    }
}

impl<H, C> DispatchEngine<H, C> {
    /// Creates an engine from a configured transport.
    ///
    /// A `max_concurrent` of zero is treated as one.
    #[must_use]
    pub fn with_transport(transport: Transport<H, C>, config: EngineConfig) -> Self {
        let shared = Shared {
            transport,
            retry: config.retry,
            permits: Semaphore::new(config.max_concurrent.max(1)),
        };

        Self {
            shared: Arc::new(shared),
            encoder: PayloadEncoder::new(config.limits),
            stale_policy: config.stale_policy,
            min_send_interval: config.min_send_interval,
            queues: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the retry policy applied to every send.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.shared.retry
    }

    /// Number of endpoints that currently have a queue.
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<H, C> DispatchEngine<H, C>
where
    H: HttpClient + 'static,
    C: Clock + 'static,
{
    /// Encodes `message` and queues it for `endpoint`.
    ///
    /// Returns immediately. Sends to the same endpoint complete in
    /// submission order.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError`] if the message violates payload limits;
    /// nothing is queued in that case.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime when `endpoint` has no
    /// worker yet.
    pub fn submit(
        &self,
        endpoint: EndpointId,
        message: &WebhookMessage,
    ) -> Result<SendHandle, EncodingError> {
        let payload = self.encoder.encode(message)?;
        Ok(self.submit_encoded(endpoint, payload))
    }

    /// Queues an already encoded payload for `endpoint`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime when `endpoint` has no
    /// worker yet.
    pub fn submit_encoded(&self, endpoint: EndpointId, payload: EncodedPayload) -> SendHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (reply, rx) = oneshot::channel();

        tracing::debug!("Request #{id} to {endpoint} queued ({} bytes)", payload.len());

        let job = Job {
            request: SendRequest {
                id,
                endpoint: endpoint.clone(),
                payload,
                submitted_at: Instant::now(),
                attempts: 0,
                max_attempts: self.shared.retry.max_attempts,
            },
            cancel: cancel.clone(),
            reply,
        };
        self.enqueue(endpoint, job);

        SendHandle::new(id, cancel, rx)
    }

    /// Stops accepting work, lets every queued send finish, and joins the
    /// workers.
    pub async fn shutdown(self) {
        let queues = self
            .queues
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        tracing::info!("Shutting down dispatch engine ({} endpoints)", queues.len());
        for (_, queue) in queues {
            queue.close().await;
        }
    }

    fn enqueue(&self, endpoint: EndpointId, job: Job) {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = queues
            .entry(endpoint.clone())
            .or_insert_with(|| self.spawn_queue(endpoint.clone()));

        if let Err(job) = queue.push(job) {
            // Worker died; start a fresh one. Its bucket begins Unknown.
            tracing::warn!("Worker for {endpoint} is gone, restarting");
            *queue = self.spawn_queue(endpoint);
            // A second failure drops the job; its handle reports EngineShutdown.
            let _ = queue.push(*job);
        }
    }

    fn spawn_queue(&self, endpoint: EndpointId) -> EndpointQueue {
        let bucket = RateLimitBucket::new()
            .with_stale_policy(self.stale_policy)
            .with_min_interval(self.min_send_interval);
        EndpointQueue::spawn(endpoint, Arc::clone(&self.shared), bucket)
    }
}

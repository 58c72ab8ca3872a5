//! Tests for the retry controller state machine.

use super::controller::{RetryController, SendRequest, Shared};
use super::test_fixtures::{
    ScriptedClient, URL, ok, ok_with_limits, response, status, too_many_requests,
};
use super::{Delivery, DispatchError, EndpointId, RateLimitBucket, RetryPolicy};
use crate::encode::EncodedPayload;
use crate::webhook::{HttpError, Transport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn shared(client: ScriptedClient, retry: RetryPolicy) -> Shared<ScriptedClient> {
    Shared {
        transport: Transport::new(client),
        retry,
        permits: Semaphore::new(4),
    }
}

/// Deterministic policy: 1s, 2s, 4s ... backoff.
fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new()
        .with_max_attempts(max_attempts)
        .with_initial_delay(Duration::from_secs(1))
        .with_jitter_percent(0)
}

fn request(max_attempts: u32) -> SendRequest {
    SendRequest {
        id: 1,
        endpoint: EndpointId::parse(URL).unwrap(),
        payload: EncodedPayload {
            body: br#"{"content":"hi"}"#.to_vec(),
            content_type: "application/json".to_string(),
        },
        submitted_at: Instant::now(),
        attempts: 0,
        max_attempts,
    }
}

async fn run(
    shared: &Shared<ScriptedClient>,
    bucket: &mut RateLimitBucket,
) -> Result<Delivery, DispatchError> {
    let mut request = request(shared.retry.max_attempts);
    RetryController::new(shared, bucket, &mut request, CancellationToken::new())
        .run()
        .await
}

/// Asserts `actual` is `expected`, allowing for timer tick rounding.
fn assert_gap(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(5),
        "expected ~{expected:?}, got {actual:?}"
    );
}

/// Runs the controller on a task so the test can cancel it mid-flight.
fn spawn_run(
    shared: Arc<Shared<ScriptedClient>>,
    mut bucket: RateLimitBucket,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<(Result<Delivery, DispatchError>, RateLimitBucket)> {
    tokio::spawn(async move {
        let mut request = request(shared.retry.max_attempts);
        let outcome = RetryController::new(&shared, &mut bucket, &mut request, cancel)
            .run()
            .await;
        (outcome, bucket)
    })
}

mod outcomes {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt() {
        let shared = shared(ScriptedClient::new(vec![ok()]), policy(3));
        let mut bucket = RateLimitBucket::new();

        let delivery = run(&shared, &mut bucket).await.unwrap();

        assert_eq!(delivery.status, http::StatusCode::OK);
        assert_eq!(delivery.attempts, 1);
        assert_eq!(delivery.body_text(), Some(r#"{"id":"1"}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_is_not_retried() {
        let shared = shared(ScriptedClient::new(vec![status(401), ok()]), policy(5));
        let mut bucket = RateLimitBucket::new();
        let start = Instant::now();

        let err = run(&shared, &mut bucket).await.unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Permanent { attempts: 1, status: Some(s), .. } if s == http::StatusCode::UNAUTHORIZED
        ));
        assert_eq!(shared.transport.client().call_count(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_retries_with_backoff() {
        let client = ScriptedClient::new(vec![status(503), Err(HttpError::Timeout), ok()]);
        let shared = shared(client, policy(3));
        let mut bucket = RateLimitBucket::new();

        let delivery = run(&shared, &mut bucket).await.unwrap();

        assert_eq!(delivery.attempts, 3);
        let calls = shared.transport.client().calls();
        assert_gap(calls[1].at - calls[0].at, Duration::from_secs(1));
        assert_gap(calls[2].at - calls[1].at, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_exhausts_attempts() {
        let client = ScriptedClient::new(vec![status(500), status(502), status(503)]);
        let shared = shared(client, policy(3));
        let mut bucket = RateLimitBucket::new();

        let err = run(&shared, &mut bucket).await.unwrap_err();

        assert!(matches!(err, DispatchError::Transient { attempts: 3, .. }));
        assert!(err.to_string().contains("503"));
        assert_eq!(shared.transport.client().call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_retries_after_server_delay() {
        let client = ScriptedClient::new(vec![too_many_requests(2), ok()]);
        let shared = shared(client, RetryPolicy::new().with_max_attempts(3));
        let mut bucket = RateLimitBucket::new();

        let delivery = run(&shared, &mut bucket).await.unwrap();

        assert_eq!(delivery.attempts, 2);
        let calls = shared.transport.client().calls();
        let gap = calls[1].at - calls[0].at;
        assert!(gap >= Duration::from_secs(2), "retried too early: {gap:?}");
        assert!(gap <= Duration::from_millis(2400), "retried too late: {gap:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_exhausts_attempts() {
        let client = ScriptedClient::new(vec![too_many_requests(1), too_many_requests(3)]);
        let shared = shared(client, policy(2));
        let mut bucket = RateLimitBucket::new();

        let err = run(&shared, &mut bucket).await.unwrap_err();

        assert!(matches!(
            err,
            DispatchError::RateLimited { attempts: 2, retry_after } if retry_after == Duration::from_secs(3)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_request_fails_permanently_without_status() {
        let client = ScriptedClient::new(vec![Err(HttpError::InvalidUrl("bad".to_string()))]);
        let shared = shared(client, policy(3));
        let mut bucket = RateLimitBucket::new();

        let err = run(&shared, &mut bucket).await.unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Permanent {
                attempts: 1,
                status: None,
                ..
            }
        ));
    }
}

mod rate_limit_state {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn limits_learned_from_failed_response() {
        let failing = response(
            500,
            &[("x-ratelimit-remaining", "0"), ("x-ratelimit-reset-after", "3")],
            "",
        );
        let shared = shared(ScriptedClient::new(vec![Ok(failing)]), policy(1));
        let mut bucket = RateLimitBucket::new();

        let _ = run(&shared, &mut bucket).await;

        assert_eq!(bucket.remaining(), Some(0));
        assert_eq!(
            bucket.reset_at(),
            Some(Instant::now() + Duration::from_secs(3))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_response_clamps_bucket() {
        let shared = shared(ScriptedClient::new(vec![too_many_requests(4)]), policy(1));
        let mut bucket = RateLimitBucket::new();

        let _ = run(&shared, &mut bucket).await;

        assert_eq!(bucket.remaining(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_reset_before_attempting() {
        let shared = shared(ScriptedClient::new(vec![ok()]), policy(3));
        let mut bucket = RateLimitBucket::new();
        let start = Instant::now();
        bucket.observe(Some(5), 0, start + Duration::from_secs(5), start);

        run(&shared, &mut bucket).await.unwrap();

        let calls = shared.transport.client().calls();
        assert!(calls[0].at >= start + Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn closed_permits_report_engine_shutdown() {
        let shared = shared(ScriptedClient::new(vec![ok()]), policy(3));
        shared.permits.close();
        let mut bucket = RateLimitBucket::new();

        let err = run(&shared, &mut bucket).await.unwrap_err();

        assert!(matches!(err, DispatchError::EngineShutdown { attempts: 0 }));
        assert_eq!(shared.transport.client().call_count(), 0);
    }
}

mod cancellation {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_makes_no_attempt() {
        let shared = Arc::new(shared(ScriptedClient::new(vec![ok()]), policy(3)));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (outcome, _) = spawn_run(Arc::clone(&shared), RateLimitBucket::new(), cancel)
            .await
            .unwrap();

        assert!(matches!(outcome, Err(DispatchError::Cancelled { attempts: 0 })));
        assert_eq!(shared.transport.client().call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_rate_limit_wait_prevents_attempt() {
        let shared = Arc::new(shared(ScriptedClient::new(vec![ok()]), policy(3)));
        let start = Instant::now();
        let mut bucket = RateLimitBucket::new();
        bucket.observe(Some(1), 0, start + Duration::from_secs(5), start);
        let cancel = CancellationToken::new();

        let task = spawn_run(Arc::clone(&shared), bucket, cancel.clone());
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        let (outcome, _) = task.await.unwrap();

        assert!(matches!(outcome, Err(DispatchError::Cancelled { attempts: 0 })));
        assert_eq!(shared.transport.client().call_count(), 0);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_backoff_stops_retries() {
        let client = ScriptedClient::new(vec![status(503), ok()]);
        let shared = Arc::new(shared(client, policy(3)));
        let cancel = CancellationToken::new();

        let task = spawn_run(Arc::clone(&shared), RateLimitBucket::new(), cancel.clone());
        tokio::time::sleep(Duration::from_millis(500)).await;
        cancel.cancel();
        let (outcome, _) = task.await.unwrap();

        assert!(matches!(outcome, Err(DispatchError::Cancelled { attempts: 1 })));
        assert_eq!(shared.transport.client().call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_attempt_completes_but_is_discarded() {
        let client = ScriptedClient::new(vec![ok_with_limits(5, 0, 10)])
            .with_latency(Duration::from_secs(2));
        let shared = Arc::new(shared(client, policy(3)));
        let cancel = CancellationToken::new();

        let task = spawn_run(Arc::clone(&shared), RateLimitBucket::new(), cancel.clone());
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        let (outcome, bucket) = task.await.unwrap();

        assert!(matches!(outcome, Err(DispatchError::Cancelled { attempts: 1 })));
        assert_eq!(shared.transport.client().call_count(), 1);
        // The response still taught the bucket its state.
        assert_eq!(bucket.remaining(), Some(0));
    }
}

//! Single-attempt delivery and response classification.

use http::header::{CONTENT_TYPE, HeaderValue, USER_AGENT};
use http::{HeaderMap, StatusCode};
use thiserror::Error;

use super::headers::{RateLimitHeaders, RetryHint};
use super::{HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::dispatch::EndpointId;
use crate::encode::EncodedPayload;
use crate::time::{Clock, SystemClock};

/// Default `User-Agent` header value.
pub const DEFAULT_USER_AGENT: &str = concat!("webhook-dispatch/", env!("CARGO_PKG_VERSION"));

/// Why an attempt did not succeed.
#[derive(Debug, Error)]
pub enum FailureCause {
    /// No response was obtained.
    #[error(transparent)]
    Network(#[from] HttpError),

    /// The server answered with a non-success status.
    #[error("HTTP {status}{}", .body.as_deref().map(|b| format!(": {b}")).unwrap_or_default())]
    Status {
        /// Response status code
        status: StatusCode,
        /// Response body, if it was valid UTF-8
        body: Option<String>,
    },
}

impl FailureCause {
    fn from_response(response: &HttpResponse) -> Self {
        Self::Status {
            status: response.status,
            body: response
                .body_text()
                .filter(|b| !b.is_empty())
                .map(ToString::to_string),
        }
    }
}

/// Result of one transport attempt, classified for the retry controller.
#[derive(Debug)]
pub enum SendOutcome {
    /// 2xx.
    Success {
        /// Response status code
        status: StatusCode,
        /// Response body (possibly empty)
        body: Vec<u8>,
    },

    /// 429: the server asked us to slow down.
    RateLimited {
        /// Server-supplied delay
        retry_after: std::time::Duration,
        /// True if the limit is application-wide
        global: bool,
    },

    /// 5xx, timeout, or connection failure: likely to succeed on retry.
    TransientFailure {
        /// What went wrong
        cause: FailureCause,
    },

    /// Any other 4xx, or a request that cannot be built: retrying cannot help.
    PermanentFailure {
        /// Response status, if a response was received
        status: Option<StatusCode>,
        /// What went wrong
        cause: FailureCause,
    },
}

/// A classified attempt plus any bucket state learned from the response.
#[derive(Debug)]
pub struct Classified {
    pub outcome: SendOutcome,
    /// Present whenever the response carried rate-limit headers,
    /// regardless of status code.
    pub limits: Option<RateLimitHeaders>,
}

/// Performs one HTTP POST per call and classifies the result.
///
/// # Type Parameters
///
/// - `H`: The HTTP client implementation
/// - `C`: Wall clock used to interpret absolute reset timestamps
///   (defaults to [`SystemClock`])
#[derive(Debug)]
pub struct Transport<H, C = SystemClock> {
    client: H,
    clock: C,
    headers: HeaderMap,
}

impl<H> Transport<H, SystemClock> {
    /// Creates a transport that sends only the default `User-Agent`.
    #[must_use]
    pub fn new(client: H) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

        Self {
            client,
            clock: SystemClock,
            headers,
        }
    }
}

impl<H, C> Transport<H, C> {
    /// Replaces the wall clock.
    #[must_use]
    pub fn with_clock<C2>(self, clock: C2) -> Transport<H, C2> {
        Transport {
            client: self.client,
            clock,
            headers: self.headers,
        }
    }

    /// Adds headers sent with every request (authorization, custom headers).
    ///
    /// Values replace defaults of the same name.
    #[must_use]
    pub fn with_headers(mut self, headers: &HeaderMap) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// Returns the headers sent with every request.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the underlying HTTP client.
    #[must_use]
    pub const fn client(&self) -> &H {
        &self.client
    }
}

impl<H: HttpClient, C: Clock> Transport<H, C> {
    /// Sends `payload` to `endpoint` once.
    pub async fn send(&self, endpoint: &EndpointId, payload: &EncodedPayload) -> Classified {
        let request = match self.build_request(endpoint, payload) {
            Ok(request) => request,
            Err(e) => return self.classify(Err(e)),
        };

        tracing::debug!(
            "POST {endpoint} ({} bytes, {})",
            payload.len(),
            payload.content_type
        );

        let result = self.client.request(request).await;
        self.classify(result)
    }

    fn build_request(
        &self,
        endpoint: &EndpointId,
        payload: &EncodedPayload,
    ) -> Result<HttpRequest, HttpError> {
        let content_type = HeaderValue::from_str(&payload.content_type)
            .map_err(|e| HttpError::InvalidUrl(format!("content type: {e}")))?;

        Ok(HttpRequest::post(endpoint.request_url())
            .with_headers(&self.headers)
            .with_header(CONTENT_TYPE, content_type)
            .with_body(payload.body.clone()))
    }

    /// Maps a raw HTTP result onto [`SendOutcome`].
    ///
    /// | Result | Outcome |
    /// |--------|---------|
    /// | 2xx | `Success` |
    /// | 429 | `RateLimited` |
    /// | 5xx, timeout, connection error | `TransientFailure` |
    /// | other 4xx / 1xx / 3xx, invalid request | `PermanentFailure` |
    pub fn classify(&self, result: Result<HttpResponse, HttpError>) -> Classified {
        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_transient() => {
                return Classified {
                    outcome: SendOutcome::TransientFailure { cause: e.into() },
                    limits: None,
                };
            }
            Err(e) => {
                return Classified {
                    outcome: SendOutcome::PermanentFailure {
                        status: None,
                        cause: e.into(),
                    },
                    limits: None,
                };
            }
        };

        let limits = RateLimitHeaders::parse(&response, self.clock.now());
        let status = response.status;

        let outcome = if status.is_success() {
            SendOutcome::Success {
                status,
                body: response.body,
            }
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            let hint = RetryHint::from_response(&response);
            SendOutcome::RateLimited {
                retry_after: hint.retry_after,
                global: hint.global,
            }
        } else if status.is_server_error() {
            SendOutcome::TransientFailure {
                cause: FailureCause::from_response(&response),
            }
        } else {
            SendOutcome::PermanentFailure {
                status: Some(status),
                cause: FailureCause::from_response(&response),
            }
        };

        Classified { outcome, limits }
    }
}

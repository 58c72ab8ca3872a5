//! Wire-level request and response values, and the client seam the
//! transport sends through.

use super::HttpError;

/// One webhook delivery attempt as it goes on the wire.
///
/// Built by the transport from an endpoint and an encoded payload; clients
/// only have to put it on the network.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: http::Method,
    /// Endpoint URL, including the route query parameter if any
    pub url: url::Url,
    pub headers: http::HeaderMap,
    /// Encoded payload; `None` only for requests built outside the transport
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Starts a `POST` to `url` with no headers and no body.
    #[must_use]
    pub fn post(url: url::Url) -> Self {
        Self {
            method: http::Method::POST,
            url,
            headers: http::HeaderMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Appends `value` under `name`, keeping earlier values.
    #[must_use]
    pub fn with_header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Applies configured endpoint headers, each overriding any value
    /// already set under the same name.
    #[must_use]
    pub fn with_headers(mut self, headers: &http::HeaderMap) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }
}

/// What the endpoint answered, with the body read in full.
///
/// Classification needs the status, the rate-limit headers, and for 429s
/// and rejections the JSON body, so nothing is streamed.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: http::StatusCode,
    pub headers: http::HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub const fn new(status: http::StatusCode, headers: http::HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Body as UTF-8, for error messages and 429 parsing.
    #[must_use]
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Looks up a header by case-insensitive name and trims it.
    ///
    /// Values that are not visible ASCII are treated as absent.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    }
}

/// Puts one [`HttpRequest`] on the network.
///
/// [`ReqwestClient`](super::ReqwestClient) is the production client; the
/// dispatch tests drive the engine with scripted ones.
///
/// ```ignore
/// use webhook_dispatch::webhook::{HttpClient, HttpError, HttpRequest, HttpResponse};
///
/// struct AlwaysNoContent;
///
/// impl HttpClient for AlwaysNoContent {
///     async fn request(&self, _req: HttpRequest) -> Result<HttpResponse, HttpError> {
///         Ok(HttpResponse::new(
///             http::StatusCode::NO_CONTENT,
///             http::HeaderMap::new(),
///             Vec::new(),
///         ))
///     }
/// }
/// ```
pub trait HttpClient: Send + Sync {
    /// Sends `req` and buffers the answer.
    ///
    /// A 4xx or 5xx answer is still `Ok`: deciding what it means is the
    /// transport's job.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] only when no response was obtained: the
    /// connection failed, the request timed out, or it could not be built.
    fn request(
        &self,
        req: HttpRequest,
    ) -> impl std::future::Future<Output = Result<HttpResponse, HttpError>> + Send;
}

/// Lets one client be shared by an engine and the code that built it.
impl<T: HttpClient> HttpClient for std::sync::Arc<T> {
    async fn request(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        (**self).request(req).await
    }
}

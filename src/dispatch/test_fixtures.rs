//! Scripted HTTP client and response helpers shared by dispatch tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::webhook::{HttpClient, HttpError, HttpRequest, HttpResponse};

pub const URL: &str = "https://discord.com/api/webhooks/1/token";
pub const OTHER_URL: &str = "https://discord.com/api/webhooks/2/token";

/// One request as seen by [`ScriptedClient`].
#[derive(Debug, Clone)]
pub struct Call {
    pub at: Instant,
    pub url: url::Url,
    pub body: Vec<u8>,
}

/// Mock client replaying a fixed script of results.
///
/// Once the script runs out every request gets `204 No Content`.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    calls: Mutex<Vec<Call>>,
    latency: Duration,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<HttpResponse, HttpError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Delays every response by `latency`.
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Request bodies as UTF-8, in arrival order.
    pub fn bodies(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| String::from_utf8(c.body).unwrap())
            .collect()
    }
}

impl HttpClient for ScriptedClient {
    async fn request(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                at: Instant::now(),
                url: req.url.clone(),
                body: req.body.clone().unwrap_or_default(),
            });
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(response(204, &[], "")))
    }
}

pub fn response(status: u16, headers: &[(&'static str, &str)], body: &str) -> HttpResponse {
    let mut map = http::HeaderMap::new();
    for (name, value) in headers {
        map.insert(*name, http::HeaderValue::from_str(value).unwrap());
    }
    HttpResponse::new(
        http::StatusCode::from_u16(status).unwrap(),
        map,
        body.as_bytes().to_vec(),
    )
}

pub fn ok() -> Result<HttpResponse, HttpError> {
    Ok(response(200, &[], r#"{"id":"1"}"#))
}

/// 2xx response reporting bucket state.
pub fn ok_with_limits(
    limit: u32,
    remaining: u32,
    reset_after_secs: u32,
) -> Result<HttpResponse, HttpError> {
    let limit = limit.to_string();
    let remaining = remaining.to_string();
    let reset_after = reset_after_secs.to_string();
    Ok(response(
        200,
        &[
            ("x-ratelimit-limit", limit.as_str()),
            ("x-ratelimit-remaining", remaining.as_str()),
            ("x-ratelimit-reset-after", reset_after.as_str()),
        ],
        "",
    ))
}

pub fn too_many_requests(retry_after_secs: u32) -> Result<HttpResponse, HttpError> {
    let retry_after = retry_after_secs.to_string();
    Ok(response(429, &[("retry-after", retry_after.as_str())], ""))
}

pub fn status(code: u16) -> Result<HttpResponse, HttpError> {
    Ok(response(code, &[], ""))
}

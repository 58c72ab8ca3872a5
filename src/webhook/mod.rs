//! Webhook transport layer.
//!
//! This module provides types and traits for:
//! - Building HTTP requests ([`HttpRequest`])
//! - Handling HTTP responses ([`HttpResponse`])
//! - Abstracting HTTP clients ([`HttpClient`])
//! - Production HTTP client implementation ([`ReqwestClient`])
//! - Single-attempt delivery and classification ([`Transport`], [`SendOutcome`])
//! - Rate-limit header parsing ([`RateLimitHeaders`], [`RetryHint`])

mod client;
mod error;
pub mod headers;
mod request;
mod transport;


pub use client::ReqwestClient;
pub use error::HttpError;
pub use headers::{RateLimitHeaders, RetryHint};
pub use request::{HttpClient, HttpRequest, HttpResponse};
pub use transport::{Classified, DEFAULT_USER_AGENT, FailureCause, SendOutcome, Transport};

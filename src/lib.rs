//! webhook-dispatch: rate-limited webhook delivery
//!
//! A library for delivering structured messages to chat-platform webhooks
//! (Discord-compatible) while honouring the server's rate-limit headers,
//! preserving per-endpoint ordering, and retrying transient failures.

pub mod config;
pub mod dispatch;
pub mod encode;
pub mod message;
pub mod time;
pub mod webhook;

//! TOML configuration file parsing.
//!
//! Defines the structure of the configuration file with serde.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

/// Root configuration structure from TOML file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Webhook endpoint and identity section
    #[serde(default)]
    pub webhook: WebhookSection,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetrySection,

    /// Dispatch engine configuration
    #[serde(default)]
    pub dispatch: DispatchSection,
}

/// Webhook configuration section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookSection {
    /// Webhook URL
    pub url: Option<String>,

    /// Thread to post into (sent as `thread_id`)
    pub thread_id: Option<String>,

    /// HTTP headers as key-value pairs
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Bearer token for Authorization header
    pub bearer: Option<String>,

    /// Username override for posted messages
    pub username: Option<String>,

    /// Avatar URL override for posted messages
    pub avatar_url: Option<String>,

    /// Reject URLs that are not Discord webhook URLs
    #[serde(default)]
    pub discord_only: bool,
}

/// Retry policy configuration section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    /// Maximum number of attempts per message
    pub max_attempts: Option<u32>,

    /// Initial retry delay in milliseconds
    pub initial_delay_ms: Option<u64>,

    /// Maximum retry delay in milliseconds
    pub max_delay_ms: Option<u64>,

    /// Backoff multiplier
    pub multiplier: Option<f64>,

    /// Random jitter applied to delays, in percent
    pub jitter_percent: Option<u8>,
}

/// Dispatch engine configuration section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchSection {
    /// Maximum transport attempts in flight
    pub max_concurrent: Option<usize>,

    /// Per-request timeout in seconds
    pub request_timeout: Option<u64>,

    /// "optimistic" or "probe"
    pub stale_policy: Option<String>,

    /// Minimum spacing between sends to one endpoint, in milliseconds
    pub min_send_interval_ms: Option<u64>,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a default configuration file with comments.
#[must_use]
pub fn default_config_template() -> String {
    r#"# webhook-dispatch configuration file

[webhook]
# Webhook URL (required unless given with --url)
# url = "https://discord.com/api/webhooks/123/token"

# Post into a thread of the channel (sent as ?thread_id=...)
# thread_id = "123456789"

# Override the webhook's display name and avatar
# username = "Deploy Bot"
# avatar_url = "https://example.com/avatar.png"

# HTTP headers
# [webhook.headers]
# X-Custom-Header = "value"

# Bearer token for Authorization header
# bearer = "your-token-here"

# Only accept Discord webhook URLs
# discord_only = false

[retry]
# Maximum number of attempts per message (default: 3)
# max_attempts = 3

# Initial retry delay in milliseconds (default: 1000)
# initial_delay_ms = 1000

# Maximum retry delay in milliseconds (default: 30000)
# max_delay_ms = 30000

# Backoff multiplier (default: 2.0)
# multiplier = 2.0

# Random jitter in percent (default: 20)
# jitter_percent = 20

[dispatch]
# Maximum requests in flight across all endpoints (default: 8)
# max_concurrent = 8

# Per-request timeout in seconds (default: 10)
# request_timeout = 10

# What to assume when a rate-limit window expires unconfirmed:
# "optimistic" (refill to the last known limit) or "probe" (one request at a time)
# stale_policy = "optimistic"

# Minimum spacing between messages to the same endpoint in milliseconds (0 = off)
# min_send_interval_ms = 0
"#
    .to_string()
}

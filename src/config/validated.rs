//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use http::HeaderMap;
use http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use regex::Regex;
use url::Url;

use crate::dispatch::{EndpointId, EngineConfig, RetryPolicy, StalePolicy};
use crate::message::{Embed, WebhookMessage};

use super::cli::Cli;
use super::defaults;
use super::error::{ConfigError, field};
use super::toml::TomlConfig;

/// Shape of a Discord webhook URL (`discord.com` or the legacy
/// `discordapp.com`, numeric id, token, optional query).
static DISCORD_WEBHOOK_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https://discord(?:app)?\.com/api/webhooks/\d+/[\w-]+(?:\?[\w&=%-]*)?$")
        .unwrap_or_else(|e| unreachable!("static pattern is valid: {e}"))
});

/// Upper bound for millisecond durations read from config (one hour).
const MAX_DELAY_MS: u64 = 60 * 60 * 1000;

/// Fully validated configuration ready for use by the application.
///
/// This struct represents a complete, validated configuration where all
/// required fields are present and all values have been validated.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args and optional TOML config.
/// The function validates all inputs and returns errors for invalid configurations.
#[derive(Debug)]
pub struct ValidatedConfig {
    /// Destination webhook (URL plus optional thread)
    pub endpoint: EndpointId,

    /// Extra HTTP headers for every request
    pub headers: HeaderMap,

    /// Username override
    pub username: Option<String>,

    /// Avatar URL override
    pub avatar_url: Option<String>,

    /// Message text from the command line
    pub content: Option<String>,

    /// Embed from the command line
    pub embed: Option<Embed>,

    /// Files to upload with the message
    pub files: Vec<PathBuf>,

    /// Read one message per line from stdin
    pub stdin: bool,

    /// Dispatch engine settings
    pub engine: EngineConfig,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Dry-run mode (encode and print without sending)
    pub dry_run: bool,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Config {{ endpoint: {}, retry: {}x/{}ms, max_concurrent: {}, stale_policy: {}, \
             min_send_interval: {}ms, timeout: {}s, files: {}, stdin: {}, dry_run: {} }}",
            self.endpoint,
            self.engine.retry.max_attempts,
            self.engine.retry.initial_delay.as_millis(),
            self.engine.max_concurrent,
            self.engine.stale_policy,
            self.engine.min_send_interval.as_millis(),
            self.request_timeout.as_secs(),
            self.files.len(),
            self.stdin,
            self.dry_run,
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// CLI arguments take precedence over TOML config values.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required fields are missing (`url`, message content)
    /// - URL is invalid, or not a Discord webhook URL when `discord_only` is set
    /// - Header format is invalid
    /// - Embed color is invalid
    /// - Retry, concurrency, or duration values are out of range
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let endpoint = Self::resolve_endpoint(cli, toml)?;
        let headers = Self::resolve_headers(cli, toml)?;
        let avatar_url = Self::resolve_avatar_url(cli, toml)?;
        let embed = Self::resolve_embed(cli)?;

        if !cli.stdin && cli.content.is_none() && embed.is_none() && cli.files.is_empty() {
            return Err(ConfigError::missing(
                field::CONTENT,
                "Use --content, --embed-title, --embed-description, --file or --stdin",
            ));
        }

        Ok(Self {
            endpoint,
            headers,
            username: cli
                .username
                .clone()
                .or_else(|| toml.and_then(|t| t.webhook.username.clone())),
            avatar_url,
            content: cli.content.clone(),
            embed,
            files: cli.files.clone(),
            stdin: cli.stdin,
            engine: Self::build_engine_config(cli, toml)?,
            request_timeout: Self::resolve_request_timeout(toml)?,
            dry_run: cli.dry_run,
            verbose: cli.verbose,
        })
    }

    /// Loads and merges configuration from CLI and optional config file.
    ///
    /// If `cli.config` is set, loads the TOML file from that path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = if let Some(ref path) = cli.config {
            Some(TomlConfig::load(path)?)
        } else {
            None
        };

        Self::from_raw(cli, toml.as_ref())
    }

    /// Builds the message described by the command line, with `content`
    /// replacing the configured text when given.
    ///
    /// Files are not attached here; they are read at send time.
    #[must_use]
    pub fn message(&self, content: Option<&str>) -> WebhookMessage {
        let mut message = WebhookMessage::new();
        if let Some(text) = content.or(self.content.as_deref()) {
            message = message.with_content(text);
        }
        if let Some(username) = &self.username {
            message = message.with_username(username.as_str());
        }
        if let Some(avatar_url) = &self.avatar_url {
            message = message.with_avatar_url(avatar_url.as_str());
        }
        if let Some(embed) = &self.embed {
            message = message.with_embed(embed.clone());
        }
        message
    }

    fn resolve_endpoint(cli: &Cli, toml: Option<&TomlConfig>) -> Result<EndpointId, ConfigError> {
        // CLI takes precedence
        let url_str = cli
            .url
            .as_deref()
            .or_else(|| toml.and_then(|t| t.webhook.url.as_deref()))
            .ok_or_else(|| {
                ConfigError::missing(field::URL, "Use --url or set webhook.url in config file")
            })?
            .trim();

        let url = parse_url(url_str)?;

        let discord_only = cli.discord_only || toml.is_some_and(|t| t.webhook.discord_only);
        if discord_only && !is_discord_webhook_url(url_str) {
            return Err(ConfigError::InvalidUrl {
                url: url_str.to_string(),
                reason: "not a Discord webhook URL".to_string(),
            });
        }

        let thread_id = cli
            .thread_id
            .as_deref()
            .or_else(|| toml.and_then(|t| t.webhook.thread_id.as_deref()));

        let endpoint = EndpointId::new(url);
        Ok(match thread_id {
            Some(id) => endpoint.with_route(id),
            None => endpoint,
        })
    }

    fn resolve_headers(cli: &Cli, toml: Option<&TomlConfig>) -> Result<HeaderMap, ConfigError> {
        let mut headers = HeaderMap::new();

        // Add TOML headers first (CLI can override)
        if let Some(toml) = toml {
            for (name, value) in &toml.webhook.headers {
                let header_name = parse_header_name(name)?;
                let header_value = parse_header_value(name, value)?;
                headers.insert(header_name, header_value);
            }
        }

        // Add CLI headers (override TOML)
        for header_str in &cli.headers {
            let (name, value) = parse_header_string(header_str)?;
            let header_name = parse_header_name(&name)?;
            let header_value = parse_header_value(&name, &value)?;
            headers.insert(header_name, header_value);
        }

        // Handle bearer token (CLI wins, then TOML)
        let bearer = cli
            .bearer
            .as_deref()
            .or_else(|| toml.and_then(|t| t.webhook.bearer.as_deref()));

        if let Some(token) = bearer {
            let auth_value = format!("Bearer {token}");
            let header_value = parse_header_value("Authorization", &auth_value)?;
            headers.insert(AUTHORIZATION, header_value);
        }

        Ok(headers)
    }

    fn resolve_avatar_url(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<Option<String>, ConfigError> {
        let avatar = cli
            .avatar_url
            .as_deref()
            .or_else(|| toml.and_then(|t| t.webhook.avatar_url.as_deref()));

        avatar
            .map(|s| parse_url(s).map(|_| s.to_string()))
            .transpose()
    }

    fn resolve_embed(cli: &Cli) -> Result<Option<Embed>, ConfigError> {
        let color = cli.embed_color.as_deref().map(parse_color).transpose()?;

        if cli.embed_title.is_none() && cli.embed_description.is_none() {
            return Ok(None);
        }

        let mut embed = Embed::new();
        if let Some(title) = &cli.embed_title {
            embed = embed.with_title(title.as_str());
        }
        if let Some(description) = &cli.embed_description {
            embed = embed.with_description(description.as_str());
        }
        if let Some(color) = color {
            embed = embed.with_color(color);
        }
        Ok(Some(embed))
    }

    fn build_engine_config(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<EngineConfig, ConfigError> {
        let dispatch = toml.map(|t| &t.dispatch);

        let max_concurrent = cli
            .max_concurrent
            .or_else(|| dispatch.and_then(|d| d.max_concurrent))
            .unwrap_or(defaults::MAX_CONCURRENT);
        if max_concurrent == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }

        let stale_policy = match cli.stale_policy {
            Some(arg) => arg.into(),
            None => dispatch
                .and_then(|d| d.stale_policy.as_deref())
                .unwrap_or(defaults::STALE_POLICY)
                .parse::<StalePolicy>()?,
        };

        let min_send_interval_ms = dispatch
            .and_then(|d| d.min_send_interval_ms)
            .unwrap_or(defaults::MIN_SEND_INTERVAL_MS);
        check_max_ms("min_send_interval_ms", min_send_interval_ms)?;

        Ok(EngineConfig {
            retry: Self::build_retry_policy(cli, toml)?,
            max_concurrent,
            stale_policy,
            min_send_interval: Duration::from_millis(min_send_interval_ms),
            ..EngineConfig::default()
        })
    }

    fn build_retry_policy(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<RetryPolicy, ConfigError> {
        let retry = toml.map(|t| &t.retry);

        // Priority: CLI explicit > TOML > default
        let max_attempts = cli
            .retry_max
            .or_else(|| retry.and_then(|r| r.max_attempts))
            .unwrap_or(defaults::RETRY_MAX_ATTEMPTS);

        let initial_delay_ms = cli
            .retry_delay_ms
            .or_else(|| retry.and_then(|r| r.initial_delay_ms))
            .unwrap_or(defaults::RETRY_INITIAL_DELAY_MS);

        let max_delay_ms = retry
            .and_then(|r| r.max_delay_ms)
            .unwrap_or(defaults::RETRY_MAX_DELAY_MS);

        let multiplier = retry
            .and_then(|r| r.multiplier)
            .unwrap_or(defaults::RETRY_MULTIPLIER);

        let jitter_percent = retry
            .and_then(|r| r.jitter_percent)
            .unwrap_or(defaults::RETRY_JITTER_PERCENT);

        if max_attempts == 0 {
            return Err(ConfigError::InvalidRetry(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if initial_delay_ms == 0 {
            return Err(ConfigError::InvalidRetry(
                "initial_delay_ms must be greater than 0".to_string(),
            ));
        }

        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(ConfigError::InvalidRetry(format!(
                "multiplier ({multiplier}) must be a finite number >= 1.0"
            )));
        }

        if jitter_percent > RetryPolicy::MAX_JITTER_PERCENT {
            return Err(ConfigError::InvalidRetry(format!(
                "jitter_percent ({jitter_percent}) must be at most 100"
            )));
        }

        if max_delay_ms < initial_delay_ms {
            return Err(ConfigError::InvalidRetry(format!(
                "max_delay_ms ({max_delay_ms}) must be >= initial_delay_ms ({initial_delay_ms})"
            )));
        }
        check_max_ms("max_delay_ms", max_delay_ms)?;

        Ok(RetryPolicy::new()
            .with_max_attempts(max_attempts)
            .with_initial_delay(Duration::from_millis(initial_delay_ms))
            .with_max_delay(Duration::from_millis(max_delay_ms))
            .with_multiplier(multiplier)
            .with_jitter_percent(jitter_percent))
    }

    fn resolve_request_timeout(toml: Option<&TomlConfig>) -> Result<Duration, ConfigError> {
        let seconds = toml
            .and_then(|t| t.dispatch.request_timeout)
            .unwrap_or(defaults::REQUEST_TIMEOUT_SECS);

        if seconds == 0 {
            return Err(ConfigError::InvalidDuration {
                field: "request_timeout",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(Duration::from_secs(seconds))
    }
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Returns true if `url` looks like a Discord webhook URL.
#[must_use]
pub fn is_discord_webhook_url(url: &str) -> bool {
    DISCORD_WEBHOOK_URL.is_match(url.trim())
}

// Helper functions

fn parse_url(s: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(s).map_err(|e| ConfigError::InvalidUrl {
        url: s.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            url: s.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}

fn parse_color(s: &str) -> Result<u32, ConfigError> {
    let trimmed = s.trim();
    let hex = trimmed
        .strip_prefix('#')
        .or_else(|| trimmed.strip_prefix("0x"))
        .or_else(|| trimmed.strip_prefix("0X"));

    let parsed = match hex {
        Some(digits) => u32::from_str_radix(digits, 16).ok(),
        None => trimmed.parse::<u32>().ok(),
    };

    parsed
        .filter(|c| *c <= 0x00FF_FFFF)
        .ok_or_else(|| ConfigError::InvalidColor {
            value: s.to_string(),
        })
}

fn check_max_ms(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value > MAX_DELAY_MS {
        return Err(ConfigError::InvalidDuration {
            field,
            reason: format!("{value}ms exceeds the maximum of {MAX_DELAY_MS}ms"),
        });
    }
    Ok(())
}

fn parse_header_string(s: &str) -> Result<(String, String), ConfigError> {
    // Try "Key=Value" format first
    if let Some((name, value)) = s.split_once('=') {
        return Ok((name.trim().to_string(), value.trim().to_string()));
    }

    // Try "Key: Value" format
    if let Some((name, value)) = s.split_once(':') {
        return Ok((name.trim().to_string(), value.trim().to_string()));
    }

    Err(ConfigError::InvalidHeader {
        value: s.to_string(),
    })
}

fn parse_header_name(name: &str) -> Result<HeaderName, ConfigError> {
    name.parse::<HeaderName>()
        .map_err(|e| ConfigError::InvalidHeaderName {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

fn parse_header_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeaderValue {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

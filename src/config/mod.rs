//! Configuration layer for webhook-dispatch.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML configuration file parsing ([`TomlConfig`])
//! - Validated configuration ([`ValidatedConfig`])
//! - Configuration file generation ([`write_default_config`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Configuration values are resolved with the following priority (highest to lowest):
//!
//! 1. **Explicit CLI arguments** - Values explicitly passed via command line
//! 2. **TOML config file** - Values from the configuration file
//! 3. **Built-in defaults** - Hardcoded default values
//!
//! Headers are merged: TOML headers are applied first, then `--header` values
//! replace entries with the same name, then a bearer token sets `Authorization`.
//!
//! # Boolean Flag Semantics
//!
//! `discord_only` uses OR semantics: if set in either CLI or TOML, URLs must
//! match the Discord webhook shape.
//!
//! # CLI-Only vs TOML-Only Options
//!
//! Message content (`--content`, `--embed-*`, `--file`, `--stdin`) is CLI-only.
//!
//! Some options are TOML-only:
//! - `retry.max_delay_ms`, `retry.multiplier`, `retry.jitter_percent`
//! - `dispatch.request_timeout`, `dispatch.min_send_interval_ms`

mod cli;
pub mod defaults;
mod error;
mod toml;
mod validated;

#[cfg(test)]
mod toml_tests;
#[cfg(test)]
mod validated_tests;

pub use cli::{Cli, Command, StalePolicyArg};
pub use error::{ConfigError, field};
pub use toml::{TomlConfig, default_config_template};
pub use validated::{ValidatedConfig, is_discord_webhook_url, write_default_config};

//! Tests for validated configuration.

use super::ConfigError;
use super::cli::Cli;
use super::toml::TomlConfig;
use super::validated::ValidatedConfig;

/// Helper to create CLI args from a slice
fn cli(args: &[&str]) -> Cli {
    let mut full_args = vec!["webhook-dispatch"];
    full_args.extend(args);
    Cli::parse_from_iter(full_args)
}

/// Helper to parse TOML config
fn toml(content: &str) -> TomlConfig {
    TomlConfig::parse(content).unwrap()
}

/// CLI args for the smallest valid send
fn minimal(extra: &[&str]) -> Cli {
    let mut args = vec!["--url", "https://example.com/hook", "--content", "hi"];
    args.extend(extra);
    cli(&args)
}

mod loading_tests;

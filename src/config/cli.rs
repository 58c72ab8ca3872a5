//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::dispatch::StalePolicy;

/// webhook-dispatch: rate-limited webhook sender
///
/// Builds a message from the command line (or one message per stdin line)
/// and delivers it to a chat webhook, honouring the server's rate limits.
#[derive(Debug, Parser)]
#[command(name = "webhook-dispatch")]
#[command(version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)] // CLI flags are naturally boolean
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Webhook URL (required for send mode)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Thread to post into
    #[arg(long = "thread-id")]
    pub thread_id: Option<String>,

    /// HTTP headers in 'Key=Value' or 'Key: Value' format (can be specified multiple times)
    #[arg(long = "header", value_name = "K=V")]
    pub headers: Vec<String>,

    /// Bearer token for Authorization header
    #[arg(long)]
    pub bearer: Option<String>,

    /// Username override for the message
    #[arg(long)]
    pub username: Option<String>,

    /// Avatar URL override for the message
    #[arg(long = "avatar-url")]
    pub avatar_url: Option<String>,

    /// Message text
    #[arg(long)]
    pub content: Option<String>,

    /// Title of an embed to attach
    #[arg(long = "embed-title")]
    pub embed_title: Option<String>,

    /// Description of an embed to attach
    #[arg(long = "embed-description")]
    pub embed_description: Option<String>,

    /// Embed color as '#RRGGBB', '0xRRGGBB' or decimal
    #[arg(long = "embed-color", value_name = "COLOR")]
    pub embed_color: Option<String>,

    /// File to upload (can be specified multiple times)
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Send one message per non-empty line read from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Only accept Discord webhook URLs
    #[arg(long = "discord-only")]
    pub discord_only: bool,

    /// Maximum number of attempts per message
    #[arg(long = "retry-max")]
    pub retry_max: Option<u32>,

    /// Initial retry delay in milliseconds
    #[arg(long = "retry-delay-ms")]
    pub retry_delay_ms: Option<u64>,

    /// Maximum requests in flight
    #[arg(long = "max-concurrent")]
    pub max_concurrent: Option<usize>,

    /// Behaviour when a rate-limit window expires unconfirmed
    #[arg(long = "stale-policy", value_enum)]
    pub stale_policy: Option<StalePolicyArg>,

    /// Path to configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Validate and print the encoded payload without sending
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,
}

/// Subcommands for webhook-dispatch
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a default configuration file
    Init {
        /// Output path for the configuration file
        #[arg(long, short, default_value = "webhook-dispatch.toml")]
        output: PathBuf,
    },
}

/// Stale policy argument for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StalePolicyArg {
    /// Assume the window refilled to its last known limit
    Optimistic,
    /// Send one request, then pace until the server reports fresh state
    Probe,
}

impl From<StalePolicyArg> for StalePolicy {
    fn from(arg: StalePolicyArg) -> Self {
        match arg {
            StalePolicyArg::Optimistic => Self::Optimistic,
            StalePolicyArg::Probe => Self::Probe,
        }
    }
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }

    /// Returns true if this is the init command.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Some(Command::Init { .. }))
    }
}

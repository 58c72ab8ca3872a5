//! Application execution logic.
//!
//! Builds the messages described by the configuration, hands them to the
//! dispatch engine, and reports each outcome in submission order.

use std::future::Future;
use std::io::BufRead;
use std::path::PathBuf;

use thiserror::Error;
use tokio::signal;

use webhook_dispatch::config::ValidatedConfig;
use webhook_dispatch::dispatch::{Delivery, DispatchEngine, DispatchError, EndpointId, SendHandle};
use webhook_dispatch::encode::{EncodedPayload, EncodingError, PayloadEncoder};
use webhook_dispatch::message::{Attachment, WebhookMessage};
use webhook_dispatch::time::Clock;
use webhook_dispatch::webhook::{HttpClient, HttpError, ReqwestClient, Transport};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// Failed to build the HTTP client.
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] HttpError),

    /// Failed to read a file to upload.
    #[error("Failed to read attachment '{}': {source}", path.display())]
    Attachment {
        /// Path given with `--file`
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to read messages from stdin.
    #[error("Failed to read stdin: {0}")]
    Stdin(#[source] std::io::Error),

    /// A message violates payload limits.
    #[error("Message {index} is invalid: {source}")]
    Encoding {
        /// 1-based position of the message
        index: usize,
        /// What the encoder rejected
        #[source]
        source: EncodingError,
    },

    /// Some messages were not delivered.
    #[error("{failed} of {total} message(s) were not delivered")]
    Undelivered {
        /// Messages that ended in an error
        failed: usize,
        /// Messages submitted
        total: usize,
    },
}

/// Per-run delivery tally.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Report {
    delivered: usize,
    failed: usize,
}

impl Report {
    const fn total(self) -> usize {
        self.delivered + self.failed
    }

    const fn into_result(self) -> Result<(), RunError> {
        if self.failed == 0 {
            Ok(())
        } else {
            Err(RunError::Undelivered {
                failed: self.failed,
                total: self.total(),
            })
        }
    }
}

/// Executes one run: build, send, and report every message.
///
/// # Errors
///
/// Returns an error if:
/// - The HTTP client cannot be created
/// - An attachment or stdin cannot be read
/// - A message violates payload limits (nothing is sent in that case)
/// - Any message ends undelivered
///
/// # Coverage Note
///
/// This function is excluded from coverage because it requires real
/// network access and signal handling.
#[cfg(not(tarpaulin_include))]
pub async fn execute(config: ValidatedConfig) -> Result<(), RunError> {
    let lines = if config.stdin {
        Some(read_stdin_lines().await?)
    } else {
        None
    };
    let messages = build_messages(&config, lines)?;
    let payloads = encode_all(&config, &messages)?;

    if config.dry_run {
        tracing::info!("Dry-run mode enabled - payloads will be printed but not sent");
        print_payloads(&config.endpoint, &payloads);
        return Ok(());
    }

    let client = ReqwestClient::with_timeout(config.request_timeout).map_err(RunError::Client)?;
    let transport = Transport::new(client).with_headers(&config.headers);
    let engine = DispatchEngine::with_transport(transport, config.engine.clone());

    let report = deliver(&engine, &config.endpoint, payloads, shutdown_signal()).await;
    engine.shutdown().await;

    tracing::info!(
        "{} of {} message(s) delivered",
        report.delivered,
        report.total()
    );
    report.into_result()
}

/// Builds the messages to send.
///
/// Without `lines`, one message is built from the command line. With
/// `lines`, each non-blank line becomes the content of one message. Files
/// are attached to every message.
fn build_messages(
    config: &ValidatedConfig,
    lines: Option<Vec<String>>,
) -> Result<Vec<WebhookMessage>, RunError> {
    let attachments = config
        .files
        .iter()
        .map(|path| {
            Attachment::from_path(path).map_err(|source| RunError::Attachment {
                path: path.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let messages = match lines {
        None => vec![config.message(None)],
        Some(lines) => lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(|line| config.message(Some(line)))
            .collect(),
    };

    Ok(messages
        .into_iter()
        .map(|message| {
            attachments
                .iter()
                .cloned()
                .fold(message, WebhookMessage::with_attachment)
        })
        .collect())
}

/// Reads all of stdin as lines without blocking the runtime.
async fn read_stdin_lines() -> Result<Vec<String>, RunError> {
    let read = tokio::task::spawn_blocking(|| read_lines(std::io::stdin().lock())).await;

    match read {
        Ok(lines) => lines.map_err(RunError::Stdin),
        Err(e) => Err(RunError::Stdin(std::io::Error::other(e))),
    }
}

fn read_lines(input: impl BufRead) -> std::io::Result<Vec<String>> {
    input.lines().collect()
}

/// Encodes every message up front so that an invalid one stops the run
/// before anything is sent.
fn encode_all(
    config: &ValidatedConfig,
    messages: &[WebhookMessage],
) -> Result<Vec<EncodedPayload>, RunError> {
    let encoder = PayloadEncoder::new(config.engine.limits.clone());

    messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            encoder.encode(message).map_err(|source| RunError::Encoding {
                index: i + 1,
                source,
            })
        })
        .collect()
}

/// Writes each payload to stdout.
fn print_payloads(endpoint: &EndpointId, payloads: &[EncodedPayload]) {
    let url = endpoint.request_url();

    for (i, payload) in payloads.iter().enumerate() {
        println!(
            "# {} -> {url} ({}, {} bytes)",
            i + 1,
            payload.content_type,
            payload.len()
        );
        println!("{}", String::from_utf8_lossy(&payload.body));
    }
}

/// Submits every payload to one endpoint and awaits the outcomes in order.
///
/// When `shutdown` completes, every send that has not finished is
/// cancelled; the remaining handles then resolve promptly.
async fn deliver<H, C>(
    engine: &DispatchEngine<H, C>,
    endpoint: &EndpointId,
    payloads: Vec<EncodedPayload>,
    shutdown: impl Future<Output = ()>,
) -> Report
where
    H: HttpClient + 'static,
    C: Clock + 'static,
{
    let handles: Vec<_> = payloads
        .into_iter()
        .map(|payload| engine.submit_encoded(endpoint.clone(), payload))
        .collect();

    let tokens: Vec<_> = handles
        .iter()
        .map(SendHandle::cancellation_token)
        .collect();

    tokio::pin!(shutdown);
    let mut shutting_down = false;
    let mut report = Report::default();

    for (index, mut handle) in (1..).zip(handles) {
        let outcome = loop {
            tokio::select! {
                biased;

                () = &mut shutdown, if !shutting_down => {
                    tracing::info!("Shutdown signal received, cancelling pending sends...");
                    shutting_down = true;
                    for token in &tokens {
                        token.cancel();
                    }
                }

                outcome = &mut handle => break outcome,
            }
        };
        record(&mut report, index, &handle, outcome);
    }

    report
}

fn record(
    report: &mut Report,
    index: usize,
    handle: &SendHandle,
    outcome: Result<Delivery, DispatchError>,
) {
    match outcome {
        Ok(delivery) => {
            report.delivered += 1;
            tracing::debug!(
                "Message {index} (request #{}) delivered: {} after {} attempt(s)",
                handle.id(),
                delivery.status,
                delivery.attempts
            );
        }
        Err(e) => {
            report.failed += 1;
            tracing::debug!("Message {index} (request #{}) not delivered: {e}", handle.id());
        }
    }
}

/// Returns a future that completes when a shutdown signal is received.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

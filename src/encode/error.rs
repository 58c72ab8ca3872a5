//! Error types for payload encoding.

use thiserror::Error;

/// A message that cannot be delivered as-is.
///
/// Encoding errors are detected before a message is queued, so they never
/// consume rate-limit budget and are never retried.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// The message has no content, embeds, or attachments.
    #[error("Message is empty: set content, an embed, or an attachment")]
    Empty,

    /// A text field exceeds its character limit.
    #[error("{field} is too long: {len} characters (limit {max})")]
    TooLong {
        /// Which field overflowed (e.g. `content`, `embeds[0].title`)
        field: String,
        /// Actual length in characters
        len: usize,
        /// Allowed length in characters
        max: usize,
    },

    /// A collection holds more items than allowed.
    #[error("Too many {what}: {count} (limit {max})")]
    TooMany {
        /// What was counted (e.g. `embeds`, `attachments`)
        what: String,
        /// Actual count
        count: usize,
        /// Allowed count
        max: usize,
    },

    /// A required text field is blank.
    #[error("{field} must not be empty")]
    Blank {
        /// Which field was blank
        field: String,
    },

    /// An attachment content type would not fit on a header line.
    #[error("{field} contains control characters: {value:?}")]
    InvalidContentType {
        /// Which attachment it belongs to
        field: String,
        /// The rejected value
        value: String,
    },

    /// Attachments exceed the upload size limit.
    #[error("Attachments total {size} bytes (limit {max})")]
    AttachmentsTooLarge {
        /// Combined size in bytes
        size: usize,
        /// Allowed size in bytes
        max: usize,
    },

    /// JSON serialization failed.
    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}

//! Payload encoding.
//!
//! Turns a [`WebhookMessage`] into the exact bytes sent on the wire:
//! - `application/json` for messages without files
//! - `multipart/form-data` (`payload_json` + `files[n]`) when attachments
//!   are present
//!
//! Encoding is pure and happens before a message is queued, so a payload
//! that the server would reject never consumes rate-limit budget.

mod error;
mod limits;
mod multipart;


pub use error::EncodingError;
pub use limits::PayloadLimits;

use serde::Serialize;

use crate::message::{Attachment, WebhookMessage};
use multipart::MultipartWriter;

/// MIME type of JSON payloads.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// An encoded request body, ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    /// Request body bytes.
    pub body: Vec<u8>,
    /// Value for the `Content-Type` header.
    pub content_type: String,
}

impl EncodedPayload {
    /// Size of the body in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Returns true if the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Validates and serializes messages.
#[derive(Debug, Clone, Default)]
pub struct PayloadEncoder {
    limits: PayloadLimits,
}

/// JSON document sent in the `payload_json` part of a multipart upload.
#[derive(Serialize)]
struct MultipartPayload<'a> {
    #[serde(flatten)]
    message: &'a WebhookMessage,
    attachments: Vec<AttachmentDescriptor<'a>>,
}

#[derive(Serialize)]
struct AttachmentDescriptor<'a> {
    id: usize,
    filename: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

impl<'a> AttachmentDescriptor<'a> {
    fn new(id: usize, attachment: &'a Attachment) -> Self {
        Self {
            id,
            filename: &attachment.filename,
            description: attachment.description.as_deref(),
        }
    }
}

impl PayloadEncoder {
    /// Creates an encoder with the given limits.
    #[must_use]
    pub const fn new(limits: PayloadLimits) -> Self {
        Self { limits }
    }

    /// Returns the enforced limits.
    #[must_use]
    pub const fn limits(&self) -> &PayloadLimits {
        &self.limits
    }

    /// Encodes a message.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError`] if the message violates a limit or cannot
    /// be serialized.
    pub fn encode(&self, message: &WebhookMessage) -> Result<EncodedPayload, EncodingError> {
        self.limits.check(message)?;

        if message.has_attachments() {
            Self::encode_multipart(message, MultipartWriter::new())
        } else {
            Ok(EncodedPayload {
                body: serde_json::to_vec(message)?,
                content_type: JSON_CONTENT_TYPE.to_string(),
            })
        }
    }

    fn encode_multipart(
        message: &WebhookMessage,
        mut writer: MultipartWriter,
    ) -> Result<EncodedPayload, EncodingError> {
        let payload = MultipartPayload {
            message,
            attachments: message
                .attachments
                .iter()
                .enumerate()
                .map(|(id, a)| AttachmentDescriptor::new(id, a))
                .collect(),
        };
        let json = serde_json::to_vec(&payload)?;

        writer.part("payload_json", None, JSON_CONTENT_TYPE, &json);
        for (id, attachment) in message.attachments.iter().enumerate() {
            writer.part(
                &format!("files[{id}]"),
                Some(&attachment.filename),
                &attachment.content_type,
                &attachment.data,
            );
        }

        let (body, content_type) = writer.finish();
        Ok(EncodedPayload { body, content_type })
    }
}

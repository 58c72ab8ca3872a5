//! Message model for webhook payloads.
//!
//! This module provides the immutable values handed to the dispatch engine:
//! - Top-level messages ([`WebhookMessage`])
//! - Rich embeds and their parts ([`Embed`], [`EmbedField`], ...)
//! - File uploads ([`Attachment`])
//!
//! All types serialize with the platform's JSON field names. Optional values
//! that are unset are omitted from the wire format entirely.

mod attachment;
mod embed;


pub use attachment::Attachment;
pub use embed::{Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedImage};

use serde::Serialize;

/// A message to be delivered to a webhook endpoint.
///
/// Built with `with_*` methods; once handed to
/// [`DispatchEngine::submit`](crate::dispatch::DispatchEngine::submit) it is
/// encoded immediately and never mutated again.
///
/// # Example
///
/// ```
/// use webhook_dispatch::message::{Embed, WebhookMessage};
///
/// let message = WebhookMessage::text("Deploy finished")
///     .with_username("ci-bot")
///     .with_embed(Embed::new().with_title("build #42").with_color(0x2ecc71));
///
/// assert_eq!(message.embeds.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebhookMessage {
    /// Plain text content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Overrides the webhook's default display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Overrides the webhook's default avatar.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Text-to-speech flag.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub tts: bool,

    /// Rich embeds, rendered in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,

    /// Creates a forum thread with this name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,

    /// Message flags bitfield.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u32>,

    /// Files uploaded alongside the message.
    ///
    /// Attachment bytes travel as separate multipart parts, never inside
    /// the JSON document.
    #[serde(skip)]
    pub attachments: Vec<Attachment>,
}

impl WebhookMessage {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a message carrying only text content.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::new().with_content(content)
    }

    /// Creates a message carrying a single embed with a title and description.
    #[must_use]
    pub fn embed(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new().with_embed(
            Embed::new()
                .with_title(title)
                .with_description(description),
        )
    }

    /// Sets the text content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Sets the display name override.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the avatar URL override.
    #[must_use]
    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// Enables or disables text-to-speech.
    #[must_use]
    pub const fn with_tts(mut self, tts: bool) -> Self {
        self.tts = tts;
        self
    }

    /// Appends an embed.
    #[must_use]
    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    /// Replaces all embeds.
    #[must_use]
    pub fn with_embeds(mut self, embeds: impl IntoIterator<Item = Embed>) -> Self {
        self.embeds = embeds.into_iter().collect();
        self
    }

    /// Sets the forum thread name.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = Some(name.into());
        self
    }

    /// Sets the message flags.
    #[must_use]
    pub const fn with_flags(mut self, flags: u32) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Appends a file attachment.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Returns true if the message has nothing to display.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.as_deref().is_none_or(str::is_empty)
            && self.embeds.is_empty()
            && self.attachments.is_empty()
    }

    /// Returns true if the message must be sent as `multipart/form-data`.
    #[must_use]
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}

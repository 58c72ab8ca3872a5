//! Size and shape limits that are fatal if sent.

use crate::message::{Embed, WebhookMessage};

use super::EncodingError;

/// Limits enforced before a message is queued.
///
/// Defaults follow Discord's documented webhook limits. A request that
/// violates any of these is rejected by the server with a 400, so sending
/// it would only waste rate-limit budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadLimits {
    pub content: usize,
    pub username: usize,
    pub embeds: usize,
    pub embed_title: usize,
    pub embed_description: usize,
    pub embed_fields: usize,
    pub field_name: usize,
    pub field_value: usize,
    pub footer_text: usize,
    pub author_name: usize,
    /// Combined text across every embed in the message.
    pub embed_total: usize,
    pub attachments: usize,
    /// Combined attachment bytes.
    pub upload_bytes: usize,
}

impl PayloadLimits {
    /// Discord's limits.
    pub const DISCORD: Self = Self {
        content: 2000,
        username: 80,
        embeds: 10,
        embed_title: 256,
        embed_description: 4096,
        embed_fields: 25,
        field_name: 256,
        field_value: 1024,
        footer_text: 2048,
        author_name: 256,
        embed_total: 6000,
        attachments: 10,
        upload_bytes: 25 * 1024 * 1024,
    };

    /// Checks every limit against the message.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn check(&self, message: &WebhookMessage) -> Result<(), EncodingError> {
        if message.is_empty() {
            return Err(EncodingError::Empty);
        }

        check_len("content", message.content.as_deref(), self.content)?;
        check_len("username", message.username.as_deref(), self.username)?;
        check_count("embeds", message.embeds.len(), self.embeds)?;

        for (index, embed) in message.embeds.iter().enumerate() {
            self.check_embed(index, embed)?;
        }

        let total: usize = message.embeds.iter().map(Embed::text_len).sum();
        if total > self.embed_total {
            return Err(EncodingError::TooLong {
                field: "embeds (combined)".to_string(),
                len: total,
                max: self.embed_total,
            });
        }

        self.check_attachments(message)
    }

    fn check_embed(&self, index: usize, embed: &Embed) -> Result<(), EncodingError> {
        let path = |name: &str| format!("embeds[{index}].{name}");

        check_len(&path("title"), embed.title.as_deref(), self.embed_title)?;
        check_len(
            &path("description"),
            embed.description.as_deref(),
            self.embed_description,
        )?;
        check_len(
            &path("footer.text"),
            embed.footer.as_ref().map(|f| f.text.as_str()),
            self.footer_text,
        )?;
        check_len(
            &path("author.name"),
            embed.author.as_ref().map(|a| a.name.as_str()),
            self.author_name,
        )?;
        check_count(&path("fields"), embed.fields.len(), self.embed_fields)?;

        for (i, field) in embed.fields.iter().enumerate() {
            let name_path = path(&format!("fields[{i}].name"));
            let value_path = path(&format!("fields[{i}].value"));
            check_not_blank(&name_path, &field.name)?;
            check_not_blank(&value_path, &field.value)?;
            check_len(&name_path, Some(&field.name), self.field_name)?;
            check_len(&value_path, Some(&field.value), self.field_value)?;
        }

        Ok(())
    }

    fn check_attachments(&self, message: &WebhookMessage) -> Result<(), EncodingError> {
        check_count("attachments", message.attachments.len(), self.attachments)?;

        let size: usize = message.attachments.iter().map(|a| a.len()).sum();
        if size > self.upload_bytes {
            return Err(EncodingError::AttachmentsTooLarge {
                size,
                max: self.upload_bytes,
            });
        }

        for (i, attachment) in message.attachments.iter().enumerate() {
            check_not_blank(&format!("attachments[{i}].filename"), &attachment.filename)?;

            let content_type_path = format!("attachments[{i}].content_type");
            check_not_blank(&content_type_path, &attachment.content_type)?;
            if attachment.content_type.chars().any(char::is_control) {
                return Err(EncodingError::InvalidContentType {
                    field: content_type_path,
                    value: attachment.content_type.clone(),
                });
            }
        }

        Ok(())
    }
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self::DISCORD
    }
}

fn check_len(field: &str, value: Option<&str>, max: usize) -> Result<(), EncodingError> {
    let len = value.map_or(0, |v| v.chars().count());
    if len > max {
        return Err(EncodingError::TooLong {
            field: field.to_string(),
            len,
            max,
        });
    }
    Ok(())
}

fn check_count(what: &str, count: usize, max: usize) -> Result<(), EncodingError> {
    if count > max {
        return Err(EncodingError::TooMany {
            what: what.to_string(),
            count,
            max,
        });
    }
    Ok(())
}

fn check_not_blank(field: &str, value: &str) -> Result<(), EncodingError> {
    if value.trim().is_empty() {
        return Err(EncodingError::Blank {
            field: field.to_string(),
        });
    }
    Ok(())
}

//! File attachments.

use std::path::Path;

/// A file uploaded together with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name presented to recipients.
    pub filename: String,

    /// MIME type of the data (default: `application/octet-stream`).
    pub content_type: String,

    /// Alt text.
    pub description: Option<String>,

    /// Raw file contents.
    pub data: Vec<u8>,
}

impl Attachment {
    /// MIME type used when none is specified.
    pub const DEFAULT_CONTENT_TYPE: &'static str = "application/octet-stream";

    /// Creates an attachment from in-memory bytes.
    #[must_use]
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: Self::DEFAULT_CONTENT_TYPE.to_string(),
            description: None,
            data,
        }
    }

    /// Reads an attachment from disk, using the file name as the upload name.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be read.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map_or_else(|| "file".to_string(), |n| n.to_string_lossy().into_owned());

        Ok(Self::new(filename, data).with_content_type(guess_content_type(path)))
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Size of the file contents in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the file has no contents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Maps common extensions to MIME types.
fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("txt" | "log") => "text/plain",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        _ => Attachment::DEFAULT_CONTENT_TYPE,
    }
}

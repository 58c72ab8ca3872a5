//! Minimal `multipart/form-data` body writer.
//!
//! Only what webhook uploads need: one JSON part plus any number of file
//! parts, written into a single contiguous buffer so the encoded body can be
//! replayed verbatim on every retry.

use rand::Rng;
use rand::distributions::Alphanumeric;

const BOUNDARY_LEN: usize = 32;

/// Accumulates form parts into a single body buffer.
#[derive(Debug)]
pub(crate) struct MultipartWriter {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartWriter {
    /// Creates a writer with a random boundary.
    pub(crate) fn new() -> Self {
        let boundary: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(BOUNDARY_LEN)
            .map(char::from)
            .collect();
        Self::with_boundary(boundary)
    }

    /// Creates a writer with a fixed boundary.
    pub(crate) fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    /// Appends a part.
    ///
    /// `filename` is sanitized: quotes are percent-encoded and line breaks
    /// are dropped so it cannot break out of the header line.
    pub(crate) fn part(
        &mut self,
        name: &str,
        filename: Option<&str>,
        content_type: &str,
        data: &[u8],
    ) -> &mut Self {
        self.body.extend_from_slice(b"--");
        self.body.extend_from_slice(self.boundary.as_bytes());
        self.body.extend_from_slice(b"\r\n");

        let disposition = match filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{}\"\r\n",
                sanitize(filename)
            ),
            None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n"),
        };
        self.body.extend_from_slice(disposition.as_bytes());
        self.body
            .extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Writes the closing delimiter and returns `(body, content_type)`.
    pub(crate) fn finish(mut self) -> (Vec<u8>, String) {
        self.body.extend_from_slice(b"--");
        self.body.extend_from_slice(self.boundary.as_bytes());
        self.body.extend_from_slice(b"--\r\n");

        let content_type = format!("multipart/form-data; boundary={}", self.boundary);
        (self.body, content_type)
    }
}

fn sanitize(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .map(|c| if c == '"' { "%22".to_string() } else { c.to_string() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_parts_and_closing_delimiter() {
        let mut writer = MultipartWriter::with_boundary("XYZ");
        writer
            .part("payload_json", None, "application/json", b"{}")
            .part("files[0]", Some("a.txt"), "text/plain", b"hello");
        let (body, content_type) = writer.finish();
        let text = String::from_utf8(body).unwrap();

        assert_eq!(content_type, "multipart/form-data; boundary=XYZ");
        assert_eq!(
            text,
            "--XYZ\r\n\
             Content-Disposition: form-data; name=\"payload_json\"\r\n\
             Content-Type: application/json\r\n\r\n\
             {}\r\n\
             --XYZ\r\n\
             Content-Disposition: form-data; name=\"files[0]\"; filename=\"a.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             hello\r\n\
             --XYZ--\r\n"
        );
    }

    #[test]
    fn random_boundary_is_alphanumeric() {
        let (_, content_type) = MultipartWriter::new().finish();
        let boundary = content_type.rsplit('=').next().unwrap();

        assert_eq!(boundary.len(), BOUNDARY_LEN);
        assert!(boundary.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn filename_cannot_inject_headers() {
        assert_eq!(sanitize("a\"b\r\nc.txt"), "a%22bc.txt");
    }
}

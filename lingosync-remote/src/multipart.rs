//! Minimal `multipart/form-data` encoder for locale uploads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static BOUNDARY_SEQ: AtomicU64 = AtomicU64::new(0);

enum Part<'a> {
    Text {
        name: &'a str,
        value: String,
    },
    File {
        name: &'a str,
        filename: String,
        content_type: &'a str,
        data: &'a [u8],
    },
}

/// Form builder; parts are emitted in insertion order.
#[derive(Default)]
pub struct Multipart<'a> {
    parts: Vec<Part<'a>>,
}

impl<'a> Multipart<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, name: &'a str, value: impl Into<String>) -> &mut Self {
        self.parts.push(Part::Text {
            name,
            value: value.into(),
        });
        self
    }

    pub fn file(
        &mut self,
        name: &'a str,
        filename: impl Into<String>,
        content_type: &'a str,
        data: &'a [u8],
    ) -> &mut Self {
        self.parts.push(Part::File {
            name,
            filename: filename.into(),
            content_type,
            data,
        });
        self
    }

    /// Encode the form. Returns the `Content-Type` header value and the body.
    pub fn finish(&self) -> (String, Vec<u8>) {
        let boundary = self.boundary();
        let mut body = Vec::new();
        for part in &self.parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            match part {
                Part::Text { name, value } => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    filename,
                    content_type,
                    data,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                             Content-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    /// A boundary that occurs in none of the parts.
    fn boundary(&self) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        loop {
            let seq = BOUNDARY_SEQ.fetch_add(1, Ordering::Relaxed);
            let candidate = format!("lingosync-{nanos:x}-{seq}");
            if !self.parts.iter().any(|part| part.contains(candidate.as_bytes())) {
                return candidate;
            }
        }
    }
}

impl Part<'_> {
    fn contains(&self, needle: &[u8]) -> bool {
        let haystack = match self {
            Part::Text { value, .. } => value.as_bytes(),
            Part::File { data, .. } => *data,
        };
        haystack.windows(needle.len()).any(|w| w == needle)
    }
}

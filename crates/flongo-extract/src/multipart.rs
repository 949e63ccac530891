//! `multipart/form-data` bodies.
//!
//! Text fields become string entries. Uploaded files are not buffered into
//! the payload; each contributes a small metadata object instead.

use bytes::Bytes;
use flongo_core::Payload;
use serde_json::{json, Value};
use std::io;

/// Default maximum number of fields read from one body.
pub const DEFAULT_MAX_FIELDS: usize = 100;

/// Default maximum size of one text field (1 MB).
pub const DEFAULT_MAX_FIELD_SIZE: usize = 1024 * 1024;

/// Limits applied while reading multipart bodies.
#[derive(Debug, Clone)]
pub struct MultipartConfig {
    /// Fields past this count are ignored.
    pub max_fields: usize,
    /// Text fields larger than this are skipped.
    pub max_field_size: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_fields: DEFAULT_MAX_FIELDS,
            max_field_size: DEFAULT_MAX_FIELD_SIZE,
        }
    }
}

impl MultipartConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of fields.
    #[must_use]
    pub fn max_fields(mut self, count: usize) -> Self {
        self.max_fields = count;
        self
    }

    /// Set the maximum text field size.
    #[must_use]
    pub fn max_field_size(mut self, size: usize) -> Self {
        self.max_field_size = size;
        self
    }
}

pub(crate) async fn parse_multipart(
    content_type: &str,
    body: Bytes,
    config: &MultipartConfig,
) -> Payload {
    let mut payload = Payload::new();

    let boundary = match multer::parse_boundary(content_type) {
        Ok(boundary) => boundary,
        Err(error) => {
            tracing::warn!(%error, "multipart body without a usable boundary");
            return payload;
        }
    };

    let stream = futures_util::stream::once(async move { Ok::<_, io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut seen = 0;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => {
                tracing::warn!(%error, "stopping at malformed multipart field");
                break;
            }
        };

        seen += 1;
        if seen > config.max_fields {
            tracing::warn!(max = config.max_fields, "ignoring extra multipart fields");
            break;
        }

        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(ToString::to_string);

        let data = match field.bytes().await {
            Ok(data) => data,
            Err(error) => {
                tracing::warn!(%error, field = %name, "could not read multipart field");
                continue;
            }
        };

        let value = if let Some(file_name) = file_name {
            json!({
                "filename": file_name,
                "content_type": content_type,
                "size": data.len(),
            })
        } else if data.len() > config.max_field_size {
            tracing::warn!(field = %name, size = data.len(), "skipping oversized multipart field");
            continue;
        } else {
            Value::String(String::from_utf8_lossy(&data).into_owned())
        };

        payload.insert(name, value);
    }

    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_multipart_body(boundary: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, data) in parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            if let Some(fname) = filename {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{fname}\"\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: text/plain\r\n");
            } else {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n").as_bytes(),
                );
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }

    #[tokio::test]
    async fn test_text_fields_and_file_metadata() {
        let body = create_multipart_body(
            "XyZ",
            &[
                ("title", None, b"Report"),
                ("upload", Some("notes.txt"), b"Hello, World!"),
            ],
        );

        let payload = parse_multipart(
            "multipart/form-data; boundary=XyZ",
            Bytes::from(body),
            &MultipartConfig::default(),
        )
        .await;

        assert_eq!(payload["title"], "Report");
        assert_eq!(payload["upload"]["filename"], "notes.txt");
        assert_eq!(payload["upload"]["content_type"], "text/plain");
        assert_eq!(payload["upload"]["size"], 13);
    }

    #[tokio::test]
    async fn test_missing_boundary_is_empty() {
        let payload = parse_multipart(
            "multipart/form-data",
            Bytes::from_static(b"whatever"),
            &MultipartConfig::default(),
        )
        .await;
        assert!(payload.is_empty());
    }

    #[tokio::test]
    async fn test_field_limits() {
        let body = create_multipart_body(
            "b",
            &[("a", None, b"1"), ("big", None, b"0123456789"), ("c", None, b"3")],
        );
        let config = MultipartConfig::new().max_fields(2).max_field_size(4);

        let payload = parse_multipart("multipart/form-data; boundary=b", Bytes::from(body), &config).await;

        assert_eq!(payload.get("a"), Some(&Value::String("1".to_string())));
        assert!(payload.get("big").is_none());
        assert!(payload.get("c").is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = MultipartConfig::new().max_fields(3).max_field_size(10);
        assert_eq!(config.max_fields, 3);
        assert_eq!(config.max_field_size, 10);
    }
}

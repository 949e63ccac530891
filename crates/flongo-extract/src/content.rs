//! Content type classification.

use mime::Mime;

/// How a request body should be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    /// JSON document.
    Json,
    /// URL-encoded form fields.
    Form,
    /// `multipart/form-data`.
    Multipart,
    /// XML or HTML markup.
    Markup,
    /// Plain text.
    Text,
    /// No content type. Any body is ignored.
    Absent,
    /// A content type that is not understood.
    Unsupported(String),
}

impl ContentKind {
    /// Classifies a `Content-Type` header value. A missing or blank header
    /// is [`ContentKind::Absent`].
    #[must_use]
    pub fn classify(content_type: Option<&str>) -> Self {
        let Some(raw) = content_type.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::Absent;
        };

        let Ok(parsed) = raw.parse::<Mime>() else {
            return Self::Unsupported(raw.to_string());
        };

        match (parsed.type_(), parsed.subtype().as_str()) {
            (mime::APPLICATION, "json") => Self::Json,
            (_, _) if parsed.suffix() == Some(mime::JSON) => Self::Json,
            (mime::APPLICATION, "x-www-form-urlencoded" | "form-data") => Self::Form,
            (mime::MULTIPART, "form-data") => Self::Multipart,
            (mime::TEXT | mime::APPLICATION, "xml" | "html") => Self::Markup,
            (_, _) if parsed.suffix() == Some(mime::XML) => Self::Markup,
            (mime::TEXT, "plain") => Self::Text,
            _ => Self::Unsupported(parsed.essence_str().to_string()),
        }
    }
}

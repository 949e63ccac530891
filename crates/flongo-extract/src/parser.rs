//! The payload parser.

use crate::content::ContentKind;
use crate::form::parse_form;
use crate::json::parse_json;
use crate::multipart::{parse_multipart, MultipartConfig};
use crate::query::parse_query;
use crate::xml::xml_to_map;
use flongo_core::{Payload, Request};
use serde_json::Value;

/// Merges the query string and the body of a request into one [`Payload`].
#[derive(Debug, Clone, Default)]
pub struct PayloadParser {
    multipart: MultipartConfig,
}

impl PayloadParser {
    /// Creates a parser with default multipart limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the multipart limits.
    #[must_use]
    pub fn with_multipart_config(mut self, config: MultipartConfig) -> Self {
        self.multipart = config;
        self
    }

    /// Parses `request` into a payload. Never fails.
    pub async fn parse(&self, request: &Request) -> Payload {
        let mut payload = request.query().map(parse_query).unwrap_or_default();
        for (key, value) in self.parse_body(request).await {
            payload.insert(key, value);
        }
        payload
    }

    async fn parse_body(&self, request: &Request) -> Payload {
        let body = request.body();
        match ContentKind::classify(request.content_type()) {
            ContentKind::Absent => {
                if !body.is_empty() {
                    tracing::debug!(
                        method = %request.method(),
                        path = request.path(),
                        bytes = body.len(),
                        "request body without content type ignored"
                    );
                }
                Payload::new()
            }
            ContentKind::Json => parse_json(body),
            ContentKind::Form => parse_form(body),
            ContentKind::Multipart => {
                let content_type = request.content_type().unwrap_or_default();
                parse_multipart(content_type, body.clone(), &self.multipart).await
            }
            ContentKind::Markup => {
                let document = String::from_utf8_lossy(body);
                xml_to_map(&document).unwrap_or_default()
            }
            ContentKind::Text => {
                let mut payload = Payload::new();
                payload.insert(
                    "data".to_string(),
                    Value::String(String::from_utf8_lossy(body).into_owned()),
                );
                payload
            }
            ContentKind::Unsupported(mimetype) => {
                tracing::error!(
                    method = %request.method(),
                    path = request.path(),
                    mimetype = %mimetype,
                    "unsupported request content type, body ignored"
                );
                Payload::new()
            }
        }
    }
}

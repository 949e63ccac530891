//! The inbound request as seen by route actions.

use crate::method::{HttpMethod, UnsupportedMethod};
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use http::Uri;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log lines for one request easy to
/// correlate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fully-buffered HTTP request bound to one of the supported methods.
///
/// Cloning is cheap: the body is reference counted.
///
/// # Example
///
/// ```
/// use flongo_core::{HttpMethod, Request};
///
/// let request = Request::new(HttpMethod::Post, "/request?debug=1".parse().unwrap())
///     .with_header(http::header::CONTENT_TYPE, http::HeaderValue::from_static("application/json"))
///     .with_body(r#"{"_id": 5}"#);
///
/// assert_eq!(request.path(), "/request");
/// assert_eq!(request.query(), Some("debug=1"));
/// assert_eq!(request.content_type(), Some("application/json"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    id: RequestId,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    path_params: Vec<(String, String)>,
}

impl Request {
    /// Creates a request with no headers and an empty body.
    #[must_use]
    pub fn new(method: HttpMethod, uri: Uri) -> Self {
        Self {
            id: RequestId::new(),
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            path_params: Vec::new(),
        }
    }

    /// Builds a request from `http` parts and a collected body.
    pub fn from_parts(parts: http::request::Parts, body: Bytes) -> Result<Self, UnsupportedMethod> {
        let method = HttpMethod::try_from(&parts.method)?;
        Ok(Self {
            id: RequestId::new(),
            method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            path_params: Vec::new(),
        })
    }

    /// Replaces all headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Appends one header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the parameters captured from the route pattern.
    #[must_use]
    pub fn with_path_params(mut self, params: Vec<(String, String)>) -> Self {
        self.path_params = params;
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Returns the full URI.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the path component of the URI.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the raw query string, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value if it is present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Returns the headers as `(name, value)` pairs. Non UTF-8 values are
    /// replaced lossily.
    #[must_use]
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect()
    }

    /// Returns the raw body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns a captured path parameter.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns all captured path parameters.
    #[must_use]
    pub fn path_params(&self) -> &[(String, String)] {
        &self.path_params
    }
}

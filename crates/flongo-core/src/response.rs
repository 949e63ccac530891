//! Responses produced by route actions.

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// The body of an [`ApiResponse`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// A JSON document.
    Json(Value),
    /// Plain text.
    Text(String),
    /// No body.
    Empty,
}

/// A structured response returned by an action.
///
/// # Example
///
/// ```
/// use flongo_core::ApiResponse;
/// use http::StatusCode;
/// use serde_json::json;
///
/// let response = ApiResponse::json(json!({"created": true})).with_status(StatusCode::CREATED);
/// assert_eq!(response.status(), StatusCode::CREATED);
/// assert!(response.json_object().is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

impl ApiResponse {
    /// A `200 OK` JSON response.
    #[must_use]
    pub fn json(value: impl Into<Value>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: ResponseBody::Json(value.into()),
        }
    }

    /// A `200 OK` JSON response built from any serializable value.
    pub fn try_json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::json)
    }

    /// A `200 OK` response of the form `{"message": ...}`.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::json(json!({ "message": message.into() }))
    }

    /// A `200 OK` plain text response.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: ResponseBody::Text(text.into()),
        }
    }

    /// A `204 No Content` response.
    #[must_use]
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
        }
    }

    /// Sets the status code.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns the status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the body.
    #[must_use]
    pub const fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Returns the body if it is a JSON object.
    #[must_use]
    pub fn json_object(&self) -> Option<&Map<String, Value>> {
        match &self.body {
            ResponseBody::Json(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// Serializes into status, headers (with a default `Content-Type`) and bytes.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        let mut headers = self.headers;
        let (content_type, bytes) = match self.body {
            ResponseBody::Json(value) => (
                Some("application/json"),
                Bytes::from(serde_json::to_vec(&value).unwrap_or_default()),
            ),
            ResponseBody::Text(text) => (Some("text/plain; charset=utf-8"), Bytes::from(text)),
            ResponseBody::Empty => (None, Bytes::new()),
        };
        if let Some(content_type) = content_type {
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
        }
        (self.status, headers, bytes)
    }
}

/// What an action hands back to the pipeline.
///
/// Anything that is not already an [`ApiResponse`] is wrapped as a `200 OK`
/// JSON response, and the wrapping is logged.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A structured response.
    Response(ApiResponse),
    /// A bare value.
    Raw(Value),
}

impl Reply {
    /// Returns the structured response and whether wrapping was needed.
    #[must_use]
    pub fn into_response(self) -> (ApiResponse, bool) {
        match self {
            Self::Response(response) => (response, false),
            Self::Raw(value) => (ApiResponse::json(value), true),
        }
    }
}

impl From<ApiResponse> for Reply {
    fn from(response: ApiResponse) -> Self {
        Self::Response(response)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Self::Raw(value)
    }
}

impl From<String> for Reply {
    fn from(value: String) -> Self {
        Self::Raw(Value::String(value))
    }
}

impl From<&str> for Reply {
    fn from(value: &str) -> Self {
        Self::Raw(Value::String(value.to_string()))
    }
}

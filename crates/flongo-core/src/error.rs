//! Error types for Flongo.
//!
//! Every failure that leaves the request pipeline is an [`ApiError`]. The
//! origin of the failure is recorded in its [`ErrorKind`], which also supplies
//! the default HTTP status code.
//!
//! | `ErrorKind` | Default status |
//! |---|---|
//! | `Declared` | 500 |
//! | `RequestHandling` | 500 |
//! | `Authorization` | 403 |
//! | `Resource` | 500 |
//! | `SchemaValidation` | 400 |
//!
//! User actions fail with an [`ActionError`], which the pipeline maps onto an
//! [`ApiError`] at a single boundary.

use crate::method::HttpMethod;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Result type alias using [`ApiError`].
pub type ApiResult<T> = Result<T, ApiError>;

/// Where an [`ApiError`] originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Raised deliberately by user code.
    Declared,
    /// Generic pipeline failure.
    RequestHandling,
    /// Caller is missing or lacks a required role.
    Authorization,
    /// A collection or database could not be provided.
    Resource,
    /// A payload violated a route schema.
    SchemaValidation,
}

impl ErrorKind {
    /// Returns the default HTTP status code for this kind.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Declared | Self::RequestHandling | Self::Resource => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::SchemaValidation => StatusCode::BAD_REQUEST,
        }
    }

    /// Whether debug context (headers, payload, stack trace) may be attached.
    #[must_use]
    pub const fn accepts_debug_context(&self) -> bool {
        !matches!(self, Self::Authorization)
    }
}

/// The structured error returned to clients.
///
/// # Example
///
/// ```
/// use flongo_core::{ApiError, ErrorKind};
/// use http::StatusCode;
///
/// let error = ApiError::new("Oh no! A value error!")
///     .with_status(StatusCode::INTERNAL_SERVER_ERROR)
///     .with_data("field", "value");
///
/// assert_eq!(error.kind(), ErrorKind::Declared);
/// assert_eq!(error.to_body().error, "Oh no! A value error!");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status_code: StatusCode,
    data: Map<String, Value>,
    stack_trace: Option<String>,
}

impl ApiError {
    /// Creates a user-declared error with status 500.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Declared, message)
    }

    /// Creates an error of the given kind using the kind's default status.
    #[must_use]
    pub fn with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: kind.default_status_code(),
            data: Map::new(),
            stack_trace: None,
        }
    }

    /// Creates a generic request handling error.
    #[must_use]
    pub fn request_handling(message: impl Into<String>, status_code: StatusCode) -> Self {
        Self::with_kind(ErrorKind::RequestHandling, message).with_status(status_code)
    }

    /// Creates an authorization error for a caller with no identity (401).
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Authorization, message).with_status(StatusCode::UNAUTHORIZED)
    }

    /// Creates an authorization error for a caller lacking a role (403).
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Authorization, message)
    }

    /// Creates the error raised when a route needs a collection but has none.
    #[must_use]
    pub fn missing_collection(url: impl Into<String>) -> Self {
        Self::with_kind(
            ErrorKind::Resource,
            "No MongoDB collection was specified for this route",
        )
        .with_data("url", url.into())
    }

    /// Creates a resource error naming the collection that failed.
    #[must_use]
    pub fn resource(message: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Resource, message).with_data("collection", collection.into())
    }

    /// Overrides the status code.
    #[must_use]
    pub fn with_status(mut self, status_code: StatusCode) -> Self {
        self.status_code = status_code;
        self
    }

    /// Adds or replaces one entry of the additional data.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_data(key, value);
        self
    }

    /// Merges a map into the additional data.
    #[must_use]
    pub fn with_data_map(mut self, data: Map<String, Value>) -> Self {
        self.data.extend(data);
        self
    }

    /// Attaches a stack trace.
    #[must_use]
    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    /// Adds or replaces one entry of the additional data in place.
    pub fn insert_data(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Sets the stack trace in place.
    pub fn set_stack_trace(&mut self, stack_trace: impl Into<String>) {
        self.stack_trace = Some(stack_trace.into());
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// Returns the additional data.
    #[must_use]
    pub const fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Returns the stack trace, if one was captured.
    #[must_use]
    pub fn stack_trace(&self) -> Option<&str> {
        self.stack_trace.as_deref()
    }

    /// Converts this error into the uniform response body.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.message.clone(),
            traceback: self.stack_trace.clone(),
            additional_data: self.data.clone(),
        }
    }
}

/// The JSON shape of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Stack trace, only present in debug mode.
    pub traceback: Option<String>,
    /// Structured context about the failure.
    pub additional_data: Map<String, Value>,
}

/// A payload failed validation against a route schema.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct SchemaValidationError {
    /// The route URL.
    pub url: String,
    /// The method whose schema was applied.
    pub method: HttpMethod,
    /// Description of the first validation failure.
    pub message: String,
    /// The schema that was applied.
    pub schema: Value,
    /// Whether the response (rather than the request) failed validation.
    pub is_response_schema: bool,
}

impl SchemaValidationError {
    /// Schema failures are always client errors.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// `"Request"` or `"Response"`.
    #[must_use]
    pub const fn side(&self) -> &'static str {
        if self.is_response_schema {
            "Response"
        } else {
            "Request"
        }
    }

    /// Returns the url and method, plus the schema when `include_schema` is set.
    #[must_use]
    pub fn data(&self, include_schema: bool) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("url".to_string(), Value::String(self.url.clone()));
        data.insert(
            "method".to_string(),
            Value::String(self.method.as_str().to_string()),
        );
        if include_schema {
            data.insert("method_schema".to_string(), self.schema.clone());
        }
        data
    }
}

/// A transport-level failure raised from inside an action, such as an abort
/// with a specific HTTP status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HttpError {
    status: Option<StatusCode>,
    message: String,
}

impl HttpError {
    /// Creates an HTTP error carrying a status code.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            message: status.canonical_reason().unwrap_or("HTTP error").to_string(),
        }
    }

    /// Creates an HTTP error with no status code. It maps to 500.
    #[must_use]
    pub fn without_status(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Replaces the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Returns the status code carried by this error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Everything a user action may fail with.
///
/// The request pipeline matches on this exhaustively; see
/// `flongo_routing::RouteEndpoint` for the mapping.
#[derive(Error, Debug)]
pub enum ActionError {
    /// Transport-level failure with an optional status code.
    #[error(transparent)]
    Http(#[from] HttpError),
    /// A deliberately raised structured error, passed through unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// A schema validation failure raised by user code.
    #[error(transparent)]
    Schema(#[from] SchemaValidationError),
    /// Anything else.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ActionError {
    /// Wraps an arbitrary error as an unexpected failure.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unexpected(anyhow::Error::new(error))
    }

    /// Creates an unexpected failure from a message.
    pub fn msg(message: impl std::fmt::Display) -> Self {
        Self::Unexpected(anyhow::anyhow!("{message}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_declared_error_defaults_to_500() {
        let error = ApiError::new("Oh no! A value error!");
        assert_eq!(error.kind(), ErrorKind::Declared);
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.to_string(), "Oh no! A value error!");
    }

    #[test]
    fn test_authorization_statuses() {
        assert_eq!(
            ApiError::unauthorized("who are you").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::forbidden("not allowed").status_code(),
            StatusCode::FORBIDDEN
        );
        assert!(!ErrorKind::Authorization.accepts_debug_context());
        assert!(ErrorKind::RequestHandling.accepts_debug_context());
    }

    #[test]
    fn test_missing_collection_names_url() {
        let error = ApiError::missing_collection("/default");
        assert_eq!(error.kind(), ErrorKind::Resource);
        assert_eq!(error.data()["url"], json!("/default"));
    }

    #[test]
    fn test_body_shape() {
        let error = ApiError::request_handling("boom", StatusCode::BAD_REQUEST)
            .with_data("url", "/request")
            .with_stack_trace("at main");

        let body = serde_json::to_value(error.to_body()).unwrap();
        assert_eq!(
            body,
            json!({
                "error": "boom",
                "traceback": "at main",
                "additional_data": {"url": "/request"}
            })
        );
    }

    #[test]
    fn test_body_without_traceback_serializes_null() {
        let body = serde_json::to_value(ApiError::new("x").to_body()).unwrap();
        assert_eq!(body["traceback"], Value::Null);
        assert_eq!(body["additional_data"], json!({}));
    }

    #[test]
    fn test_schema_error_data_hides_schema_unless_asked() {
        let error = SchemaValidationError {
            url: "/request".to_string(),
            method: HttpMethod::Post,
            message: "_id: \"abc\" is not of type \"integer\"".to_string(),
            schema: json!({"type": "object"}),
            is_response_schema: false,
        };

        assert_eq!(error.side(), "Request");
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert!(!error.data(false).contains_key("method_schema"));
        let data = error.data(true);
        assert_eq!(data["method"], json!("POST"));
        assert_eq!(data["method_schema"], json!({"type": "object"}));
    }

    #[test]
    fn test_http_error_status() {
        let error = HttpError::new(StatusCode::NOT_FOUND);
        assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(error.message(), "Not Found");
        assert_eq!(HttpError::without_status("bad").status(), None);
    }

    #[test]
    fn test_action_error_conversions() {
        let api: ActionError = ApiError::new("declared").into();
        assert!(matches!(api, ActionError::Api(_)));

        let other: ActionError = anyhow::anyhow!("kaboom").into();
        assert_eq!(other.to_string(), "kaboom");

        let io = ActionError::other(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(matches!(io, ActionError::Unexpected(_)));
    }
}

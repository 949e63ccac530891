//! Test errors.

use thiserror::Error;

/// A test request could not be built or its response could not be read.
#[derive(Debug, Error)]
pub enum TestError {
    /// The request was malformed.
    #[error("request build error: {0}")]
    RequestBuild(String),
    /// A header name or value was invalid.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// The body was not UTF-8.
    #[error("body is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Form encoding failed.
    #[error("form encoding error: {0}")]
    Form(#[from] serde_urlencoded::ser::Error),
}

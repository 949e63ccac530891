//! Test responses with assertion helpers.

use crate::error::TestError;
use bytes::Bytes;
use flongo_core::ErrorBody;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// A collected response.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Wraps a dispatcher response.
    pub fn from_http(response: http::Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header as a string, if present and visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the raw body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as text.
    pub fn text(&self) -> Result<&str, TestError> {
        Ok(std::str::from_utf8(&self.body)?)
    }

    /// Deserializes the JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Parses the body as a JSON value.
    pub fn json_value(&self) -> Result<Value, TestError> {
        self.json()
    }

    /// Parses the body as the uniform error shape.
    pub fn error_body(&self) -> Result<ErrorBody, TestError> {
        self.json()
    }

    /// Asserts the status.
    ///
    /// # Panics
    ///
    /// Panics with the body when the status differs.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "unexpected status, body: {}",
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts a header value.
    ///
    /// # Panics
    ///
    /// Panics if the header is missing or differs.
    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        assert_eq!(self.header(name), Some(expected), "header {name}");
        self
    }

    /// Asserts the JSON body equals `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON or differs.
    pub fn assert_json_eq(&self, expected: &Value) -> &Self {
        match self.json_value() {
            Ok(actual) => assert_eq!(&actual, expected, "JSON body mismatch"),
            Err(e) => panic!("body is not JSON: {e}"),
        }
        self
    }

    /// Asserts the value at a dotted path, such as `additional_data.url`.
    ///
    /// # Panics
    ///
    /// Panics if the path is missing or the value differs.
    pub fn assert_json_field(&self, path: &str, expected: &Value) -> &Self {
        let json = match self.json_value() {
            Ok(json) => json,
            Err(e) => panic!("body is not JSON: {e}"),
        };
        let actual = json_path(&json, path)
            .unwrap_or_else(|| panic!("JSON path '{path}' not found in: {json}"));
        assert_eq!(actual, expected, "JSON field '{path}'");
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &String::from_utf8_lossy(&self.body))
            .finish()
    }
}

fn json_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match segment.parse::<usize>() {
            Ok(index) => current.get(index),
            Err(_) => current.get(segment),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: StatusCode, body: &Value) -> TestResponse {
        let mut response = http::Response::new(Bytes::from(body.to_string()));
        *response.status_mut() = status;
        TestResponse::from_http(response)
    }

    #[test]
    fn test_error_body() {
        let response = response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &json!({"error": "Oh no!", "traceback": null, "additional_data": {}}),
        );
        let body = response.error_body().unwrap();
        assert_eq!(body.error, "Oh no!");
        assert!(body.traceback.is_none());
    }

    #[test]
    fn test_json_path() {
        let response = response(StatusCode::OK, &json!({"items": [{"name": "Peter"}]}));
        response
            .assert_status(StatusCode::OK)
            .assert_json_field("items.0.name", &json!("Peter"));
    }
}

//! Test request building.

use crate::error::TestError;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use serde::Serialize;

/// Builds an `http::Request` for the dispatcher.
///
/// Errors are kept until [`build`](Self::build) so calls can be chained.
#[derive(Debug)]
#[must_use]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Starts a request.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            error: None,
        }
    }

    fn fail(mut self, error: TestError) -> Self {
        self.error.get_or_insert(error);
        self
    }

    /// Sets a header, replacing earlier values.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = match HeaderName::try_from(name.as_ref()) {
            Ok(name) => name,
            Err(e) => return self.fail(TestError::InvalidHeader(e.to_string())),
        };
        let value = match HeaderValue::try_from(value.as_ref()) {
            Ok(value) => value,
            Err(e) => return self.fail(TestError::InvalidHeader(e.to_string())),
        };
        self.headers.insert(name, value);
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Identifies the caller the way an authenticating proxy would, through
    /// `x-user-id` and `x-user-roles`.
    pub fn user<I, S>(self, user_id: impl AsRef<str>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let roles: Vec<String> = roles.into_iter().map(|r| r.as_ref().to_string()).collect();
        self.header("x-user-id", user_id)
            .header("x-user-roles", roles.join(","))
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and content type.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.body = Bytes::from(bytes);
                self.content_type("application/json")
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Sets a form-urlencoded body and content type.
    pub fn form<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_urlencoded::to_string(value) {
            Ok(encoded) => {
                self.body = Bytes::from(encoded);
                self.content_type("application/x-www-form-urlencoded")
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Sets a plain text body and content type.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = Bytes::from(text.into());
        self.content_type("text/plain")
    }

    /// Builds the request.
    pub fn build(self) -> Result<http::Request<Bytes>, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("invalid URI [{}]: {e}", self.uri)))?;

        let mut request = http::Request::new(self.body);
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        *request.headers_mut() = self.headers;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_body() {
        let request = TestRequestBuilder::new(Method::POST, "/request")
            .json(&json!({"_id": 5}))
            .build()
            .unwrap();

        assert_eq!(request.headers()["content-type"], "application/json");
        assert_eq!(request.body().as_ref(), b"{\"_id\":5}");
    }

    #[test]
    fn test_form_body() {
        let request = TestRequestBuilder::new(Method::POST, "/request")
            .form(&[("name", "Peter"), ("age", "30")])
            .build()
            .unwrap();

        assert_eq!(request.body().as_ref(), b"name=Peter&age=30");
    }

    #[test]
    fn test_user_headers() {
        let request = TestRequestBuilder::new(Method::GET, "/permissions")
            .user("u1", ["user", "admin"])
            .build()
            .unwrap();

        assert_eq!(request.headers()["x-user-id"], "u1");
        assert_eq!(request.headers()["x-user-roles"], "user,admin");
    }

    #[test]
    fn test_invalid_header_surfaces_on_build() {
        let err = TestRequestBuilder::new(Method::GET, "/")
            .header("bad header", "x")
            .build()
            .unwrap_err();
        assert!(matches!(err, TestError::InvalidHeader(_)));
    }
}

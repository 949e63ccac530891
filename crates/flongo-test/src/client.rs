//! In-memory test client.

use crate::error::TestError;
use crate::request::TestRequestBuilder;
use crate::response::TestResponse;
use flongo_routing::{RouteConfigError, RouteContext, RouteTable};
use flongo_server::Dispatcher;
use http::Method;
use std::sync::Arc;

/// Sends requests straight to a [`Dispatcher`], without sockets.
///
/// # Example
///
/// ```
/// use flongo_core::ActionError;
/// use flongo_routing::{Route, RouteContext, RouteHandler, RouteTable};
/// use flongo_test::TestClient;
/// use http::StatusCode;
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let table = RouteTable::new().route(Route::new(
///     "/request",
///     RouteHandler::new().post(|_, payload, _| async move {
///         Ok::<_, ActionError>(json!({"payload": payload}))
///     }),
/// ));
/// let client = TestClient::from_table(&table, &RouteContext::default()).unwrap();
///
/// let response = client.post("/request").json(&json!({"a": 1})).send().await;
/// response
///     .assert_status(StatusCode::OK)
///     .assert_json_field("payload.a", &json!(1));
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct TestClient {
    dispatcher: Arc<Dispatcher>,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Wraps an already populated dispatcher.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            default_headers: Vec::new(),
        }
    }

    /// Registers `table` on a dispatcher configured from the context's
    /// server settings.
    pub fn from_table(table: &RouteTable, context: &RouteContext) -> Result<Self, RouteConfigError> {
        let mut dispatcher = Dispatcher::from_settings(&context.settings().server);
        table.register(&mut dispatcher, context)?;
        Ok(Self::new(dispatcher))
    }

    /// Adds a header sent with every request.
    #[must_use]
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Returns the dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Starts a `GET` request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a `POST` request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a `PUT` request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a `PATCH` request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Starts a `DELETE` request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts an `OPTIONS` request.
    pub fn options(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::OPTIONS, uri)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        let builder = self
            .default_headers
            .iter()
            .fold(TestRequestBuilder::new(method, uri), |builder, (name, value)| {
                builder.header(name, value)
            });
        TestClientRequest {
            client: self,
            builder,
        }
    }
}

/// A request being built for a [`TestClient`].
#[derive(Debug)]
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Sends the caller identity headers.
    pub fn user<I, S>(mut self, user_id: impl AsRef<str>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.builder = self.builder.user(user_id, roles);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<bytes::Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: serde::Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sets a form-urlencoded body.
    pub fn form<T: serde::Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.form(value);
        self
    }

    /// Sets a plain text body.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.builder = self.builder.text(text);
        self
    }

    /// Sends the request.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        let response = self.client.dispatcher.dispatch(request).await;
        Ok(TestResponse::from_http(response))
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request could not be built.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("invalid test request: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flongo_core::{ActionError, Request};
    use flongo_routing::{Route, RouteHandler};
    use http::StatusCode;
    use serde_json::{json, Value};

    fn client() -> TestClient {
        let table = RouteTable::new().route(Route::new(
            "/echo",
            RouteHandler::new()
                .get(|request: Request, payload, _| async move {
                    Ok::<_, ActionError>(json!({
                        "payload": payload,
                        "custom": request.header("x-custom"),
                    }))
                })
                .post(|_, payload, _| async move { Ok::<_, ActionError>(Value::Object(payload)) }),
        ));
        TestClient::from_table(&table, &RouteContext::default())
            .unwrap()
            .with_default_header("x-custom", "default-value")
    }

    #[tokio::test]
    async fn test_query_and_default_headers() {
        let response = client().get("/echo?name=Peter").send().await;
        response
            .assert_status(StatusCode::OK)
            .assert_json_field("payload.name", &json!("Peter"))
            .assert_json_field("custom", &json!("default-value"));
    }

    #[tokio::test]
    async fn test_form_and_text_bodies() {
        let client = client();

        let form = client.post("/echo").form(&[("name", "Peter")]).send().await;
        form.assert_json_eq(&json!({"name": "Peter"}));

        let text = client.post("/echo").text("hello").send().await;
        text.assert_json_eq(&json!({"data": "hello"}));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = client().delete("/nowhere").send().await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert!(response.error_body().unwrap().error.contains("/nowhere"));
    }

    #[tokio::test]
    async fn test_try_send_reports_build_errors() {
        let err = client().get("/echo").header("bad header", "x").try_send().await;
        assert!(matches!(err, Err(TestError::InvalidHeader(_))));
    }
}

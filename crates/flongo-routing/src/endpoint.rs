//! The per-request pipeline for one `(url, method)` pair.
//!
//! A [`RouteEndpoint`] runs these stages in order:
//!
//! 1. log receipt
//! 2. parse the payload
//! 3. check roles, when the method declares any
//! 4. validate the payload against the request schema
//! 5. lease the route's collection, when it names one
//! 6. run the action
//! 7. wrap bare values into a response
//! 8. validate JSON object bodies against the response schema
//! 9. release the collection
//!
//! Stages 3 to 8 fail into a single [`ActionError`], which is mapped to an
//! [`ApiError`] in one place. The lease is owned by the stage future, so it
//! is released on every exit path, including a panicking action and a
//! request dropped by a timeout.

use crate::action::Action;
use crate::context::RouteContext;
use crate::route::Route;
use flongo_core::{ActionError, ApiError, ApiResponse, HttpMethod, Payload, Request};
use flongo_database::CollectionLease;
use flongo_middleware::{RouteSchema, SchemaValidator};
use flongo_telemetry::RouteLogger;
use futures_util::FutureExt;
use http::StatusCode;
use serde_json::Value;
use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt::{self, Write as _};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// An action wrapped in the full request pipeline.
///
/// Endpoints are created by [`RouteTable::register`](crate::RouteTable::register)
/// and shared read-only across concurrent requests.
#[derive(Clone)]
pub struct RouteEndpoint {
    url: Arc<str>,
    method: HttpMethod,
    action: Action,
    required_roles: Vec<String>,
    collection_name: Option<String>,
    request_schema: Arc<RouteSchema>,
    response_schema: Arc<RouteSchema>,
    validator: SchemaValidator,
    cors_enabled: bool,
    logger: RouteLogger,
    context: RouteContext,
}

impl fmt::Debug for RouteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEndpoint")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("required_roles", &self.required_roles)
            .field("collection_name", &self.collection_name)
            .field("cors_enabled", &self.cors_enabled)
            .finish_non_exhaustive()
    }
}

/// Request details kept for error enrichment in debug mode.
struct DebugContext {
    headers: Vec<(String, String)>,
    payload: Payload,
}

impl RouteEndpoint {
    /// Wraps `action` in the pipeline of `route` for `method`.
    #[must_use]
    pub fn new(route: &Route, method: HttpMethod, action: Action, context: RouteContext) -> Self {
        let url: Arc<str> = Arc::from(route.url());
        Self {
            method,
            action,
            required_roles: route.route_permissions().roles_for(method).to_vec(),
            collection_name: route.collection_name().map(ToString::to_string),
            request_schema: Arc::new(route.request_schemas().clone()),
            response_schema: Arc::new(route.response_schemas().clone()),
            validator: SchemaValidator::new(route.url()),
            cors_enabled: route.cors_enabled(),
            logger: RouteLogger::new(Arc::clone(&url), route.route_log_level()),
            url,
            context,
        }
    }

    /// Returns the URL pattern.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the bound method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Returns the roles required for this method; empty means unrestricted.
    #[must_use]
    pub fn required_roles(&self) -> &[String] {
        &self.required_roles
    }

    /// Returns the collection leased for each request, if any.
    #[must_use]
    pub fn collection_name(&self) -> Option<&str> {
        self.collection_name.as_deref()
    }

    /// Returns `true` if CORS headers are added for this route.
    #[must_use]
    pub const fn cors_enabled(&self) -> bool {
        self.cors_enabled
    }

    /// Returns the route's logger.
    #[must_use]
    pub const fn logger(&self) -> &RouteLogger {
        &self.logger
    }

    /// Returns the shared collaborators.
    #[must_use]
    pub const fn context(&self) -> &RouteContext {
        &self.context
    }

    /// Runs the pipeline for one request.
    ///
    /// # Errors
    ///
    /// Returns the mapped [`ApiError`] of whichever stage failed. In debug
    /// mode it carries the request headers, the parsed payload and a stack
    /// trace, unless it is an authorization error.
    pub async fn handle(&self, request: Request) -> Result<ApiResponse, ApiError> {
        let method = self.method.as_str();
        self.logger
            .info(method, format_args!("Received HTTP {method} request"));

        let payload = self.context.parser().parse(&request).await;

        let debug = self.context.debug_mode().then(|| DebugContext {
            headers: request.header_pairs(),
            payload: payload.clone(),
        });

        match self.run(request, payload).await {
            Ok(response) => {
                self.logger.info(
                    method,
                    format_args!(
                        "Sending HTTP {method} response: ({})",
                        response.status().as_u16()
                    ),
                );
                Ok(response)
            }
            Err(error) => Err(self.fail(error, debug)),
        }
    }

    async fn run(&self, request: Request, payload: Payload) -> Result<ApiResponse, ActionError> {
        let method = self.method.as_str();

        if !self.required_roles.is_empty() {
            self.context
                .role_gate()
                .check_roles(&request, &self.required_roles)?;
        }

        if self.request_schema.for_method(self.method).is_some() {
            self.validator
                .validate_request(self.method, &payload, &self.request_schema)?;
            self.logger.debug(method, "Validated request SCHEMA");
        }

        let lease = self.lease().await?;
        let collection = lease.as_ref().map(CollectionLease::handle);
        if collection.is_some() {
            self.logger.debug(method, "Opened DATABASE CONNECTION");
        }

        let action = Arc::clone(&self.action);
        let reply = AssertUnwindSafe(async move { action(request, payload, collection).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ActionError::msg(panic_message(&*panic))))?;

        let (response, wrapped) = reply.into_response();
        if wrapped {
            self.logger
                .warn(method, "response was forced to a Response");
        }

        if let Some(body) = response.json_object() {
            self.validator
                .validate_response(self.method, body, &self.response_schema)?;
        }

        if let Some(lease) = lease {
            lease.release();
        }
        Ok(response)
    }

    async fn lease(&self) -> Result<Option<CollectionLease>, ApiError> {
        let Some(name) = self.collection_name.as_deref() else {
            return Ok(None);
        };
        let Some(provider) = self.context.provider() else {
            return Err(ApiError::resource(
                format!("No database is configured to provide collection [{name}]"),
                name,
            ));
        };

        CollectionLease::acquire(Arc::clone(provider), name)
            .await
            .map(Some)
            .map_err(flongo_database::DatabaseError::into_api_error)
    }

    fn fail(&self, error: ActionError, debug: Option<DebugContext>) -> ApiError {
        let method = self.method.as_str();
        let causes = debug.as_ref().map(|_| render_causes(&error));
        let mut api_error = self.map_error(error, debug.is_some());

        if let (Some(context), true) = (debug, api_error.kind().accepts_debug_context()) {
            let headers: Vec<Value> = context
                .headers
                .into_iter()
                .map(|(name, value)| Value::Array(vec![Value::String(name), Value::String(value)]))
                .collect();
            api_error.insert_data("request_headers", headers);
            api_error.insert_data("request_data", Value::Object(context.payload));
            if api_error.stack_trace().is_none() {
                if let Some(causes) = causes {
                    let backtrace = Backtrace::force_capture();
                    api_error.set_stack_trace(format!("{causes}\n\n{backtrace}"));
                }
            }
        }

        let code = api_error.status_code().as_u16();
        self.logger.error(
            method,
            format_args!("[{method}] ERROR {code}: {}", api_error.message()),
        );
        if let Some(trace) = api_error.stack_trace() {
            self.logger.debug(method, trace);
        }
        self.logger.info(
            method,
            format_args!("Sending HTTP {method} ERROR response: ({code})"),
        );
        api_error
    }

    /// The single mapping from action failures to client-facing errors.
    fn map_error(&self, error: ActionError, debug: bool) -> ApiError {
        match error {
            ActionError::Http(e) => ApiError::request_handling(
                format!(
                    "[{}] Error handling request on URL [{}]!",
                    self.method, self.url
                ),
                e.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ),
            ActionError::Api(e) => e,
            ActionError::Schema(e) => ApiError::request_handling(
                format!(
                    "{} schema validation error on URL [{}]: {}",
                    e.side(),
                    self.url,
                    e.message
                ),
                e.status_code(),
            )
            .with_data_map(e.data(debug)),
            ActionError::Unexpected(e) => {
                ApiError::request_handling(e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "action panicked".to_string())
}

/// Renders `error` followed by its chain of sources.
fn render_causes(error: &ActionError) -> String {
    let mut trace = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        let _ = write!(trace, "\nCaused by: {cause}");
        source = cause.source();
    }
    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::RouteHandler;
    use crate::permissions::RoutePermissions;
    use flongo_config::AppSettings;
    use flongo_core::{ErrorKind, HttpError};
    use flongo_database::MemoryDatabase;
    use flongo_middleware::AllowAll;
    use http::header::CONTENT_TYPE;
    use http::{HeaderName, HeaderValue};
    use proptest::prelude::*;
    use serde_json::json;

    fn context(debug: bool) -> RouteContext {
        let mut settings = AppSettings::default();
        settings.server.debug_mode = debug;
        RouteContext::new(Arc::new(settings))
    }

    fn endpoint(route: &Route, method: HttpMethod, context: RouteContext) -> RouteEndpoint {
        let action = route.handler().action(method).unwrap().clone();
        RouteEndpoint::new(route, method, action, context)
    }

    fn post_json(path: &str, body: &Value) -> Request {
        Request::new(HttpMethod::Post, path.parse().unwrap())
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(serde_json::to_vec(body).unwrap())
    }

    fn id_schema() -> RouteSchema {
        RouteSchema::new().post(json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {"_id": {"type": "integer"}},
            "required": ["_id"]
        }))
    }

    fn request_route() -> Route {
        Route::new(
            "/request",
            RouteHandler::new().post(|_, payload, _| async move {
                let id = payload.get("_id").map(ToString::to_string).unwrap_or_default();
                Ok::<_, ActionError>(
                    ApiResponse::json(json!({"sample_record": id, "created": true}))
                        .with_status(StatusCode::CREATED),
                )
            }),
        )
        .request_schema(id_schema())
    }

    #[tokio::test]
    async fn test_valid_post_reaches_action() {
        let endpoint = endpoint(&request_route(), HttpMethod::Post, context(false));
        let response = endpoint
            .handle(post_json("/request", &json!({"_id": 5})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.json_object().unwrap()["sample_record"],
            json!("5")
        );
    }

    #[tokio::test]
    async fn test_request_schema_failure() {
        let endpoint = endpoint(&request_route(), HttpMethod::Post, context(false));
        let err = endpoint
            .handle(post_json("/request", &json!({"_id": "abc"})))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), ErrorKind::RequestHandling);
        assert!(err
            .message()
            .starts_with("Request schema validation error on URL [/request]: "));
        assert!(err.message().contains("_id"));
        assert_eq!(err.data()["method"], json!("POST"));
        assert!(!err.data().contains_key("method_schema"));
        assert!(err.stack_trace().is_none());
    }

    #[tokio::test]
    async fn test_debug_mode_enriches_errors() {
        let endpoint = endpoint(&request_route(), HttpMethod::Post, context(true));
        let err = endpoint
            .handle(
                post_json("/request", &json!({"_id": "abc"}))
                    .with_header(HeaderName::from_static("x-trace"), HeaderValue::from_static("t1")),
            )
            .await
            .unwrap_err();
        assert!(err.data().contains_key("method_schema"));
        assert_eq!(err.data()["request_data"], json!({"_id": "abc"}));
        assert!(err.data()["request_headers"]
            .as_array()
            .unwrap()
            .contains(&json!(["x-trace", "t1"])));
        assert!(err.stack_trace().is_some());
    }

    #[test]
    fn test_render_causes_skips_backtrace() {
        assert_eq!(render_causes(&ActionError::msg("boom")), "boom");
    }

    #[tokio::test]
    async fn test_debug_trace_starts_with_error_message() {
        let route = Route::new(
            "/boom",
            RouteHandler::new().get(|_, _, _| async { Err::<Value, _>(ActionError::msg("boom")) }),
        );
        let err = endpoint(&route, HttpMethod::Get, context(true))
            .handle(Request::new(HttpMethod::Get, "/boom".parse().unwrap()))
            .await
            .unwrap_err();
        assert!(err.stack_trace().unwrap().starts_with("boom\n\n"));
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let route = Route::new(
            "/error",
            RouteHandler::new()
                .get(|_, _, _| async {
                    Err::<Value, _>(ApiError::new("Oh no! A value error!").into())
                })
                .post(|_, _, _| async {
                    Err::<Value, _>(HttpError::new(StatusCode::IM_A_TEAPOT).into())
                })
                .put(|_, _, _| async { Err::<Value, _>(ActionError::msg("boom")) })
                .delete(|_, _, _| async {
                    Err::<Value, _>(HttpError::without_status("aborted").into())
                }),
        );
        let ctx = context(false);
        let call = |method| {
            let endpoint = endpoint(&route, method, ctx.clone());
            async move {
                endpoint
                    .handle(Request::new(method, "/error".parse().unwrap()))
                    .await
                    .unwrap_err()
            }
        };

        let declared = call(HttpMethod::Get).await;
        assert_eq!(declared.kind(), ErrorKind::Declared);
        assert_eq!(declared.message(), "Oh no! A value error!");
        assert_eq!(declared.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let http = call(HttpMethod::Post).await;
        assert_eq!(http.status_code(), StatusCode::IM_A_TEAPOT);
        assert_eq!(http.message(), "[POST] Error handling request on URL [/error]!");

        let unexpected = call(HttpMethod::Put).await;
        assert_eq!(unexpected.message(), "boom");
        assert_eq!(unexpected.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let without_status = call(HttpMethod::Delete).await;
        assert_eq!(without_status.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_raw_values_are_wrapped() {
        let route = Route::new(
            "/raw",
            RouteHandler::new().get(|_, _, _| async { Ok::<_, ActionError>(json!({"ok": true})) }),
        );
        let response = endpoint(&route, HttpMethod::Get, context(false))
            .handle(Request::new(HttpMethod::Get, "/raw".parse().unwrap()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.json_object().unwrap()["ok"], json!(true));
    }

    #[tokio::test]
    async fn test_response_schema_blocks_invalid_body() {
        let route = Route::new(
            "/request",
            RouteHandler::new().put(|_, _, _| async { Ok::<_, ActionError>(json!({"other": 1})) }),
        )
        .response_schema(RouteSchema::new().put(json!({
            "type": "object",
            "properties": {"payload": {"type": "object"}},
            "required": ["payload"]
        })));
        let err = endpoint(&route, HttpMethod::Put, context(false))
            .handle(Request::new(HttpMethod::Put, "/request".parse().unwrap()))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.message().starts_with("Response schema validation error"));
    }

    #[tokio::test]
    async fn test_authorization_precedes_schema_and_is_not_enriched() {
        let route = request_route().permissions(RoutePermissions::new().post("user"));
        let err = endpoint(&route, HttpMethod::Post, context(true))
            .handle(post_json("/request", &json!({"_id": "abc"})))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(!err.data().contains_key("request_headers"));
        assert!(err.stack_trace().is_none());

        let open = context(true).with_role_gate(Arc::new(AllowAll));
        let err = endpoint(&route, HttpMethod::Post, open)
            .handle(post_json("/request", &json!({"_id": "abc"})))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_collection_released_on_every_outcome() {
        let database = Arc::new(MemoryDatabase::new());
        let route = Route::new(
            "/database",
            RouteHandler::new()
                .get(|_, _, collection| async move {
                    assert!(collection.is_some());
                    Ok::<_, ActionError>(json!({"ok": true}))
                })
                .post(|_, _, _| async { Err::<Value, _>(ApiError::new("declared").into()) })
                .put(|_, _, _| async { Err::<Value, _>(ActionError::msg("unexpected")) })
                .delete(|_, _, _| async {
                    if true {
                        panic!("action exploded");
                    }
                    Ok::<_, ActionError>(Value::Null)
                }),
        )
        .collection("sample");
        let ctx = context(false).with_provider(database.clone());

        for method in [
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Delete,
        ] {
            let _ = endpoint(&route, method, ctx.clone())
                .handle(Request::new(method, "/database".parse().unwrap()))
                .await;
        }

        let stats = database.stats();
        assert_eq!(stats.acquired, 4);
        assert_eq!(stats.released, 4);
        assert_eq!(database.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_panic_becomes_unexpected_error() {
        let route = Route::new(
            "/panic",
            RouteHandler::new().get(|_, _, _| async {
                if true {
                    panic!("action exploded");
                }
                Ok::<_, ActionError>(Value::Null)
            }),
        );
        let err = endpoint(&route, HttpMethod::Get, context(false))
            .handle(Request::new(HttpMethod::Get, "/panic".parse().unwrap()))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "action exploded");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_missing_provider_is_resource_error() {
        let route = Route::new(
            "/database",
            RouteHandler::new().get(|_, _, _| async { Ok::<_, ActionError>(Value::Null) }),
        )
        .collection("sample");
        let err = endpoint(&route, HttpMethod::Get, context(false))
            .handle(Request::new(HttpMethod::Get, "/database".parse().unwrap()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert!(err.message().contains("[sample]"));
    }

    #[tokio::test]
    async fn test_rejected_collection_is_not_leaked() {
        let database = Arc::new(MemoryDatabase::new());
        database.reject("sample");
        let route = Route::new(
            "/database",
            RouteHandler::new().get(|_, _, _| async { Ok::<_, ActionError>(Value::Null) }),
        )
        .collection("sample");
        let err = endpoint(&route, HttpMethod::Get, context(false).with_provider(database.clone()))
            .handle(Request::new(HttpMethod::Get, "/database".parse().unwrap()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert_eq!(database.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_route_without_collection_passes_none() {
        let route = Route::new(
            "/request",
            RouteHandler::new().get(|_, _, collection| async move {
                Ok::<_, ActionError>(json!({"has_collection": collection.is_some()}))
            }),
        );
        let response = endpoint(&route, HttpMethod::Get, context(false))
            .handle(Request::new(HttpMethod::Get, "/request".parse().unwrap()))
            .await
            .unwrap();
        assert_eq!(
            response.json_object().unwrap()["has_collection"],
            json!(false)
        );
    }

    fn echo_route(schema: RouteSchema) -> Route {
        Route::new(
            "/echo",
            RouteHandler::new().post(|_, payload, _| async move {
                Ok::<_, ActionError>(Value::Object(payload))
            }),
        )
        .request_schema(schema)
    }

    proptest! {
        #[test]
        fn prop_empty_schema_matches_no_schema(
            fields in proptest::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..6)
        ) {
            let body = json!(fields);
            let with_empty = endpoint(&echo_route(RouteSchema::new()), HttpMethod::Post, context(false));
            let without = endpoint(
                &Route::new("/echo", echo_route(RouteSchema::new()).handler().clone()),
                HttpMethod::Post,
                context(false),
            );

            let a = tokio_test::block_on(with_empty.handle(post_json("/echo", &body))).unwrap();
            let b = tokio_test::block_on(without.handle(post_json("/echo", &body))).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_valid_payload_reaches_action_unchanged(
            fields in proptest::collection::btree_map("[a-z]{1,8}", "[ -~]{0,12}", 0..6)
        ) {
            let schema = RouteSchema::new().post(json!({
                "type": "object",
                "additionalProperties": {"type": "string"}
            }));
            let endpoint = endpoint(&echo_route(schema), HttpMethod::Post, context(false));
            let body = json!(fields);

            let response = tokio_test::block_on(endpoint.handle(post_json("/echo", &body))).unwrap();
            prop_assert_eq!(Value::Object(response.json_object().unwrap().clone()), body);
        }
    }
}

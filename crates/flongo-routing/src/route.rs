//! Declarative routes.

use crate::handler::RouteHandler;
use crate::permissions::RoutePermissions;
use crate::RouteConfigError;
use flongo_middleware::RouteSchema;
use flongo_telemetry::LogLevel;

/// A URL bound to a handler, schemas, permissions and an optional
/// collection.
///
/// Routes are built once at startup and never change afterwards.
///
/// # Example
///
/// ```
/// use flongo_core::{ActionError, ApiResponse};
/// use flongo_routing::{Route, RouteHandler, RoutePermissions};
/// use flongo_telemetry::LogLevel;
///
/// let route = Route::new(
///     "/database",
///     RouteHandler::new().get(|_request, _payload, collection| async move {
///         let name = collection.map_or("No collection!".to_string(), |c| c.name().to_string());
///         Ok::<_, ActionError>(ApiResponse::message(name))
///     }),
/// )
/// .collection("sample")
/// .permissions(RoutePermissions::new().post("user"))
/// .log_level(LogLevel::Debug);
///
/// assert_eq!(route.collection_name(), Some("sample"));
/// assert!(route.cors_enabled());
/// ```
#[derive(Debug, Clone)]
pub struct Route {
    url: String,
    handler: RouteHandler,
    permissions: RoutePermissions,
    collection_name: Option<String>,
    request_schema: RouteSchema,
    response_schema: RouteSchema,
    cors_enabled: bool,
    log_level: LogLevel,
}

impl Route {
    /// Creates a route with no permissions, schemas or collection.
    ///
    /// CORS is enabled and the log level is `warn`.
    #[must_use]
    pub fn new(url: impl Into<String>, handler: RouteHandler) -> Self {
        Self {
            url: url.into(),
            handler,
            permissions: RoutePermissions::default(),
            collection_name: None,
            request_schema: RouteSchema::default(),
            response_schema: RouteSchema::default(),
            cors_enabled: true,
            log_level: LogLevel::default(),
        }
    }

    /// Binds a collection, handed to every action of this route.
    ///
    /// A blank name leaves the route without a collection.
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.collection_name = (!name.trim().is_empty()).then_some(name);
        self
    }

    /// Sets the per-method role requirements.
    #[must_use]
    pub fn permissions(mut self, permissions: RoutePermissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Sets the schemas inbound payloads are validated against.
    #[must_use]
    pub fn request_schema(mut self, schema: RouteSchema) -> Self {
        self.request_schema = schema;
        self
    }

    /// Sets the schemas JSON object responses are validated against.
    #[must_use]
    pub fn response_schema(mut self, schema: RouteSchema) -> Self {
        self.response_schema = schema;
        self
    }

    /// Enables or disables CORS headers for this route.
    #[must_use]
    pub fn cors(mut self, enabled: bool) -> Self {
        self.cors_enabled = enabled;
        self
    }

    /// Sets the minimum level of this route's log events.
    #[must_use]
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Returns the URL pattern.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the handler.
    #[must_use]
    pub const fn handler(&self) -> &RouteHandler {
        &self.handler
    }

    /// Returns the role requirements.
    #[must_use]
    pub const fn route_permissions(&self) -> &RoutePermissions {
        &self.permissions
    }

    /// Returns the bound collection name.
    #[must_use]
    pub fn collection_name(&self) -> Option<&str> {
        self.collection_name.as_deref()
    }

    /// Returns the request schemas.
    #[must_use]
    pub const fn request_schemas(&self) -> &RouteSchema {
        &self.request_schema
    }

    /// Returns the response schemas.
    #[must_use]
    pub const fn response_schemas(&self) -> &RouteSchema {
        &self.response_schema
    }

    /// Returns `true` if CORS headers are added for this route.
    #[must_use]
    pub const fn cors_enabled(&self) -> bool {
        self.cors_enabled
    }

    /// Returns the route's log threshold.
    #[must_use]
    pub const fn route_log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Checks everything that can be checked before registration.
    pub fn validate(&self) -> Result<(), RouteConfigError> {
        if !self.url.starts_with('/') {
            return Err(RouteConfigError::invalid_url(&self.url, "must start with '/'"));
        }
        if self.url.contains(['?', '#']) {
            return Err(RouteConfigError::invalid_url(
                &self.url,
                "must not contain a query or fragment",
            ));
        }
        if self.handler.is_empty() {
            return Err(RouteConfigError::NoMethods(self.url.clone()));
        }

        self.request_schema
            .check()
            .map_err(|source| RouteConfigError::InvalidSchema {
                url: self.url.clone(),
                side: "request",
                source,
            })?;
        self.response_schema
            .check()
            .map_err(|source| RouteConfigError::InvalidSchema {
                url: self.url.clone(),
                side: "response",
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flongo_core::ActionError;
    use serde_json::{json, Value};

    fn handler() -> RouteHandler {
        RouteHandler::new().get(|_, _, _| async { Ok::<_, ActionError>(Value::Null) })
    }

    #[test]
    fn test_defaults() {
        let route = Route::new("/request", handler());
        assert_eq!(route.url(), "/request");
        assert_eq!(route.collection_name(), None);
        assert_eq!(route.route_log_level(), LogLevel::Warn);
        assert!(route.cors_enabled());
        assert!(route.route_permissions().is_empty());
        assert!(route.validate().is_ok());
    }

    #[test]
    fn test_blank_collection_is_none() {
        assert_eq!(Route::new("/x", handler()).collection("  ").collection_name(), None);
    }

    #[test]
    fn test_validate_url() {
        assert!(matches!(
            Route::new("request", handler()).validate(),
            Err(RouteConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            Route::new("/request?x=1", handler()).validate(),
            Err(RouteConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_validate_requires_methods() {
        assert!(matches!(
            Route::new("/empty", RouteHandler::new()).validate(),
            Err(RouteConfigError::NoMethods(_))
        ));
    }

    #[test]
    fn test_validate_schemas() {
        let route = Route::new("/request", handler())
            .response_schema(RouteSchema::new().put(json!({"type": "widget"})));
        let err = route.validate().unwrap_err();
        assert!(matches!(err, RouteConfigError::InvalidSchema { side: "response", .. }));
    }
}

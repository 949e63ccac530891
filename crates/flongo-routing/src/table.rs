//! Route tables and registration with a router.

use crate::context::RouteContext;
use crate::endpoint::RouteEndpoint;
use crate::route::Route;
use crate::RouteConfigError;
use flongo_core::HttpMethod;
use flongo_telemetry::RouteLogger;
use std::collections::HashSet;
use std::sync::Arc;

/// Something that binds endpoints under `(url, method)`.
///
/// The server's dispatcher implements this; tests can collect endpoints in
/// a plain map.
pub trait Registrar {
    /// Binds `endpoint`. A second binding for the same pair is an error.
    fn register(
        &mut self,
        url: &str,
        method: HttpMethod,
        endpoint: Arc<RouteEndpoint>,
    ) -> Result<(), RouteConfigError>;
}

/// The routes of an application, in declaration order.
///
/// # Example
///
/// ```
/// use flongo_core::ActionError;
/// use flongo_routing::{Route, RouteHandler, RouteTable};
/// use serde_json::json;
///
/// let table = RouteTable::new()
///     .route(Route::new("/request", RouteHandler::new().get(|_, _, _| async {
///         Ok::<_, ActionError>(json!({"message": "Hello"}))
///     })))
///     .route(Route::new("/default", RouteHandler::crud()).collection("default"));
///
/// assert_eq!(table.len(), 2);
/// assert!(table.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route.
    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Adds a route in place.
    pub fn push(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Returns the routes.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if there are no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Validates every route and rejects `(url, method)` pairs declared
    /// more than once. `/a` and `/a/` are the same URL.
    pub fn validate(&self) -> Result<(), RouteConfigError> {
        let mut seen = HashSet::new();
        for route in &self.routes {
            route.validate()?;
            let url = normalize(route.url());
            for method in route.handler().methods() {
                if !seen.insert((url, method)) {
                    return Err(RouteConfigError::Duplicate {
                        url: route.url().to_string(),
                        method,
                    });
                }
            }
        }
        Ok(())
    }

    /// Wraps every action in the request pipeline and binds it with
    /// `registrar`. Returns the number of endpoints bound.
    ///
    /// Nothing is registered if validation fails.
    pub fn register(
        &self,
        registrar: &mut dyn Registrar,
        context: &RouteContext,
    ) -> Result<usize, RouteConfigError> {
        self.validate()?;

        let mut bound = 0;
        for route in &self.routes {
            let methods: Vec<&str> = route
                .handler()
                .methods()
                .map(|method| method.as_str())
                .collect();
            let logger = RouteLogger::new(route.url(), route.route_log_level());
            let label = methods.join(", ");
            logger.info(
                &label,
                format_args!("Created application route: [{}]", route.url()),
            );

            for (method, action) in route.handler().iter() {
                let endpoint = RouteEndpoint::new(route, method, Arc::clone(action), context.clone());
                registrar.register(route.url(), method, Arc::new(endpoint))?;
                logger.debug(
                    method.as_str(),
                    format_args!("Bound [{method}] action to [{}]", route.url()),
                );
                bound += 1;
            }

            let cors = if route.cors_enabled() && context.settings().server.enable_cors {
                "enabled"
            } else {
                "disabled"
            };
            logger.debug(&label, format_args!("CORS is {cors} for [{}]", route.url()));
        }

        tracing::info!(routes = self.routes.len(), endpoints = bound, "route table registered");
        Ok(bound)
    }
}

impl FromIterator<Route> for RouteTable {
    fn from_iter<I: IntoIterator<Item = Route>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().collect(),
        }
    }
}

impl Extend<Route> for RouteTable {
    fn extend<I: IntoIterator<Item = Route>>(&mut self, iter: I) {
        self.routes.extend(iter);
    }
}

fn normalize(url: &str) -> &str {
    match url.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::RouteHandler;
    use flongo_core::ActionError;
    use serde_json::Value;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct Collected {
        endpoints: BTreeMap<(String, HttpMethod), Arc<RouteEndpoint>>,
    }

    impl Registrar for Collected {
        fn register(
            &mut self,
            url: &str,
            method: HttpMethod,
            endpoint: Arc<RouteEndpoint>,
        ) -> Result<(), RouteConfigError> {
            let key = (url.to_string(), method);
            if self.endpoints.contains_key(&key) {
                return Err(RouteConfigError::Duplicate {
                    url: url.to_string(),
                    method,
                });
            }
            self.endpoints.insert(key, endpoint);
            Ok(())
        }
    }

    fn get() -> RouteHandler {
        RouteHandler::new().get(|_, _, _| async { Ok::<_, ActionError>(Value::Null) })
    }

    #[test]
    fn test_register_binds_every_method() {
        let table = RouteTable::new()
            .route(Route::new("/request", get()))
            .route(Route::new("/default", RouteHandler::crud()).collection("default"));
        let mut registrar = Collected::default();

        let bound = table
            .register(&mut registrar, &RouteContext::default())
            .unwrap();

        assert_eq!(bound, 6);
        let endpoint = &registrar.endpoints[&("/default".to_string(), HttpMethod::Patch)];
        assert_eq!(endpoint.collection_name(), Some("default"));
        assert_eq!(endpoint.method(), HttpMethod::Patch);
    }

    #[test]
    fn test_duplicate_pair_rejected_before_registration() {
        let table: RouteTable = [Route::new("/request", get()), Route::new("/request/", get())]
            .into_iter()
            .collect();
        let mut registrar = Collected::default();

        let err = table
            .register(&mut registrar, &RouteContext::default())
            .unwrap_err();

        assert_eq!(
            err,
            RouteConfigError::Duplicate {
                url: "/request/".to_string(),
                method: HttpMethod::Get,
            }
        );
        assert!(registrar.endpoints.is_empty());
    }

    #[test]
    fn test_same_url_different_methods_is_fine() {
        let table = RouteTable::new()
            .route(Route::new("/request", get()))
            .route(Route::new(
                "/request",
                RouteHandler::new().post(|_, _, _| async { Ok::<_, ActionError>(Value::Null) }),
            ));
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_invalid_route_fails_registration() {
        let table = RouteTable::new().route(Route::new("/empty", RouteHandler::new()));
        let err = table
            .register(&mut Collected::default(), &RouteContext::default())
            .unwrap_err();
        assert_eq!(err, RouteConfigError::NoMethods("/empty".to_string()));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("/a/"), "/a");
        assert_eq!(normalize("/a"), "/a");
    }
}

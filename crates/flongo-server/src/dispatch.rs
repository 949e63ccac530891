//! Request dispatch: path matching, method checks, CORS and error rendering.
//!
//! The [`Dispatcher`] is the router the route table registers with. The
//! server hands it every request after collecting the body; the test client
//! calls it directly.

use crate::translate::error_response;
use bytes::Bytes;
use flongo_config::ServerSettings;
use flongo_core::{ApiError, ApiResponse, HttpMethod, Request};
use flongo_middleware::{AllowedOrigins, CorsPolicy};
use flongo_router::{RouteError, Router};
use flongo_routing::{Registrar, RouteConfigError, RouteEndpoint};
use http::header::{ALLOW, ORIGIN};
use http::{HeaderValue, Method, StatusCode};
use std::sync::Arc;

const REQUEST_METHOD: &str = "access-control-request-method";
const REQUEST_HEADERS: &str = "access-control-request-headers";

/// Routes requests to registered endpoints.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    router: Router<Arc<RouteEndpoint>>,
    cors: Option<CorsPolicy>,
}

impl Dispatcher {
    /// Creates a dispatcher without CORS.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dispatcher with CORS configured from `settings`.
    #[must_use]
    pub fn from_settings(settings: &ServerSettings) -> Self {
        let cors = settings.enable_cors.then(|| {
            CorsPolicy::builder()
                .allowed_origins(AllowedOrigins::parse(&settings.cors_origins.join(",")))
                .allow_credentials(true)
                .build()
        });
        Self::new().with_cors(cors)
    }

    /// Replaces the CORS policy. `None` disables CORS for every route.
    #[must_use]
    pub fn with_cors(mut self, cors: Option<CorsPolicy>) -> Self {
        self.cors = cors;
        self
    }

    /// Returns the CORS policy, if enabled.
    #[must_use]
    pub const fn cors(&self) -> Option<&CorsPolicy> {
        self.cors.as_ref()
    }

    /// Returns the number of registered endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.router.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.router.is_empty()
    }

    /// Handles one request with a fully collected body.
    pub async fn dispatch(&self, request: http::Request<Bytes>) -> http::Response<Bytes> {
        let (parts, body) = request.into_parts();
        let path = parts.uri.path().to_string();
        let origin = header_str(&parts.headers, ORIGIN.as_str()).map(str::to_string);

        let Some((methods, params)) = self.router.match_path(&path) else {
            tracing::debug!(method = %parts.method, path, "no route matched");
            return into_http(error_response(
                &ApiError::request_handling(
                    format!("URL [{path}] was not found on this server"),
                    StatusCode::NOT_FOUND,
                )
                .with_data("url", path.as_str()),
            ));
        };

        let allowed = methods.allowed_methods();
        let cors = self
            .cors
            .as_ref()
            .filter(|_| methods.values().any(|endpoint| endpoint.cors_enabled()));

        if parts.method == Method::OPTIONS {
            if let Some(policy) = cors {
                return into_http(preflight(policy, &parts.headers, &allowed));
            }
        }

        let endpoint = HttpMethod::try_from(&parts.method)
            .ok()
            .and_then(|method| methods.get(method));
        let Some(endpoint) = endpoint else {
            return into_http(method_not_allowed(&parts.method, &path, &allowed));
        };

        let cors = self.cors.as_ref().filter(|_| endpoint.cors_enabled());
        let endpoint = Arc::clone(endpoint);
        let mut response = match Request::from_parts(parts, body) {
            Ok(request) => {
                let request = request.with_path_params(params.into_vec());
                match endpoint.handle(request).await {
                    Ok(response) => response,
                    Err(error) => error_response(&error),
                }
            }
            Err(e) => error_response(&ApiError::request_handling(
                e.to_string(),
                StatusCode::METHOD_NOT_ALLOWED,
            )),
        };

        if let Some(policy) = cors {
            policy.apply(origin.as_deref(), response.headers_mut());
        }
        into_http(response)
    }
}

impl Registrar for Dispatcher {
    fn register(
        &mut self,
        url: &str,
        method: HttpMethod,
        endpoint: Arc<RouteEndpoint>,
    ) -> Result<(), RouteConfigError> {
        self.router
            .insert(url, method, endpoint)
            .map_err(|error| match error {
                RouteError::Duplicate { path, method } => {
                    RouteConfigError::Duplicate { url: path, method }
                }
                other => RouteConfigError::Router {
                    url: url.to_string(),
                    reason: other.to_string(),
                },
            })
    }
}

fn header_str<'a>(headers: &'a http::HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn allow_header(allowed: &[HttpMethod]) -> Option<HeaderValue> {
    let names: Vec<&str> = allowed.iter().map(HttpMethod::as_str).collect();
    HeaderValue::from_str(&names.join(", ")).ok()
}

fn method_not_allowed(method: &Method, path: &str, allowed: &[HttpMethod]) -> ApiResponse {
    let names: Vec<&str> = allowed.iter().map(HttpMethod::as_str).collect();
    let error = ApiError::request_handling(
        format!("Method [{method}] is not allowed on URL [{path}]"),
        StatusCode::METHOD_NOT_ALLOWED,
    )
    .with_data("url", path)
    .with_data("allowed_methods", names);

    let mut response = error_response(&error);
    if let Some(value) = allow_header(allowed) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}

fn preflight(policy: &CorsPolicy, headers: &http::HeaderMap, allowed: &[HttpMethod]) -> ApiResponse {
    match policy.preflight(
        header_str(headers, ORIGIN.as_str()),
        header_str(headers, REQUEST_METHOD),
        header_str(headers, REQUEST_HEADERS),
        allowed,
    ) {
        Ok(cors_headers) => {
            let mut response = ApiResponse::no_content();
            response.headers_mut().extend(cors_headers);
            response
        }
        Err(rejection) => {
            tracing::debug!(%rejection, "CORS preflight rejected");
            error_response(
                &ApiError::request_handling(rejection.to_string(), StatusCode::FORBIDDEN)
                    .with_data("cors", true),
            )
        }
    }
}

fn into_http(response: ApiResponse) -> http::Response<Bytes> {
    let (status, headers, body) = response.into_parts();
    let mut response = http::Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

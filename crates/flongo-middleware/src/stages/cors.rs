//! Cross-Origin Resource Sharing.
//!
//! A [`CorsPolicy`] decorates responses of CORS-enabled routes and answers
//! `OPTIONS` preflight requests for them. Routing decides which requests are
//! preflights; the policy only computes headers.
//!
//! ## Credentials
//!
//! Browsers refuse `Access-Control-Allow-Origin: *` together with
//! `Access-Control-Allow-Credentials: true`. When credentials are enabled and
//! any origin is allowed, the request origin is echoed back instead of `*`.
//!
//! ## Example
//!
//! ```rust
//! use flongo_middleware::CorsPolicy;
//! use http::HeaderMap;
//!
//! let cors = CorsPolicy::builder()
//!     .allow_origin("https://app.example.com")
//!     .allow_credentials(true)
//!     .build();
//!
//! let mut headers = HeaderMap::new();
//! cors.apply(Some("https://app.example.com"), &mut headers);
//! assert_eq!(headers["access-control-allow-origin"], "https://app.example.com");
//! assert_eq!(headers["access-control-allow-credentials"], "true");
//! ```

use flongo_core::HttpMethod;
use http::header::{self, HeaderMap, HeaderValue};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

/// CORS header names.
pub mod headers {
    /// `Access-Control-Allow-Origin` header.
    pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
    /// `Access-Control-Allow-Methods` header.
    pub const ALLOW_METHODS: &str = "access-control-allow-methods";
    /// `Access-Control-Allow-Headers` header.
    pub const ALLOW_HEADERS: &str = "access-control-allow-headers";
    /// `Access-Control-Allow-Credentials` header.
    pub const ALLOW_CREDENTIALS: &str = "access-control-allow-credentials";
    /// `Access-Control-Max-Age` header.
    pub const MAX_AGE: &str = "access-control-max-age";
    /// `Access-Control-Expose-Headers` header.
    pub const EXPOSE_HEADERS: &str = "access-control-expose-headers";
    /// `Access-Control-Request-Method` header (preflight).
    pub const REQUEST_METHOD: &str = "access-control-request-method";
    /// `Access-Control-Request-Headers` header (preflight).
    pub const REQUEST_HEADERS: &str = "access-control-request-headers";
    /// `Origin` header.
    pub const ORIGIN: &str = "origin";
}

/// Represents the set of allowed origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Allow any origin.
    Any,
    /// Allow specific origins.
    List(BTreeSet<String>),
}

impl AllowedOrigins {
    /// Parses a comma-separated origin list where `*` means any origin.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let origins: BTreeSet<String> = value
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        if origins.contains("*") {
            Self::Any
        } else {
            Self::List(origins)
        }
    }

    /// Checks if an origin is allowed.
    #[must_use]
    pub fn is_allowed(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::List(origins) => origins.contains(origin),
        }
    }
}

/// A preflight request the policy refuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorsRejection {
    /// The preflight carried no `Origin`.
    #[error("Missing Origin header")]
    MissingOrigin,
    /// The origin is not in the allowed set.
    #[error("Origin [{0}] is not allowed")]
    OriginNotAllowed(String),
    /// The requested method is not bound on the route.
    #[error("Method [{0}] is not allowed")]
    MethodNotAllowed(String),
    /// A requested header is not allowed.
    #[error("Header [{0}] is not allowed")]
    HeaderNotAllowed(String),
}

/// Computes CORS response headers for enabled routes.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: AllowedOrigins,
    allowed_headers: BTreeSet<String>,
    expose_headers: BTreeSet<String>,
    allow_credentials: bool,
    max_age: Option<Duration>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allowed_origins: AllowedOrigins::Any,
            allowed_headers: ["content-type", "authorization", "x-user-id", "x-user-roles"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            expose_headers: BTreeSet::new(),
            allow_credentials: true,
            max_age: Some(Duration::from_secs(86400)),
        }
    }
}

impl CorsPolicy {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> CorsBuilder {
        CorsBuilder::new()
    }

    /// Returns the allowed origins.
    #[must_use]
    pub const fn allowed_origins(&self) -> &AllowedOrigins {
        &self.allowed_origins
    }

    fn allow_origin_value(&self, origin: Option<&str>) -> Option<HeaderValue> {
        match (&self.allowed_origins, origin) {
            (AllowedOrigins::Any, Some(origin)) if self.allow_credentials => {
                HeaderValue::from_str(origin).ok()
            }
            (AllowedOrigins::Any, _) => Some(HeaderValue::from_static("*")),
            (AllowedOrigins::List(origins), Some(origin)) if origins.contains(origin) => {
                HeaderValue::from_str(origin).ok()
            }
            (AllowedOrigins::List(_), _) => None,
        }
    }

    /// Adds CORS headers for a regular response.
    ///
    /// Nothing is added when the origin is not allowed.
    pub fn apply(&self, origin: Option<&str>, headers: &mut HeaderMap) {
        let Some(value) = self.allow_origin_value(origin) else {
            return;
        };

        let echoed = value != "*";
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        if echoed {
            headers.append(header::VARY, HeaderValue::from_static("Origin"));
        }
        if self.allow_credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        if !self.expose_headers.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&join(&self.expose_headers)) {
                headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, value);
            }
        }
    }

    /// Answers a preflight for a route binding `route_methods`.
    ///
    /// Returns the headers for a `204` response or the reason for refusal.
    pub fn preflight(
        &self,
        origin: Option<&str>,
        requested_method: Option<&str>,
        requested_headers: Option<&str>,
        route_methods: &[HttpMethod],
    ) -> Result<HeaderMap, CorsRejection> {
        let origin = origin.ok_or(CorsRejection::MissingOrigin)?;
        if !self.allowed_origins.is_allowed(origin) {
            return Err(CorsRejection::OriginNotAllowed(origin.to_string()));
        }

        if let Some(requested) = requested_method {
            let bound = requested
                .parse::<HttpMethod>()
                .is_ok_and(|method| route_methods.contains(&method));
            if !bound {
                return Err(CorsRejection::MethodNotAllowed(requested.to_string()));
            }
        }

        if let Some(requested) = requested_headers {
            if !self.allowed_headers.contains("*") {
                for name in requested.split(',').map(|h| h.trim().to_lowercase()) {
                    if !name.is_empty() && !self.allowed_headers.contains(&name) {
                        return Err(CorsRejection::HeaderNotAllowed(name));
                    }
                }
            }
        }

        let mut headers = HeaderMap::new();
        self.apply(Some(origin), &mut headers);

        let methods: Vec<&str> = route_methods.iter().map(HttpMethod::as_str).collect();
        if let Ok(value) = HeaderValue::from_str(&methods.join(", ")) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
        }
        if let Ok(value) = HeaderValue::from_str(&join(&self.allowed_headers)) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, value);
        }
        if let Some(max_age) = self.max_age {
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age.as_secs()));
        }
        Ok(headers)
    }
}

fn join(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Builder for [`CorsPolicy`].
#[derive(Debug, Clone, Default)]
pub struct CorsBuilder {
    policy: CorsPolicy,
}

impl CorsBuilder {
    /// Creates a builder allowing any origin with credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows any origin.
    #[must_use]
    pub fn allow_any_origin(mut self) -> Self {
        self.policy.allowed_origins = AllowedOrigins::Any;
        self
    }

    /// Adds an allowed origin, switching from "any" to an explicit list.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        if let AllowedOrigins::List(origins) = &mut self.policy.allowed_origins {
            origins.insert(origin.into());
        } else {
            self.policy.allowed_origins = AllowedOrigins::List(BTreeSet::from([origin.into()]));
        }
        self
    }

    /// Sets the allowed origins.
    #[must_use]
    pub fn allowed_origins(mut self, origins: AllowedOrigins) -> Self {
        self.policy.allowed_origins = origins;
        self
    }

    /// Adds an allowed request header.
    #[must_use]
    pub fn allow_header(mut self, header: impl Into<String>) -> Self {
        self.policy.allowed_headers.insert(header.into().to_lowercase());
        self
    }

    /// Sets headers exposed to scripts.
    #[must_use]
    pub fn expose_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy.expose_headers = headers.into_iter().map(|h| h.into().to_lowercase()).collect();
        self
    }

    /// Sets whether credentials (cookies, authorization headers) are allowed.
    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.policy.allow_credentials = allow;
        self
    }

    /// Sets the preflight cache duration.
    #[must_use]
    pub fn max_age(mut self, duration: Duration) -> Self {
        self.policy.max_age = Some(duration);
        self
    }

    /// Disables preflight caching.
    #[must_use]
    pub fn no_max_age(mut self) -> Self {
        self.policy.max_age = None;
        self
    }

    /// Builds the policy.
    #[must_use]
    pub fn build(self) -> CorsPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://app.example.com";

    #[test]
    fn test_parse_origins() {
        assert_eq!(AllowedOrigins::parse("*"), AllowedOrigins::Any);
        assert_eq!(AllowedOrigins::parse("https://a.com, *"), AllowedOrigins::Any);
        let list = AllowedOrigins::parse("https://a.com, https://b.com");
        assert!(list.is_allowed("https://b.com"));
        assert!(!list.is_allowed("https://c.com"));
    }

    #[test]
    fn test_credentials_echo_origin() {
        let mut headers = HeaderMap::new();
        CorsPolicy::default().apply(Some(ORIGIN), &mut headers);
        assert_eq!(headers[headers::ALLOW_ORIGIN], ORIGIN);
        assert_eq!(headers[headers::ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::VARY], "Origin");
    }

    #[test]
    fn test_wildcard_without_credentials() {
        let policy = CorsPolicy::builder().allow_credentials(false).build();
        let mut headers = HeaderMap::new();
        policy.apply(Some(ORIGIN), &mut headers);
        assert_eq!(headers[headers::ALLOW_ORIGIN], "*");
        assert!(headers.get(headers::ALLOW_CREDENTIALS).is_none());
    }

    #[test]
    fn test_disallowed_origin_gets_nothing() {
        let policy = CorsPolicy::builder().allow_origin("https://other.com").build();
        let mut headers = HeaderMap::new();
        policy.apply(Some(ORIGIN), &mut headers);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_preflight_lists_route_methods() {
        let headers = CorsPolicy::default()
            .preflight(
                Some(ORIGIN),
                Some("POST"),
                Some("Content-Type"),
                &[HttpMethod::Get, HttpMethod::Post],
            )
            .unwrap();
        assert_eq!(headers[headers::ALLOW_METHODS], "GET, POST");
        assert_eq!(headers[headers::MAX_AGE], "86400");
    }

    #[test]
    fn test_preflight_rejections() {
        let policy = CorsPolicy::builder().allow_origin(ORIGIN).build();
        assert_eq!(
            policy.preflight(None, None, None, &[HttpMethod::Get]),
            Err(CorsRejection::MissingOrigin)
        );
        assert!(matches!(
            policy.preflight(Some("https://evil.com"), None, None, &[HttpMethod::Get]),
            Err(CorsRejection::OriginNotAllowed(_))
        ));
        assert!(matches!(
            policy.preflight(Some(ORIGIN), Some("DELETE"), None, &[HttpMethod::Get]),
            Err(CorsRejection::MethodNotAllowed(_))
        ));
        assert_eq!(
            policy.preflight(Some(ORIGIN), Some("GET"), Some("x-secret"), &[HttpMethod::Get]),
            Err(CorsRejection::HeaderNotAllowed("x-secret".to_string()))
        );
    }
}

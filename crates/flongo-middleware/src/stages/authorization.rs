//! Role gate for routes that declare required roles.
//!
//! # Pipeline Position
//!
//! The gate runs after the payload is parsed and before request validation:
//!
//! ```text
//! Parse → [Authorization] → Validation → Action
//! ```
//!
//! The pipeline only calls the gate when the route lists at least one role
//! for the request method. A failure stops the request before any further
//! stage runs.
//!
//! # Gates
//!
//! - [`AllowAll`]: every caller passes (development and tests)
//! - [`DenyAll`]: every caller is rejected (rejection flow tests)
//! - [`IdentityRoleGate`]: resolves the caller and requires any one role

use crate::stages::identity::{HeaderIdentityResolver, IdentityResolver};
use flongo_core::{ApiError, Request};

/// Checks a request against the roles a route requires.
pub trait RoleGate: Send + Sync {
    /// Returns an authorization error if the caller may not proceed.
    ///
    /// `required` is never empty when called by the pipeline.
    fn check_roles(&self, request: &Request, required: &[String]) -> Result<(), ApiError>;
}

/// A gate that lets every request through.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl RoleGate for AllowAll {
    fn check_roles(&self, _request: &Request, _required: &[String]) -> Result<(), ApiError> {
        Ok(())
    }
}

/// A gate that rejects every request with 403.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl RoleGate for DenyAll {
    fn check_roles(&self, request: &Request, _required: &[String]) -> Result<(), ApiError> {
        Err(ApiError::forbidden("Access denied").with_data("url", request.path()))
    }
}

/// Resolves the caller and requires them to hold one of the listed roles.
///
/// Anonymous callers get `401`, authenticated callers without a matching
/// role get `403`.
///
/// # Example
///
/// ```rust
/// use flongo_core::{HttpMethod, Request};
/// use flongo_middleware::{IdentityRoleGate, RoleGate};
/// use http::StatusCode;
///
/// let gate = <IdentityRoleGate>::default();
/// let request = Request::new(HttpMethod::Post, "/permissions".parse().unwrap());
///
/// let err = gate.check_roles(&request, &["user".to_string()]).unwrap_err();
/// assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
/// ```
#[derive(Debug, Clone, Default)]
pub struct IdentityRoleGate<R = HeaderIdentityResolver> {
    resolver: R,
}

impl<R: IdentityResolver> IdentityRoleGate<R> {
    /// Creates a gate backed by `resolver`.
    #[must_use]
    pub const fn new(resolver: R) -> Self {
        Self { resolver }
    }
}

impl<R: IdentityResolver> RoleGate for IdentityRoleGate<R> {
    fn check_roles(&self, request: &Request, required: &[String]) -> Result<(), ApiError> {
        let identity = self.resolver.resolve(request);

        if identity.is_anonymous() {
            tracing::debug!(path = request.path(), "rejecting anonymous caller");
            return Err(
                ApiError::unauthorized("Authentication is required to access this resource")
                    .with_data("url", request.path()),
            );
        }

        if identity.has_any_role(required) {
            return Ok(());
        }

        tracing::debug!(
            caller = %identity.log_id(),
            path = request.path(),
            ?required,
            "caller lacks required role"
        );
        Err(
            ApiError::forbidden("Caller does not have a required role for this resource")
                .with_data("url", request.path())
                .with_data("required_roles", required.to_vec()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flongo_core::{ErrorKind, HttpMethod};
    use http::{HeaderName, HeaderValue, StatusCode};
    use serde_json::json;

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn request_as(user: Option<&'static str>, user_roles: Option<&'static str>) -> Request {
        let mut request = Request::new(HttpMethod::Put, "/permissions".parse().unwrap());
        if let Some(user) = user {
            request = request.with_header(
                HeaderName::from_static("x-user-id"),
                HeaderValue::from_static(user),
            );
        }
        if let Some(user_roles) = user_roles {
            request = request.with_header(
                HeaderName::from_static("x-user-roles"),
                HeaderValue::from_static(user_roles),
            );
        }
        request
    }

    #[test]
    fn test_allow_all() {
        assert!(AllowAll
            .check_roles(&request_as(None, None), &roles(&["admin"]))
            .is_ok());
    }

    #[test]
    fn test_deny_all() {
        let err = DenyAll
            .check_roles(&request_as(Some("u1"), Some("admin")), &roles(&["admin"]))
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_anonymous_is_unauthorized() {
        let err = <IdentityRoleGate>::default()
            .check_roles(&request_as(None, None), &roles(&["user"]))
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.data()["url"], json!("/permissions"));
    }

    #[test]
    fn test_missing_role_is_forbidden() {
        let err = <IdentityRoleGate>::default()
            .check_roles(&request_as(Some("u1"), Some("user")), &roles(&["admin"]))
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.data()["required_roles"], json!(["admin"]));
    }

    #[test]
    fn test_any_matching_role_passes() {
        assert!(<IdentityRoleGate>::default()
            .check_roles(
                &request_as(Some("u1"), Some("user,editor")),
                &roles(&["admin", "editor"])
            )
            .is_ok());
    }
}

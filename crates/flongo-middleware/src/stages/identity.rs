//! Caller identity resolution.
//!
//! Authentication happens upstream of the application (an ingress or proxy
//! validates credentials). The resolver only reads what that layer forwards.
//!
//! ## Headers
//!
//! | Header | Meaning |
//! |---|---|
//! | `x-user-id` | Authenticated user id. Absent means anonymous. |
//! | `x-user-roles` | Comma-separated role names. |

use flongo_core::{CallerIdentity, Request};

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the caller's roles.
pub const USER_ROLES_HEADER: &str = "x-user-roles";

/// Determines who is making a request.
pub trait IdentityResolver: Send + Sync {
    /// Returns the caller identity for `request`.
    fn resolve(&self, request: &Request) -> CallerIdentity;
}

/// Resolves identity from forwarded `x-user-id` / `x-user-roles` headers.
///
/// # Example
///
/// ```rust
/// use flongo_core::{HttpMethod, Request};
/// use flongo_middleware::{HeaderIdentityResolver, IdentityResolver};
/// use http::{HeaderName, HeaderValue};
///
/// let request = Request::new(HttpMethod::Get, "/permissions".parse().unwrap())
///     .with_header(HeaderName::from_static("x-user-id"), HeaderValue::from_static("u1"))
///     .with_header(HeaderName::from_static("x-user-roles"), HeaderValue::from_static("admin, editor"));
///
/// let identity = HeaderIdentityResolver::new().resolve(&request);
/// assert_eq!(identity.roles(), ["admin", "editor"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct HeaderIdentityResolver;

impl HeaderIdentityResolver {
    /// Creates a header resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl IdentityResolver for HeaderIdentityResolver {
    fn resolve(&self, request: &Request) -> CallerIdentity {
        let Some(user_id) = request
            .header(USER_ID_HEADER)
            .map(str::trim)
            .filter(|id| !id.is_empty())
        else {
            return CallerIdentity::anonymous();
        };

        let roles = request
            .header(USER_ROLES_HEADER)
            .map(|roles| {
                roles
                    .split(',')
                    .map(str::trim)
                    .filter(|role| !role.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        CallerIdentity::user(user_id, roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flongo_core::HttpMethod;
    use http::{HeaderName, HeaderValue};

    fn request(headers: &[(&'static str, &'static str)]) -> Request {
        headers.iter().fold(
            Request::new(HttpMethod::Get, "/test".parse().unwrap()),
            |request, (name, value)| {
                request.with_header(
                    HeaderName::from_static(name),
                    HeaderValue::from_static(value),
                )
            },
        )
    }

    #[test]
    fn test_no_headers_is_anonymous() {
        let identity = HeaderIdentityResolver::new().resolve(&request(&[]));
        assert!(identity.is_anonymous());
    }

    #[test]
    fn test_blank_user_id_is_anonymous() {
        let identity = HeaderIdentityResolver::new().resolve(&request(&[("x-user-id", "  ")]));
        assert!(identity.is_anonymous());
    }

    #[test]
    fn test_user_without_roles() {
        let identity = HeaderIdentityResolver::new().resolve(&request(&[("x-user-id", "u42")]));
        assert_eq!(identity.log_id(), "user:u42");
        assert!(identity.roles().is_empty());
    }

    #[test]
    fn test_roles_are_split_and_trimmed() {
        let identity = HeaderIdentityResolver::new().resolve(&request(&[
            ("x-user-id", "u42"),
            ("x-user-roles", "admin, ,reader "),
        ]));
        assert_eq!(identity.roles(), ["admin", "reader"]);
    }
}

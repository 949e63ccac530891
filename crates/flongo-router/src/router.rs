//! High-level router API.

use crate::error::RouteError;
use crate::method_router::MethodRouter;
use crate::node::Node;
use crate::params::Params;
use crate::RouteMatch;
use flongo_core::HttpMethod;

/// A radix tree router mapping `(path, method)` pairs to values.
///
/// # Route Priority
///
/// When multiple routes could match, the router prefers:
///
/// 1. **Static segments** (e.g., `/users/me`)
/// 2. **Parameter segments** (e.g., `/users/{id}`)
/// 3. **Wildcard segments** (e.g., `/files/*path`)
///
/// Trailing slashes are ignored, so `/users/` matches `/users`.
#[derive(Debug, Clone)]
pub struct Router<T> {
    root: Node<T>,
    route_count: usize,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            route_count: 0,
        }
    }

    /// Binds `value` to `(path, method)`.
    ///
    /// Fails if the pair is already bound or the pattern conflicts with an
    /// existing one.
    pub fn insert(&mut self, path: &str, method: HttpMethod, value: T) -> Result<(), RouteError> {
        self.root.insert(path, method, value)?;
        self.route_count += 1;
        Ok(())
    }

    /// Matches a path and method.
    #[must_use]
    pub fn match_route(&self, method: HttpMethod, path: &str) -> Option<RouteMatch<'_, T>> {
        let (methods, params) = self.root.match_path(path)?;
        let value = methods.get(method)?;
        Some(RouteMatch::new(value, params))
    }

    /// Matches a path without regard to method.
    ///
    /// Useful for answering `405 Method Not Allowed` and CORS preflights.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(&MethodRouter<T>, Params)> {
        self.root.match_path(path)
    }

    /// Returns the number of `(path, method)` pairs registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_new() {
        let router: Router<()> = Router::new();
        assert!(router.is_empty());
        assert_eq!(router.len(), 0);
    }

    #[test]
    fn test_router_counts_pairs() {
        let mut router = Router::new();
        router.insert("/users", HttpMethod::Get, 1).unwrap();
        router.insert("/users", HttpMethod::Post, 2).unwrap();
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_failed_insert_is_not_counted() {
        let mut router = Router::new();
        router.insert("/users", HttpMethod::Get, 1).unwrap();
        assert!(router.insert("/users", HttpMethod::Get, 2).is_err());
        assert_eq!(router.len(), 1);
        assert_eq!(
            router.match_route(HttpMethod::Get, "/users").map(|m| *m.value),
            Some(1)
        );
    }

    #[test]
    fn test_router_method_not_allowed() {
        let mut router = Router::new();
        router.insert("/users", HttpMethod::Get, "list").unwrap();

        assert!(router.match_route(HttpMethod::Post, "/users").is_none());
        let (methods, _) = router.match_path("/users").unwrap();
        assert_eq!(methods.allowed_methods(), vec![HttpMethod::Get]);
    }

    #[test]
    fn test_router_complex_paths() {
        let mut router = Router::new();
        router.insert("/api/v1/users", HttpMethod::Get, "listUsers").unwrap();
        router
            .insert("/api/v1/users/{userId}/posts/{postId}", HttpMethod::Get, "getUserPost")
            .unwrap();

        let m = router
            .match_route(HttpMethod::Get, "/api/v1/users/123/posts/456")
            .unwrap();
        assert_eq!(*m.value, "getUserPost");
        assert_eq!(m.params.get("userId"), Some("123"));
        assert_eq!(m.params.get("postId"), Some("456"));
    }

    #[test]
    fn test_router_static_vs_param_priority() {
        let mut router = Router::new();
        router.insert("/users/me", HttpMethod::Get, "me").unwrap();
        router.insert("/users/{id}", HttpMethod::Get, "byId").unwrap();

        assert_eq!(
            router.match_route(HttpMethod::Get, "/users/me").map(|m| *m.value),
            Some("me")
        );
        assert_eq!(
            router.match_route(HttpMethod::Get, "/users/42").map(|m| *m.value),
            Some("byId")
        );
    }

    #[test]
    fn test_router_wildcard() {
        let mut router = Router::new();
        router.insert("/files/<path:file>", HttpMethod::Get, "serve").unwrap();
        let m = router
            .match_route(HttpMethod::Get, "/files/images/logo.png")
            .unwrap();
        assert_eq!(m.params.get("file"), Some("images/logo.png"));
    }

    #[test]
    fn test_router_root_and_trailing_slash() {
        let mut router = Router::new();
        router.insert("/", HttpMethod::Get, "root").unwrap();
        router.insert("/users", HttpMethod::Get, "list").unwrap();

        assert!(router.match_route(HttpMethod::Get, "/").is_some());
        assert!(router.match_route(HttpMethod::Get, "/users/").is_some());
        assert!(router.match_route(HttpMethod::Get, "/posts").is_none());
    }
}

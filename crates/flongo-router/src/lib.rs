//! Radix tree router for Flongo.
//!
//! Routes are registered one `(path, method)` pair at a time. Registering the
//! same pair twice is an error, which lets route tables fail at startup
//! instead of silently shadowing a handler.
//!
//! Path patterns accept two parameter syntaxes:
//!
//! - `{id}` and `<id>` (or `<int:id>`) capture one segment
//! - `*rest` and `<path:rest>` capture everything that remains
//!
//! # Example
//!
//! ```rust
//! use flongo_core::HttpMethod;
//! use flongo_router::Router;
//!
//! let mut router = Router::new();
//! router.insert("/users", HttpMethod::Get, "listUsers").unwrap();
//! router.insert("/users/<id>", HttpMethod::Delete, "deleteUser").unwrap();
//!
//! let found = router.match_route(HttpMethod::Delete, "/users/123").unwrap();
//! assert_eq!(*found.value, "deleteUser");
//! assert_eq!(found.params.get("id"), Some("123"));
//!
//! assert!(router.insert("/users", HttpMethod::Get, "again").is_err());
//! ```
//!
//! # Architecture
//!
//! ```text
//!                    (root)
//!                      │
//!              ┌───────┴───────┐
//!              │               │
//!            "users"        "files"
//!              │               │
//!        ┌─────┴─────┐       "*path"
//!        │           │
//!       (leaf)    "{id}"
//!   [GET,POST]      │
//!                 (leaf)
//!              [GET,DELETE]
//! ```

mod error;
mod method_router;
mod node;
mod params;
mod router;

pub use error::RouteError;
pub use method_router::MethodRouter;
pub use node::Node;
pub use params::Params;
pub use router::Router;

/// A matched route with its registered value and extracted parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a, T> {
    /// The value registered for the matched path and method
    pub value: &'a T,
    /// Extracted path parameters
    pub params: Params,
}

impl<'a, T> RouteMatch<'a, T> {
    /// Creates a new route match.
    #[must_use]
    pub fn new(value: &'a T, params: Params) -> Self {
        Self { value, params }
    }
}

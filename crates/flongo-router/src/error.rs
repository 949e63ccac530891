//! Route registration errors.

use flongo_core::HttpMethod;
use thiserror::Error;

/// A route could not be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The `(path, method)` pair is already bound.
    #[error("route [{method}] {path} is already registered")]
    Duplicate {
        /// Path pattern as written at registration.
        path: String,
        /// Method already bound at that path.
        method: HttpMethod,
    },

    /// Two patterns use different parameter names at the same position.
    #[error("parameter {{{new}}} in {path} conflicts with existing parameter {{{existing}}}")]
    ParamConflict {
        /// Path pattern as written at registration.
        path: String,
        /// Name already registered at this position.
        existing: String,
        /// Name used by the new pattern.
        new: String,
    },

    /// A catch-all segment was followed by more segments.
    #[error("wildcard must be the last segment in {path}")]
    WildcardNotLast {
        /// Path pattern as written at registration.
        path: String,
    },
}

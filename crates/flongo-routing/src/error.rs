//! Route configuration errors.
//!
//! These are raised while building and registering routes, never while
//! handling a request.

use flongo_core::{HttpMethod, UnsupportedMethod};
use flongo_middleware::SchemaDocumentError;
use thiserror::Error;

/// A route could not be built or registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteConfigError {
    /// A handler or permission named a method outside the supported set.
    #[error("RouteHandler: {0}.")]
    InvalidMethod(#[from] UnsupportedMethod),

    /// The `(url, method)` pair is already bound.
    #[error("route [{method}] {url} is registered more than once")]
    Duplicate {
        /// The route URL.
        url: String,
        /// The method bound twice.
        method: HttpMethod,
    },

    /// The URL cannot be used as a route pattern.
    #[error("invalid route URL [{url}]: {reason}")]
    InvalidUrl {
        /// The route URL.
        url: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A route was declared without any method.
    #[error("route [{0}] does not bind any HTTP method")]
    NoMethods(String),

    /// A request or response schema is not a usable JSON Schema.
    #[error("route [{url}] has an invalid {side} schema: {source}")]
    InvalidSchema {
        /// The route URL.
        url: String,
        /// `"request"` or `"response"`.
        side: &'static str,
        /// The schema problem.
        #[source]
        source: SchemaDocumentError,
    },

    /// The router refused the pattern for another reason.
    #[error("router rejected [{url}]: {reason}")]
    Router {
        /// The route URL.
        url: String,
        /// The router's explanation.
        reason: String,
    },
}

impl RouteConfigError {
    /// Creates an [`RouteConfigError::InvalidUrl`].
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

//! # Flongo
//!
//! **Declarative routing and request handling over HTTP and a document
//! database.**
//!
//! An application is a table of routes. Each route names a URL, binds async
//! actions to HTTP methods and optionally declares a collection, JSON
//! schemas for requests and responses, required roles, a log level and
//! CORS. Every request runs the same pipeline:
//!
//! ```text
//! Request → Parse payload → Role gate → Request schema → Acquire collection
//!                                                                 ↓
//! Response ← Release collection ← Response schema ← Wrap reply ← Action
//! ```
//!
//! Failures anywhere in the pipeline become one JSON error shape
//! (`error`, `traceback`, `additional_data`) with the right status code.
//! In debug mode errors also carry the request headers, the parsed payload
//! and a stack trace.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flongo::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), flongo::Error> {
//!     Application::new()
//!         .route(Route::new(
//!             "/request",
//!             RouteHandler::new().get(|_, _, _| async {
//!                 Ok::<_, ActionError>(json!({"message": "Hello"}))
//!             }),
//!         ))
//!         .route(Route::new("/default", RouteHandler::crud()).collection("default"))
//!         .run()
//!         .await
//! }
//! ```
//!
//! ## Crates
//!
//! | Module | Contents |
//! |---|---|
//! | [`core`] | errors, methods, requests and responses |
//! | [`routing`] | routes, handlers, the route table and the pipeline |
//! | [`extract`] | payload parsing |
//! | [`middleware`] | schema validation, role gates, identity, CORS |
//! | [`database`] | collections, fixtures, indices |
//! | [`config`] | layered settings |
//! | [`telemetry`] | logging |
//! | [`server`] | dispatch and the HTTP server |

#![doc(html_root_url = "https://docs.rs/flongo/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod error;

pub use app::Application;
pub use error::{Error, Result};

// Re-export core types
pub use flongo_core as core;

// Re-export routing types
pub use flongo_routing as routing;

// Re-export router types
pub use flongo_router as router;

// Re-export extraction types
pub use flongo_extract as extract;

// Re-export middleware types
pub use flongo_middleware as middleware;

// Re-export database types
pub use flongo_database as database;

// Re-export configuration types
pub use flongo_config as config;

// Re-export logging types
pub use flongo_telemetry as telemetry;

// Re-export server types
pub use flongo_server as server;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use flongo::prelude::*;
///
/// let route = Route::new("/default", RouteHandler::crud()).collection("default");
/// assert_eq!(route.collection_name(), Some("default"));
/// ```
pub mod prelude {
    pub use crate::{Application, Error};

    pub use flongo_core::{
        ensure_field, ActionError, ApiError, ApiResponse, ErrorKind, HttpError, HttpMethod,
        Payload, Request, SchemaValidationError,
    };

    pub use flongo_routing::{
        action, ensure_collection, LogLevel, Route, RouteHandler, RoutePermissions, RouteSchema,
        RouteTable,
    };

    pub use flongo_database::{
        CollectionHandle, CollectionProvider, Document, Fixtures, Index, Indices, MemoryDatabase,
        SortOrder,
    };

    pub use flongo_middleware::{AllowAll, DenyAll, IdentityRoleGate, RoleGate};

    pub use flongo_config::{AppSettings, ConfigLoader};
}

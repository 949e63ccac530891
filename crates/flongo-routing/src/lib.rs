//! # Flongo Routing
//!
//! Declarative routes and the request pipeline behind them.
//!
//! A [`Route`] binds a URL to a [`RouteHandler`] (one action per HTTP
//! method), optional request and response schemas, per-method
//! [`RoutePermissions`] and an optional collection name. A [`RouteTable`]
//! validates all routes at startup and registers one [`RouteEndpoint`] per
//! `(url, method)` pair with a [`Registrar`], usually the server's
//! dispatcher.
//!
//! ## Example
//!
//! ```
//! use flongo_core::{ActionError, ApiResponse};
//! use flongo_routing::{Route, RouteHandler, RouteSchema, RouteTable};
//! use http::StatusCode;
//! use serde_json::json;
//!
//! let table = RouteTable::new().route(
//!     Route::new(
//!         "/request",
//!         RouteHandler::new().post(|_request, payload, _collection| async move {
//!             let record = payload["_id"].to_string();
//!             Ok::<_, ActionError>(
//!                 ApiResponse::json(json!({"sample_record": record, "created": true}))
//!                     .with_status(StatusCode::CREATED),
//!             )
//!         }),
//!     )
//!     .request_schema(RouteSchema::new().post(json!({
//!         "type": "object",
//!         "properties": {"_id": {"type": "integer"}},
//!         "required": ["_id"]
//!     }))),
//! );
//!
//! assert!(table.validate().is_ok());
//! ```

#![doc(html_root_url = "https://docs.rs/flongo-routing/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod context;
mod endpoint;
mod error;
mod guards;
mod handler;
mod permissions;
mod route;
mod table;

pub use action::{action, Action, ActionResult, BoxFuture};
pub use context::RouteContext;
pub use endpoint::RouteEndpoint;
pub use error::RouteConfigError;
pub use flongo_middleware::RouteSchema;
pub use flongo_telemetry::LogLevel;
pub use guards::ensure_collection;
pub use handler::RouteHandler;
pub use permissions::{IntoRoles, RoutePermissions};
pub use route::Route;
pub use table::{Registrar, RouteTable};

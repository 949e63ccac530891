//! # Flongo Server
//!
//! HTTP serving for Flongo applications.
//!
//! - [`Dispatcher`] - the router routes register with; answers `404`,
//!   `405`, CORS preflights and renders pipeline errors
//! - [`Server`] - hyper HTTP/1 server with body limits, request timeouts
//!   and graceful shutdown
//! - [`error_response`] - the uniform JSON error shape
//!
//! ## Example
//!
//! ```rust
//! use flongo_config::ServerSettings;
//! use flongo_core::ActionError;
//! use flongo_routing::{Route, RouteContext, RouteHandler, RouteTable};
//! use flongo_server::Dispatcher;
//! use serde_json::json;
//!
//! let table = RouteTable::new().route(Route::new(
//!     "/request",
//!     RouteHandler::new().get(|_, _, _| async {
//!         Ok::<_, ActionError>(json!({"message": "Hello"}))
//!     }),
//! ));
//!
//! let mut dispatcher = Dispatcher::from_settings(&ServerSettings::default());
//! table.register(&mut dispatcher, &RouteContext::default()).unwrap();
//! assert_eq!(dispatcher.len(), 1);
//! ```

#![doc(html_root_url = "https://docs.rs/flongo-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod dispatch;
mod error;
mod server;
mod shutdown;
mod translate;

pub use dispatch::Dispatcher;
pub use error::ServerError;
pub use server::{HttpResponse, Server};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
pub use translate::error_response;

//! Logging for Flongo.
//!
//! This crate owns everything between a `tracing` macro and the terminal:
//!
//! - [`LogLevel`]: the five levels routes and settings are configured with
//! - [`init_logging`]: installs a `tracing-subscriber` with JSON or pretty output
//! - [`RouteLogger`]: per-route gating, so one noisy route can log at `debug`
//!   while the rest of the application stays at `warn`
//!
//! # Targets
//!
//! Route events are emitted under the [`ROUTE_TARGET`] target. The subscriber
//! installed by [`init_logging`] lets that target through at every level and
//! leaves the gating to each route's [`RouteLogger`]. Everything else is
//! filtered by [`LogConfig::level`].
//!
//! # Example
//!
//! ```rust,ignore
//! use flongo_telemetry::{init_logging, LogConfig, LogLevel, RouteLogger};
//!
//! init_logging(&LogConfig::default())?;
//!
//! let logger = RouteLogger::new("/request", LogLevel::Debug);
//! logger.info("POST", "Received request");
//! ```

#![doc(html_root_url = "https://docs.rs/flongo-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod level;
pub mod logging;
pub mod route;

pub use error::TelemetryError;
pub use level::{LogFormat, LogLevel, ParseLevelError};
pub use logging::{create_env_filter, init_logging, LogConfig};
pub use route::{RouteLogger, ROUTE_TARGET};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

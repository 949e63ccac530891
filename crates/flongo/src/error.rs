//! Startup errors.

use flongo_config::ConfigError;
use flongo_database::DatabaseError;
use flongo_routing::RouteConfigError;
use flongo_server::ServerError;
use flongo_telemetry::TelemetryError;
use thiserror::Error;

/// Anything that stops an [`Application`](crate::Application) from starting
/// or keeps it from serving.
///
/// Errors raised while handling a request never surface here; they are
/// rendered into responses by the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings could not be loaded or are invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A route was misconfigured or collided with another.
    #[error("route configuration error: {0}")]
    Route(#[from] RouteConfigError),

    /// Applying indices or fixtures failed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// The server failed to bind or serve.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// Logging could not be initialised.
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

/// Result alias for startup operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

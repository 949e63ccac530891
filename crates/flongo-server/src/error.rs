//! Server errors.

use flongo_config::ConfigError;
use std::net::SocketAddr;
use thiserror::Error;

/// The server could not start or stopped abnormally.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured host and port do not form a socket address.
    #[error("invalid listen address: {0}")]
    Address(#[from] ConfigError),

    /// Binding the listener failed.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        /// The address.
        addr: SocketAddr,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// An I/O error on the listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

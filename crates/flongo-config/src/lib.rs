//! Layered configuration for Flongo applications.
//!
//! Settings come from, in increasing precedence: built-in defaults, an
//! optional TOML or JSON file, an optional `.env` file, and the process
//! environment. The environment variable names are fixed:
//!
//! | Variable | Default |
//! |---|---|
//! | `APP_HOST` | `0.0.0.0` |
//! | `APP_PORT` | `3000` |
//! | `APP_ENV` | `development` |
//! | `APP_DEBUG_MODE` | `true` |
//! | `APP_ENABLE_CORS` | `true` |
//! | `APP_CORS_ORIGINS` | `*` |
//! | `APP_REQUEST_TIMEOUT` | `30` (seconds) |
//! | `APP_MAX_BODY_BYTES` | `10485760` |
//! | `APP_LOG_LEVEL` | `warn` |
//! | `APP_CONFIG_LOG_LEVEL` | `warn` |
//! | `APP_LOG_FORMAT` | `pretty` |
//! | `MONGODB_HOST` | `localhost` |
//! | `MONGODB_PORT` | `27017` |
//! | `MONGODB_USERNAME` | empty |
//! | `MONGODB_PASSWORD` | empty |
//! | `MONGODB_DEFAULT_DATABASE` | `db` |
//! | `MONGODB_CONNECTION_TIMEOUT` | `600` (milliseconds) |
//!
//! Booleans accept `true/false/1/0/yes/no/on/off`.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! debug_mode = false
//! cors_origins = ["https://app.example.com"]
//!
//! [database]
//! host = "cluster0.abcde.mongodb.net"
//! default_database = "shop"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

#![doc(html_root_url = "https://docs.rs/flongo-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod loader;
mod settings;

pub use error::ConfigError;
pub use flongo_telemetry::LogConfig;
pub use loader::ConfigLoader;
pub use settings::{AppSettings, DatabaseSettings, ServerSettings};

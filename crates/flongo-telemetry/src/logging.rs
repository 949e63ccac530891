//! Subscriber setup.
//!
//! # Example
//!
//! ```rust,ignore
//! use flongo_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(url = "/request", "Route created");
//! ```

use crate::error::TelemetryError;
use crate::level::{LogFormat, LogLevel};
use crate::route::ROUTE_TARGET;
use crate::TelemetryResult;
use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Threshold for application logs outside any route.
    pub level: LogLevel,

    /// Threshold for logs emitted while loading configuration.
    pub config_level: LogLevel,

    /// Output format.
    pub format: LogFormat,

    /// Extra filter directives appended to the level, e.g. `hyper=warn`.
    pub directives: Option<String>,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include target (module path).
    pub include_target: bool,

    /// Whether to color pretty output.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Warn,
            config_level: LogLevel::Warn,
            format: LogFormat::Pretty,
            directives: None,
            file_line_info: false,
            include_target: true,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Verbose human-readable output for local work.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            config_level: LogLevel::Debug,
            file_line_info: true,
            ..Self::default()
        }
    }

    /// JSON output at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            ansi: false,
            ..Self::default()
        }
    }

    /// Returns the filter string the subscriber is built with.
    ///
    /// Route events always pass the filter; [`RouteLogger`](crate::RouteLogger)
    /// applies each route's own threshold.
    #[must_use]
    pub fn filter_directives(&self) -> String {
        let mut directives = format!("{},{ROUTE_TARGET}=trace", self.level.as_filter_directive());
        if let Some(extra) = self.directives.as_deref().filter(|d| !d.trim().is_empty()) {
            directives.push(',');
            directives.push_str(extra.trim());
        }
        directives
    }
}

/// Initializes the global subscriber.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidFilter` for malformed directives and
/// `TelemetryError::LoggingInit` if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.filter_directives())?;

    match config.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_file(config.file_line_info)
                .with_line_number(config.file_line_info)
                .with_target(config.include_target)
                .with_filter(filter);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .try_init()
                .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_ansi(config.ansi)
                .with_file(config.file_line_info)
                .with_line_number(config.file_line_info)
                .with_target(config.include_target)
                .with_filter(filter);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .try_init()
                .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
        }
    }

    Ok(())
}

/// Creates an env filter from a string such as `"warn,flongo_server=debug"`.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter(format!("{filter}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_presets() {
        assert_eq!(LogConfig::development().level, LogLevel::Debug);
        let production = LogConfig::production();
        assert_eq!(production.format, LogFormat::Json);
        assert!(!production.ansi);
    }

    #[test]
    fn test_filter_lets_routes_through() {
        let config = LogConfig::default();
        assert_eq!(config.filter_directives(), "warn,flongo::route=trace");

        let config = LogConfig {
            level: LogLevel::Critical,
            directives: Some(" hyper=warn ".to_string()),
            ..LogConfig::default()
        };
        assert_eq!(config.filter_directives(), "error,flongo::route=trace,hyper=warn");
        assert!(create_env_filter(&config.filter_directives()).is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LogConfig = serde_json::from_str(r#"{"level": "debug", "format": "json"}"#).unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.enabled);
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_logging(&config).is_ok());
    }
}

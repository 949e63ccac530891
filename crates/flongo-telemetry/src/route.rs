//! Per-route log gating.

use crate::level::LogLevel;
use std::fmt::Display;
use std::sync::Arc;

/// Target every route event is emitted under.
pub const ROUTE_TARGET: &str = "flongo::route";

/// Emits events for one route, dropping those below the route's threshold.
///
/// Events carry `route` and `method` fields. Cloning is cheap.
///
/// # Example
///
/// ```rust
/// use flongo_telemetry::{LogLevel, RouteLogger};
///
/// let logger = RouteLogger::new("/request", LogLevel::Info);
/// assert!(logger.enabled(LogLevel::Error));
/// assert!(!logger.enabled(LogLevel::Debug));
/// logger.info("GET", "Received request");
/// ```
#[derive(Debug, Clone)]
pub struct RouteLogger {
    route: Arc<str>,
    threshold: LogLevel,
}

impl RouteLogger {
    /// Creates a logger for `route` that emits at `threshold` and above.
    #[must_use]
    pub fn new(route: impl Into<Arc<str>>, threshold: LogLevel) -> Self {
        Self {
            route: route.into(),
            threshold,
        }
    }

    /// Returns the route this logger is bound to.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Returns the threshold.
    #[must_use]
    pub const fn threshold(&self) -> LogLevel {
        self.threshold
    }

    /// Returns `true` if events at `level` are emitted.
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.threshold
    }

    /// Emits `message` at `level` if the threshold allows it.
    pub fn log(&self, level: LogLevel, method: &str, message: impl Display) {
        if !self.enabled(level) {
            return;
        }

        let route = &*self.route;
        match level {
            LogLevel::Debug => {
                tracing::debug!(target: "flongo::route", route, method, "{message}");
            }
            LogLevel::Info => {
                tracing::info!(target: "flongo::route", route, method, "{message}");
            }
            LogLevel::Warn => {
                tracing::warn!(target: "flongo::route", route, method, "{message}");
            }
            LogLevel::Error => {
                tracing::error!(target: "flongo::route", route, method, "{message}");
            }
            LogLevel::Critical => {
                tracing::error!(target: "flongo::route", route, method, critical = true, "{message}");
            }
        }
    }

    /// Emits at `debug`.
    pub fn debug(&self, method: &str, message: impl Display) {
        self.log(LogLevel::Debug, method, message);
    }

    /// Emits at `info`.
    pub fn info(&self, method: &str, message: impl Display) {
        self.log(LogLevel::Info, method, message);
    }

    /// Emits at `warn`.
    pub fn warn(&self, method: &str, message: impl Display) {
        self.log(LogLevel::Warn, method, message);
    }

    /// Emits at `error`.
    pub fn error(&self, method: &str, message: impl Display) {
        self.log(LogLevel::Error, method, message);
    }
}

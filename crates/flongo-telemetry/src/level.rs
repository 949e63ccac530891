//! Log levels and output formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;

/// Severity threshold for application and route logging.
///
/// Levels are ordered: `Debug < Info < Warn < Error < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Normal operation.
    Info,
    /// Something unexpected that was handled.
    #[default]
    #[serde(alias = "warning")]
    Warn,
    /// A request or operation failed.
    Error,
    /// The application cannot continue normally.
    Critical,
}

/// A level name outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level [{0}], expected one of debug, info, warn, error, critical")]
pub struct ParseLevelError(pub String);

impl LogLevel {
    /// Returns the lower-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// Returns the `tracing` level events at this severity are emitted with.
    ///
    /// `tracing` has no critical level, so `Critical` maps to `ERROR`.
    #[must_use]
    pub const fn as_tracing_level(&self) -> Level {
        match self {
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Emits `message` at this level with no route context.
    pub fn emit(&self, message: impl fmt::Display) {
        match self {
            Self::Debug => tracing::debug!("{message}"),
            Self::Info => tracing::info!("{message}"),
            Self::Warn => tracing::warn!("{message}"),
            Self::Error => tracing::error!("{message}"),
            Self::Critical => tracing::error!(critical = true, "{message}"),
        }
    }

    /// Returns the `EnvFilter` directive for this threshold.
    #[must_use]
    pub const fn as_filter_directive(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable multi-line output.
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("expected 'json' or 'pretty', got '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!(" Warning ".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("critical".parse::<LogLevel>(), Ok(LogLevel::Critical));
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Critical);
        assert_eq!(LogLevel::default(), LogLevel::Warn);
    }

    #[test]
    fn test_critical_maps_to_error() {
        assert_eq!(LogLevel::Critical.as_tracing_level(), Level::ERROR);
        assert_eq!(LogLevel::Critical.as_filter_directive(), "error");
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&LogLevel::Info).unwrap(), "\"info\"");
        let level: LogLevel = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(level, LogLevel::Warn);
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("xml".parse::<LogFormat>().is_err());
    }
}

//! Errors raised while loading settings.

use std::path::PathBuf;
use thiserror::Error;

/// Settings could not be loaded or failed validation.
///
/// Every variant names its source (a file, a variable or a field) so a
/// startup failure can be fixed without reading code.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A settings file passed with `with_file` does not exist.
    #[error("settings file {path} does not exist")]
    MissingFile {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// A settings file exists but could not be read.
    #[error("cannot read settings file {path}")]
    Unreadable {
        /// The file.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A TOML document is malformed or does not match [`AppSettings`](crate::AppSettings).
    #[error("malformed TOML settings: {0}")]
    Toml(#[from] toml::de::Error),

    /// A JSON document is malformed or does not match [`AppSettings`](crate::AppSettings).
    #[error("malformed JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    /// Only `toml` and `json` documents are understood.
    #[error("settings format [{0}] is not supported, use toml or json")]
    UnsupportedFormat(String),

    /// A `.env` file was found but is malformed.
    #[error(".env file could not be loaded: {0}")]
    Dotenv(String),

    /// An `APP_*` or `MONGODB_*` variable holds a value of the wrong shape.
    #[error("environment variable {name} is invalid: {reason}")]
    Variable {
        /// The variable.
        name: String,
        /// What was expected.
        reason: String,
    },

    /// A loaded value breaks a rule deserialization cannot express.
    #[error("setting {field} is invalid: {reason}")]
    Invalid {
        /// Dotted path of the setting, such as `server.host`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// A missing settings file.
    pub fn missing_file(path: impl Into<PathBuf>) -> Self {
        Self::MissingFile { path: path.into() }
    }

    /// An unreadable settings file.
    pub fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    /// A setting that failed validation.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// An environment variable that could not be parsed.
    pub fn variable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Variable {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

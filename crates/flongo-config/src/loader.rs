//! Configuration loader with layered approach.

use std::env;
use std::fs;
use std::path::Path;

use flongo_telemetry::{LogFormat, LogLevel};

use crate::{AppSettings, ConfigError};

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values
/// 2. Configuration file (TOML or JSON)
/// 3. `.env` file, loaded into the process environment
/// 4. Environment variables
/// 5. Explicit overrides passed to [`ConfigLoader::with_var`]
///
/// # Example
///
/// ```no_run
/// use flongo_config::ConfigLoader;
///
/// # fn main() -> Result<(), flongo_config::ConfigError> {
/// let settings = ConfigLoader::new()
///     .with_optional_file("flongo.toml")?
///     .with_dotenv()?
///     .load()?;
///
/// println!("Listening on {}", settings.server.socket_addr()?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    settings: AppSettings,
    read_env: bool,
    overrides: Vec<(String, String)>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader that starts from defaults and reads the environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: AppSettings::default(),
            read_env: true,
            overrides: Vec::new(),
        }
    }

    /// Starts from the given settings instead of the defaults.
    #[must_use]
    pub fn with_settings(mut self, settings: AppSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Loads a TOML or JSON file, chosen by extension.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::missing_file(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::unreadable(path, e))?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        self.settings = Self::parse(&content, &format)?;
        Ok(self)
    }

    /// Loads a file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads settings from a string in `"toml"` or `"json"` format.
    ///
    /// ```
    /// use flongo_config::ConfigLoader;
    ///
    /// let settings = ConfigLoader::new()
    ///     .without_env()
    ///     .with_string("[server]\nport = 8080", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(settings.server.port, 8080);
    /// assert_eq!(settings.server.host, "0.0.0.0");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.settings = Self::parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Loads a `.env` file from the working directory into the environment.
    ///
    /// A missing file is not an error.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::Dotenv(e.to_string())),
        }
    }

    /// Skips the process environment.
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Sets a variable as if it came from the environment.
    ///
    /// Overrides apply after the process environment.
    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((name.into(), value.into()));
        self
    }

    /// Applies the environment, validates, and logs every value.
    pub fn load(mut self) -> Result<AppSettings, ConfigError> {
        if self.read_env {
            for (name, value) in env::vars() {
                self.apply_env_var(&name, &value)?;
            }
        }

        for (name, value) in std::mem::take(&mut self.overrides) {
            self.apply_env_var(&name, &value)?;
        }

        self.settings.validate()?;

        let level = self.settings.logging.config_level;
        for (name, value) in self.settings.describe() {
            level.emit(format_args!("Loaded configuration {name} = [{value}]"));
        }

        Ok(self.settings)
    }

    fn parse(content: &str, format: &str) -> Result<AppSettings, ConfigError> {
        match format {
            "toml" => Ok(toml::from_str(content)?),
            "json" => Ok(serde_json::from_str(content)?),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    // Returns whether the variable is one the application reads.
    fn apply_env_var(&mut self, name: &str, value: &str) -> Result<bool, ConfigError> {
        let server = &mut self.settings.server;
        let database = &mut self.settings.database;
        let logging = &mut self.settings.logging;

        match name {
            "APP_HOST" => server.host = value.to_string(),
            "APP_PORT" => server.port = parse_number(name, value)?,
            "APP_ENV" => server.env = value.to_string(),
            "APP_DEBUG_MODE" => server.debug_mode = parse_flag(name, value)?,
            "APP_ENABLE_CORS" => server.enable_cors = parse_flag(name, value)?,
            "APP_CORS_ORIGINS" => {
                server.cors_origins = value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "APP_REQUEST_TIMEOUT" => server.request_timeout_secs = parse_number(name, value)?,
            "APP_MAX_BODY_BYTES" => server.max_body_bytes = parse_number(name, value)?,
            "APP_LOG_LEVEL" => logging.level = parse_level(name, value)?,
            "APP_CONFIG_LOG_LEVEL" => logging.config_level = parse_level(name, value)?,
            "APP_LOG_FORMAT" => {
                logging.format = value
                    .parse::<LogFormat>()
                    .map_err(|reason| ConfigError::variable(name, reason))?;
            }
            "MONGODB_HOST" => database.host = value.to_string(),
            "MONGODB_PORT" => database.port = parse_number(name, value)?,
            "MONGODB_USERNAME" => database.username = value.to_string(),
            "MONGODB_PASSWORD" => database.password = value.to_string(),
            "MONGODB_DEFAULT_DATABASE" => database.default_database = value.to_string(),
            "MONGODB_CONNECTION_TIMEOUT" => {
                database.connection_timeout_ms = parse_number(name, value)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::variable(name, "expected boolean"))
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::variable(name, "expected integer"))
}

fn parse_level(name: &str, value: &str) -> Result<LogLevel, ConfigError> {
    value
        .parse()
        .map_err(|e: flongo_telemetry::ParseLevelError| ConfigError::variable(name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn loader() -> ConfigLoader {
        ConfigLoader::new().without_env()
    }

    #[test]
    fn test_defaults() {
        let settings = loader().load().unwrap();
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn test_vars_override_defaults() {
        let settings = loader()
            .with_var("APP_PORT", "8080")
            .with_var("APP_DEBUG_MODE", "off")
            .with_var("APP_CORS_ORIGINS", "https://a.com, https://b.com")
            .with_var("APP_LOG_LEVEL", "DEBUG")
            .with_var("APP_LOG_FORMAT", "json")
            .with_var("MONGODB_HOST", "cluster0.x.mongodb.net")
            .with_var("MONGODB_CONNECTION_TIMEOUT", "1500")
            .load()
            .unwrap();

        assert_eq!(settings.server.port, 8080);
        assert!(!settings.server.debug_mode);
        assert_eq!(settings.server.cors_origins, vec!["https://a.com", "https://b.com"]);
        assert_eq!(settings.logging.level, LogLevel::Debug);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert!(settings.database.is_atlas());
        assert_eq!(settings.database.connection_timeout_ms, 1500);
    }

    #[test]
    fn test_malformed_values_name_the_variable() {
        let err = loader().with_var("APP_PORT", "eighty").load().unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));

        let err = loader().with_var("APP_ENABLE_CORS", "maybe").load().unwrap_err();
        assert!(err.to_string().contains("APP_ENABLE_CORS"));

        let err = loader().with_var("APP_LOG_LEVEL", "loud").load().unwrap_err();
        assert!(err.to_string().contains("APP_LOG_LEVEL"));
    }

    #[test]
    fn test_unrelated_variables_are_ignored() {
        let mut loader = loader();
        assert!(!loader.apply_env_var("PATH", "/usr/bin").unwrap());
        assert!(loader.apply_env_var("APP_ENV", "production").unwrap());
        assert_eq!(loader.settings.server.env, "production");
    }

    #[test]
    fn test_toml_file_then_vars() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 4000\nenv = \"staging\"\n\n[database]\ndefault_database = \"shop\""
        )
        .unwrap();

        let settings = loader()
            .with_file(file.path())
            .unwrap()
            .with_var("APP_PORT", "5000")
            .load()
            .unwrap();

        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.server.env, "staging");
        assert_eq!(settings.database.default_database, "shop");
        assert_eq!(settings.database.host, "localhost");
    }

    #[test]
    fn test_json_string() {
        let settings = loader()
            .with_string(r#"{"logging": {"level": "error"}}"#, "JSON")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(settings.logging.level, LogLevel::Error);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result = loader().with_string("[server]\nprot = 1", "toml");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_missing_and_optional_files() {
        assert!(matches!(
            loader().with_file("/nonexistent/flongo.toml"),
            Err(ConfigError::MissingFile { .. })
        ));
        assert!(loader().with_optional_file("/nonexistent/flongo.toml").is_ok());
        assert!(matches!(
            loader().with_string("", "yaml"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_parse_bool() {
        for truthy in ["true", "True", "1", "yes", "on"] {
            assert_eq!(parse_bool(truthy), Some(true));
        }
        for falsy in ["false", "FALSE", "0", "no", "off"] {
            assert_eq!(parse_bool(falsy), Some(false));
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }
}

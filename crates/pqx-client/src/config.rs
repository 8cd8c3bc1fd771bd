//! Connection configuration.

use std::str::FromStr;

use crate::error::Error;
use crate::instrumentation::SanitizationConfig;

/// Configuration applied when a [`Connection`](crate::Connection) is built
/// around a backend.
///
/// Use [`Config::new()`] and the builder methods, or
/// [`Config::from_connection_string()`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Config {
    /// Connection name, used in descriptions and log fields.
    pub name: Option<String>,

    /// Session variables set, in order, when the connection is created.
    pub session_variables: Vec<(String, String)>,

    /// Statement sanitization for log output.
    pub sanitization: SanitizationConfig,
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `key=value;key=value` connection string.
    ///
    /// Recognised keys (case-insensitive):
    ///
    /// - `name` / `application name`: connection name
    /// - `set <variable>`: a session variable to set on connect
    /// - `sanitize`: `true`/`false`, statement sanitization in logs
    /// - `max statement length`: truncation length for logged statements
    ///
    /// Unknown keys are ignored.
    pub fn from_connection_string(conn_str: &str) -> Result<Self, Error> {
        let mut config = Self::default();

        for part in conn_str.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("invalid key-value: {part}")))?;

            let key = key.trim().to_lowercase();
            let value = value.trim();

            if key == "set" {
                return Err(Error::Config(format!("missing variable name: {part}")));
            }
            if let Some(variable) = key.strip_prefix("set ") {
                config
                    .session_variables
                    .push((variable.trim().to_string(), value.to_string()));
                continue;
            }

            match key.as_str() {
                "name" | "application name" | "application_name" => {
                    config.name = (!value.is_empty()).then(|| value.to_string());
                }
                "sanitize" => {
                    config.sanitization.enabled = parse_bool(value)
                        .ok_or_else(|| Error::Config(format!("invalid boolean: {value}")))?;
                }
                "max statement length" => {
                    config.sanitization.max_length = value.parse().map_err(|_| {
                        Error::Config(format!("invalid statement length: {value}"))
                    })?;
                }
                _ => {
                    tracing::debug!(
                        key = key,
                        value = value,
                        "ignoring unknown connection string option"
                    );
                }
            }
        }

        Ok(config)
    }

    /// Set the connection name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a session variable to set when the connection is created.
    #[must_use]
    pub fn session_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.session_variables.push((name.into(), value.into()));
        self
    }

    /// Set the statement sanitization configuration.
    #[must_use]
    pub fn sanitization(mut self, sanitization: SanitizationConfig) -> Self {
        self.sanitization = sanitization;
        self
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_connection_string(s)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `tripwire.toml` in the working directory. Every field has a
//! default so the file is optional. Environment variables take precedence
//! over file values.

use std::path::Path;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rule definition source.
    pub rules: RulesConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Console input adapter.
    pub console: ConsoleConfig,
}

/// Where rule definitions are read from.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// JSON file holding one rule or an array of rules.
    pub path: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Read commands from stdin.
    pub enabled: bool,
}

impl Config {
    /// Load configuration from `tripwire.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("tripwire.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("TRIPWIRE_RULES") {
            self.rules.path = val;
        }
        if let Some(val) = lookup("TRIPWIRE_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(enabled) = lookup("TRIPWIRE_CONSOLE").as_deref().and_then(parse_flag) {
            self.console.enabled = enabled;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "rules path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn rules_path(&self) -> &Path {
        Path::new(&self.rules.path)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            path: "rules.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "tripwired=info,tripwire=info".to_string(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

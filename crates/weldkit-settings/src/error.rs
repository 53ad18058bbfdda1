//! Error types for the settings crate.
//!
//! Structured errors for configuration files, validation and persistence
//! of calibrated scale factors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or saving a configuration file.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The configuration file could not be read.
    #[error("Cannot read configuration {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The configuration file could not be written.
    #[error("Cannot write configuration {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    /// The platform has no per-user configuration directory.
    #[error("No configuration directory on this platform")]
    NoConfigDirectory,

    /// The configuration directory could not be created.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed JSON configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed TOML configuration.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    /// The configuration loaded but is not usable.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors related to configuration validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required configuration key is missing.
    #[error("Missing configuration key: {0}")]
    MissingKey(String),

    /// The configuration file format is not supported.
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// A configuration value is out of valid range.
    #[error("Value out of range for '{key}': {value}")]
    ValueOutOfRange { key: String, value: String },

    /// A weld preset is unusable.
    #[error("Invalid preset '{name}': {reason}")]
    InvalidPreset { name: String, reason: String },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::ValueOutOfRange`]
    pub fn out_of_range(key: &str, value: impl ToString) -> Self {
        ConfigError::ValueOutOfRange {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Errors related to scale-factor persistence.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// A value cannot be stored.
    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: f64 },

    /// The store file could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stored values could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

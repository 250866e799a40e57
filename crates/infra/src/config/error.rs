//! Configuration errors
//!
//! Every variant is fatal at startup.

use std::path::PathBuf;

use linkguard_domain::LinkGuardError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Alert suppression config not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {format} in config: {message}")]
    Parse { format: &'static str, message: String },

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("configuration missing '{0}' section")]
    MissingSection(&'static str),

    #[error("{section} missing keys: {}", keys.join(", "))]
    MissingKeys { section: &'static str, keys: Vec<&'static str> },

    #[error("{field} must be {expected}")]
    InvalidType { field: &'static str, expected: &'static str },

    #[error("Unknown alert types: {}", .0.join(", "))]
    UnknownAlertTypes(Vec<String>),

    #[error("Unknown service types in service_type_mapping: {}", .0.join(", "))]
    UnknownServiceTypes(Vec<String>),

    #[error("invalid '{section}' section: {message}")]
    InvalidSection { section: &'static str, message: String },

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for LinkGuardError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

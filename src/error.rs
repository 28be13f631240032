//! Error types for rustible-napalm.
//!
//! Module and driver failures have their own error enums
//! ([`ModuleError`](crate::modules::ModuleError),
//! [`DriverError`](crate::driver::DriverError)). This type covers everything
//! around them: configuration, parameter files and logging setup.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for crate-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for rustible-napalm.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration or logging setup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A configuration or parameter file could not be parsed.
    #[error("Failed to parse '{path}': {message}")]
    Parse {
        /// Path to the offending file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// A `key=value` argument was malformed.
    #[error("Invalid module argument '{0}', expected key=value")]
    InvalidArgument(String),

    /// The named module does not exist.
    #[error("Module '{0}' not found")]
    ModuleNotFound(String),

    #[error(transparent)]
    Module(#[from] crate::modules::ModuleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Build a [`Error::Parse`] for `path`.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::parse("/tmp/params.yml", "expected a mapping");
        assert_eq!(
            err.to_string(),
            "Failed to parse '/tmp/params.yml': expected a mapping"
        );

        let err = Error::InvalidArgument("filter".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid module argument 'filter', expected key=value"
        );
    }

    #[test]
    fn test_module_error_is_transparent() {
        let err: Error = crate::modules::ModuleError::MissingParameter("hostname".into()).into();
        assert_eq!(err.to_string(), "hostname is required");
    }
}

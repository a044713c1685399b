//! Configuration errors.

use ldvm_primitives::ErrorClass;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {message}")]
    Io {
        /// Path of the file
        path: String,
        /// Underlying error
        message: String,
    },

    /// Document is not valid TOML or has the wrong shape
    #[error("failed to parse config: {message}")]
    Parse {
        /// Parser error
        message: String,
    },

    /// A value is out of range
    #[error("invalid {field}: {message}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Reason
        message: String,
    },
}

impl ConfigError {
    /// Creates a new invalid value error
    pub fn invalid<S: Into<String>>(field: &'static str, message: S) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        ErrorClass::MalformedInput
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse {
            message: err.to_string(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

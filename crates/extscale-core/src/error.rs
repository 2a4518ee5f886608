//! Error types for fetching readings and loading configuration.

use thiserror::Error;

/// Why a single fetch from the data source failed.
///
/// `target` names the endpoint (socket address or file path) so a log
/// line is enough to tell which deployment is misconfigured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("cannot connect to {target}: {reason}")]
    Connect { target: String, reason: String },

    #[error("cannot read from {target}: {reason}")]
    Read { target: String, reason: String },

    #[error("malformed reading from {target}: {reason}")]
    Decode { target: String, reason: String },
}

impl FetchError {
    pub fn connect(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connect {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    pub fn read(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::Read {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Short label for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Connect { .. } => "connect",
            FetchError::Read { .. } => "read",
            FetchError::Decode { .. } => "decode",
        }
    }
}

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

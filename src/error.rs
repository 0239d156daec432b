use std::path::PathBuf;
use thiserror::Error;

/// Construction-time failures. Reported once at setup, never per tick.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Malformed inbound message. The kernel drops these; it never faults on them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` must be a finite, non-negative number")]
    InvalidNumber(&'static str),

    #[error("field `{0}` must not be empty")]
    Empty(&'static str),
}

/// A host-transport line that could not be turned into a kernel event.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Input(#[from] InputError),
}

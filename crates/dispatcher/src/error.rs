//! Dispatcher error types

use contracts::{ContractError, ErrorKind};
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Malformed glob pattern
    #[error("invalid file pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Worker pool could not be reached or set up
    #[error("cannot connect to worker pool '{profile}': {message}")]
    Connect { profile: String, message: String },

    /// Shared contract error
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    pub fn connect(profile: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            profile: profile.into(),
            message: message.into(),
        }
    }

    /// Abstract kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPattern { .. } => ErrorKind::Configuration,
            Self::Connect { .. } => ErrorKind::Dispatch,
            Self::Contract(e) => e.kind(),
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

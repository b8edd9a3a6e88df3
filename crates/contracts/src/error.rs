//! Layered error definitions
//!
//! Categorized by when they surface: preparation (path / configuration),
//! loading (serialization), batch submission (dispatch) and unit execution.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Abstract error category, independent of which crate raised the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Path,
    Configuration,
    Serialization,
    Dispatch,
    StageExecution,
    Io,
    Other,
}

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Preparation Errors =====
    /// Archive/data/results directory missing or uncreatable
    #[error("path error at '{}': {message}", path.display())]
    Path { path: PathBuf, message: String },

    /// Invalid parameter combination
    #[error("configuration error at '{field}': {message}")]
    Configuration { field: String, message: String },

    /// Configuration file could not be parsed
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ===== Load Errors =====
    /// Persisted artifact missing, truncated or referencing unknown stage types
    #[error("serialization error: {message}")]
    Serialization { message: String },

    // ===== Batch Errors =====
    /// Worker-pool controller unreachable or unusable
    #[error("dispatch error: {message}")]
    Dispatch { message: String },

    // ===== Execution Errors =====
    /// Failure inside a stage's query operation
    #[error("stage '{stage}' failed: {message}")]
    StageExecution { stage: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create path error
    pub fn path(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Path {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create configuration error
    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create dispatch error
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }

    /// Create stage execution error
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageExecution {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Abstract category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Path { .. } => ErrorKind::Path,
            Self::Configuration { .. } | Self::ConfigParse { .. } => ErrorKind::Configuration,
            Self::Serialization { .. } => ErrorKind::Serialization,
            Self::Dispatch { .. } => ErrorKind::Dispatch,
            Self::StageExecution { .. } => ErrorKind::StageExecution,
            Self::Io(_) => ErrorKind::Io,
            Self::Other(_) => ErrorKind::Other,
        }
    }
}

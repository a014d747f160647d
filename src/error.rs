//! Error types for the bid chat agent
//!
//! Each external concern (storage, prediction, configuration) gets its own
//! thiserror enum; `ChatError` is what a dialogue turn can fail with.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for a dialogue turn
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Session persistence failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize session '{session_id}': {source}")]
    Serialize {
        session_id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Prediction gateway failures, reported to the user as text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Model not available")]
    ModelUnavailable,

    #[error("Prediction error: {0}")]
    Prediction(String),
}

/// Schema and configuration problems detected at startup
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Schema must declare at least one variable")]
    EmptySchema,

    #[error("Variable '{name}' is declared more than once")]
    DuplicateVariable { name: String },

    #[error("Invalid definition for variable '{name}': {reason}")]
    InvalidVariable { name: String, reason: String },
}

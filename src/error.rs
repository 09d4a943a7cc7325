//! Error types for trueno-mlops
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)
//!
//! The first four variants are caller errors (bad input, unknown ids). The
//! remaining variants are infrastructure failures; the lifecycle service
//! absorbs them on the training and delete paths.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// trueno-mlops error types
#[derive(Error, Debug)]
pub enum Error {
    /// Class name is not present in the model registry
    #[error("Unknown model class: {0}")]
    UnknownClass(String),

    /// Model id or dataset name does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Prediction requested before the model was fitted
    #[error("Model {0} is not trained yet")]
    NotTrained(String),

    /// Input rejected (shape mismatch, bad hyperparameter, unsupported task type)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Snapshot could not be written, read or verified
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// External collaborator (artifact sink, experiment logger) failed
    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow/Parquet error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON encoding or decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be assembled
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    /// Whether the error was caused by the caller's input rather than by infrastructure.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownClass(_) | Self::NotFound(_) | Self::NotTrained(_) | Self::Validation(_)
        )
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}

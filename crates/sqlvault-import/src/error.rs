//! Import error types.

use thiserror::Error;

/// Import error type.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Update payload lacks the identifier column
    #[error("Data is missing the identifier column: {0}")]
    MissingIdentifier(String),

    /// Data shape the importer cannot map to rows
    #[error("Invalid import data: {0}")]
    InvalidData(String),

    /// Worker-side failure
    #[error(transparent)]
    Worker(#[from] sqlvault_worker::WorkerError),
}

/// Result type alias using ImportError.
pub type ImportResult<T> = Result<T, ImportError>;

//! Worker error types.

use sqlvault_protocol::{error_codes, ErrorInfo};
use thiserror::Error;

/// Worker error type.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// A handle for this filename is already registered
    #[error("The database has already been initialized: {0}")]
    AlreadyInitialized(String),

    /// No usable handle: never initialized, or a prior denial
    #[error("Database not initialized or access denied: {0}")]
    AccessDenied(String),

    /// Verifier decryption did not yield the sentinel
    #[error("Invalid password: access denied")]
    InvalidPassword,

    /// Protected database operated on without a password
    #[error("Password required for this action")]
    PasswordRequired,

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Crypto error (key derivation / verifier encryption)
    #[error(transparent)]
    Crypto(#[from] sqlvault_crypto::CryptoError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Worker channel unavailable
    #[error("Worker unavailable: {0}")]
    Channel(String),

    /// Malformed or mismatched response
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type alias using WorkerError.
pub type WorkerResult<T> = Result<T, WorkerError>;

impl WorkerError {
    /// Protocol error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::AlreadyInitialized(_) => error_codes::ALREADY_INITIALIZED,
            Self::AccessDenied(_) => error_codes::ACCESS_DENIED,
            Self::InvalidPassword => error_codes::INVALID_PASSWORD,
            Self::PasswordRequired => error_codes::PASSWORD_REQUIRED,
            Self::Sqlite(_) => error_codes::SQL_ERROR,
            Self::Crypto(sqlvault_crypto::CryptoError::Decrypt) => error_codes::DECRYPTION_ERROR,
            Self::Crypto(_) | Self::Io(_) | Self::Channel(_) | Self::Protocol(_) => {
                error_codes::INTERNAL_ERROR
            }
        }
    }

    /// Convert to the wire error representation.
    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo {
            code: self.code(),
            message: self.to_string(),
        }
    }

    /// Reconstruct a typed error from the wire representation.
    ///
    /// Used by the client handle so callers can match on error kinds
    /// instead of parsing messages.
    pub fn from_error_info(info: ErrorInfo) -> Self {
        match info.code {
            error_codes::ALREADY_INITIALIZED => Self::AlreadyInitialized(info.message),
            error_codes::ACCESS_DENIED => Self::AccessDenied(info.message),
            error_codes::INVALID_PASSWORD => Self::InvalidPassword,
            error_codes::PASSWORD_REQUIRED => Self::PasswordRequired,
            error_codes::SQL_ERROR => Self::Sqlite(rusqlite::Error::ModuleError(info.message)),
            error_codes::DECRYPTION_ERROR => Self::Crypto(sqlvault_crypto::CryptoError::Decrypt),
            _ => Self::Protocol(info.message),
        }
    }
}

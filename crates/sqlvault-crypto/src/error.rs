//! Crypto error types.

use thiserror::Error;

/// Crypto error type.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key derivation error
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Encryption error
    #[error("Encryption error: {0}")]
    Encrypt(String),

    /// Decryption failure. Covers malformed blobs, truncated nonces and
    /// authentication failures alike so a caller cannot distinguish a
    /// wrong password from corrupted data.
    #[error("Decryption failed: wrong password or corrupted data")]
    Decrypt,
}

/// Result type alias using CryptoError.
pub type CryptoResult<T> = Result<T, CryptoError>;

//! Cryptographic primitives for password-protected SQLVault databases.
//!
//! This crate provides:
//! - PBKDF2-HMAC-SHA256 password key derivation (100,000 iterations)
//! - ChaCha20-Poly1305 verifier encryption (nonce-prepended, base64 blobs)
//! - Salt generation
//!
//! A database is considered unlocked iff decrypting its stored verifier
//! with the derived key yields the sentinel literal exactly. Decryption
//! failure is the sole basis for wrong-password detection.

mod cipher;
mod error;
mod kdf;

pub use cipher::{decrypt, encrypt, NONCE_SIZE, VERIFIER_SENTINEL};
pub use error::{CryptoError, CryptoResult};
pub use kdf::{derive_key, generate_salt, DerivedKey, KEY_SIZE, PBKDF2_ITERATIONS, SALT_SIZE};

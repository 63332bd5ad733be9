//! ChaCha20-Poly1305 verifier encryption.
//!
//! Blob format: base64( nonce (12 bytes) || ciphertext + tag )

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::DerivedKey;

/// Nonce size for ChaCha20-Poly1305 (96 bits = 12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Known-plaintext sentinel encrypted into the stored verifier.
pub const VERIFIER_SENTINEL: &str = "VERIFIED";

/// Encrypt `plaintext` with a derived key.
///
/// A random nonce is prepended to the ciphertext and the whole blob is
/// base64-encoded. Empty plaintext passes through unchanged.
pub fn encrypt(plaintext: &str, key: &DerivedKey) -> CryptoResult<String> {
    if plaintext.is_empty() {
        return Ok(String::new());
    }

    let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

    let mut nonce = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

    let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    combined.extend_from_slice(&nonce);
    combined.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(combined))
}

/// Decrypt a blob produced by [`encrypt`].
///
/// Fails with [`CryptoError::Decrypt`] when the blob is malformed or
/// authentication fails (wrong key or corrupted data). Empty blobs pass
/// through unchanged.
pub fn decrypt(blob: &str, key: &DerivedKey) -> CryptoResult<String> {
    if blob.is_empty() {
        return Ok(String::new());
    }

    let bytes = BASE64.decode(blob).map_err(|_| CryptoError::Decrypt)?;
    if bytes.len() < NONCE_SIZE {
        return Err(CryptoError::Decrypt);
    }
    let (nonce, ciphertext) = bytes.split_at(NONCE_SIZE);

    let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|_| CryptoError::Decrypt)?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decrypt)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Decrypt)
}

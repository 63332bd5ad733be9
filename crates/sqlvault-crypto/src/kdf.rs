//! PBKDF2 password key derivation.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

/// Salt size (128 bits = 16 bytes). Stored hex-encoded next to the verifier.
pub const SALT_SIZE: usize = 16;

/// Derived key size (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// PBKDF2 iteration count. Deliberately expensive to resist brute force.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Symmetric key derived from a user password.
///
/// Held only in volatile memory, keyed by filename in the worker's
/// registry. Never persisted.
#[derive(Clone)]
pub struct DerivedKey([u8; KEY_SIZE]);

impl DerivedKey {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log key material.
        f.write_str("DerivedKey(..)")
    }
}

/// Derive a key from a password and salt.
///
/// Deterministic for a given (password, salt) pair: PBKDF2-HMAC-SHA256
/// over a 256-bit output.
pub fn derive_key(password: &str, salt: &[u8; SALT_SIZE]) -> DerivedKey {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    DerivedKey(key)
}

/// Generate a fresh random salt (once per database; stored in `_security`).
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

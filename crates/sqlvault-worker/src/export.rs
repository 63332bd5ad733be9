//! Export: checkpoint the WAL and read the database file's raw bytes.

use rusqlite::Connection;
use sqlvault_crypto::{decrypt, derive_key, VERIFIER_SENTINEL};
use tracing::{debug, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::gate::{parse_salt, security_record};
use crate::registry::HandleRegistry;

/// Export a database as an opaque byte buffer.
///
/// A protected database re-verifies the supplied password against the
/// stored verifier first; the cached key is deliberately not consulted.
/// Any WAL content is forced into the main file before reading.
pub(crate) fn export_database(
    registry: &HandleRegistry,
    filename: &str,
    password: Option<&str>,
) -> WorkerResult<Vec<u8>> {
    let handle = registry.get(filename)?;
    verify_password(&handle.conn, filename, password)?;

    // Returns a (busy, log, checkpointed) row which we do not need.
    handle
        .conn
        .query_row("PRAGMA wal_checkpoint(FULL)", [], |_| Ok(()))?;

    let bytes = std::fs::read(&handle.path)?;
    debug!(filename, bytes = bytes.len(), "database exported");
    Ok(bytes)
}

/// Check the supplied password against the stored verifier, if any.
/// Unprotected databases export unconditionally.
fn verify_password(
    conn: &Connection,
    filename: &str,
    password: Option<&str>,
) -> WorkerResult<()> {
    let Some((salt_hex, verifier)) = security_record(conn)? else {
        return Ok(());
    };
    let Some(password) = password else {
        warn!(filename, "export of protected database without a password");
        return Err(WorkerError::PasswordRequired);
    };

    let key = derive_key(password, &parse_salt(&salt_hex)?);
    match decrypt(&verifier, &key) {
        Ok(sentinel) if sentinel == VERIFIER_SENTINEL => Ok(()),
        _ => Err(WorkerError::InvalidPassword),
    }
}

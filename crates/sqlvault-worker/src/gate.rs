//! Access gate: password bootstrap and verification at init time.
//!
//! Security record: a single row `{id=1, salt, verifier}` in the reserved
//! `_security` table. Its presence marks the database as password
//! protected and gates every subsequent init on that file.

use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use sqlvault_crypto::{
    decrypt, derive_key, encrypt, generate_salt, CryptoError, DerivedKey, SALT_SIZE,
    VERIFIER_SENTINEL,
};
use tracing::{debug, info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::registry::{Handle, HandleRegistry};

/// Reserved table holding the salt and verifier.
pub(crate) const SECURITY_TABLE: &str = "_security";

/// Open (or create) a database and register its handle.
///
/// `flags` selects the open mode (see [`open_flags`]); the default creates
/// the file. With a password, the security record is created on first
/// protection or verified against; a failed verification discards the
/// handle. Without a password, a protected database is refused outright.
pub(crate) fn open_database(
    registry: &mut HandleRegistry,
    base_dir: &Path,
    filename: &str,
    flags: Option<&str>,
    password: Option<&str>,
) -> WorkerResult<()> {
    if registry.contains(filename) {
        return Err(WorkerError::AlreadyInitialized(filename.to_string()));
    }

    let path = base_dir.join(filename);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let open_flags = open_flags(flags);
    let conn = Connection::open_with_flags(&path, open_flags)?;
    if open_flags.contains(OpenFlags::SQLITE_OPEN_READ_ONLY) {
        // Journal-mode and synchronous changes need write access.
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )?;
    } else {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )?;
    }

    // The connection is dropped (handle discarded) on any error below.
    let key = match password {
        Some(password) => Some(unlock(&conn, filename, password)?),
        None => {
            deny_if_protected(&conn, filename)?;
            None
        }
    };

    let protected = key.is_some();
    registry.insert(filename.to_string(), Handle { conn, path, key });
    info!(filename, protected, "database initialized");
    Ok(())
}

/// Map an open-mode string onto the engine's open flags.
///
/// `c` opens read-write and creates the file, `w` opens read-write without
/// creating, `r` opens read-only. Unknown characters are ignored; no mode
/// character (or no string at all) defaults to create.
fn open_flags(spec: Option<&str>) -> OpenFlags {
    let base = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let spec = spec.unwrap_or("c");
    if spec.contains('c') {
        base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
    } else if spec.contains('w') {
        base | OpenFlags::SQLITE_OPEN_READ_WRITE
    } else if spec.contains('r') {
        base | OpenFlags::SQLITE_OPEN_READ_ONLY
    } else {
        base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
    }
}

/// Verify a password against an existing security record, or create the
/// record when the database is not yet protected. Returns the derived key.
fn unlock(conn: &Connection, filename: &str, password: &str) -> WorkerResult<DerivedKey> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _security (id INTEGER PRIMARY KEY, salt TEXT, verifier TEXT)",
    )?;

    match security_record(conn)? {
        None => {
            let salt = generate_salt();
            let key = derive_key(password, &salt);
            let verifier = encrypt(VERIFIER_SENTINEL, &key)?;
            conn.execute(
                "INSERT INTO _security (id, salt, verifier) VALUES (1, ?1, ?2)",
                params![hex::encode(salt), verifier],
            )?;
            debug!(filename, "security record created");
            Ok(key)
        }
        Some((salt_hex, verifier)) => {
            let key = derive_key(password, &parse_salt(&salt_hex)?);
            match decrypt(&verifier, &key) {
                Ok(sentinel) if sentinel == VERIFIER_SENTINEL => Ok(key),
                _ => {
                    warn!(filename, "password verification failed");
                    Err(WorkerError::InvalidPassword)
                }
            }
        }
    }
}

/// Refuse to open a protected database without a password.
fn deny_if_protected(conn: &Connection, filename: &str) -> WorkerResult<()> {
    let protected: bool = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
            params![SECURITY_TABLE],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    if protected {
        warn!(filename, "protected database opened without a password");
        return Err(WorkerError::AccessDenied(
            "This database is password protected. Please provide a password.".to_string(),
        ));
    }
    Ok(())
}

/// Fetch the security record, if any.
pub(crate) fn security_record(conn: &Connection) -> WorkerResult<Option<(String, String)>> {
    // The table may not exist at all on unprotected databases.
    let exists: bool = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
            params![SECURITY_TABLE],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !exists {
        return Ok(None);
    }

    conn.query_row(
        "SELECT salt, verifier FROM _security WHERE id = 1",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
    .map_err(Into::into)
}

/// Decode a stored hex salt. A malformed salt means the record is corrupt,
/// which is indistinguishable from a bad key for the caller.
pub(crate) fn parse_salt(salt_hex: &str) -> WorkerResult<[u8; SALT_SIZE]> {
    let bytes = hex::decode(salt_hex).map_err(|_| WorkerError::Crypto(CryptoError::Decrypt))?;
    bytes
        .try_into()
        .map_err(|_| WorkerError::Crypto(CryptoError::Decrypt))
}

//! Per-filename handle registry owned by the worker thread.

use std::collections::HashMap;
use std::path::PathBuf;

use rusqlite::Connection;
use sqlvault_crypto::DerivedKey;

use crate::error::{WorkerError, WorkerResult};

/// One live database handle: the connection, its on-disk path and the
/// cached key when the database was opened with a password.
pub(crate) struct Handle {
    pub conn: Connection,
    pub path: PathBuf,
    pub key: Option<DerivedKey>,
}

/// Registry mapping logical filename to its open handle.
///
/// Exclusively owned by the worker thread; handles are created on init and
/// destroyed only when the worker shuts down. At most one handle exists
/// per filename.
#[derive(Default)]
pub(crate) struct HandleRegistry {
    handles: HashMap<String, Handle>,
}

impl HandleRegistry {
    pub fn contains(&self, filename: &str) -> bool {
        self.handles.contains_key(filename)
    }

    pub fn insert(&mut self, filename: String, handle: Handle) {
        self.handles.insert(filename, handle);
    }

    /// Gate check: every data-bearing operation goes through here first.
    pub fn get(&self, filename: &str) -> WorkerResult<&Handle> {
        self.handles
            .get(filename)
            .ok_or_else(|| WorkerError::AccessDenied(filename.to_string()))
    }

    pub fn get_mut(&mut self, filename: &str) -> WorkerResult<&mut Handle> {
        self.handles
            .get_mut(filename)
            .ok_or_else(|| WorkerError::AccessDenied(filename.to_string()))
    }
}

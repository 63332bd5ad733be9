//! Generic JSON-to-relational import for SQLVault databases.
//!
//! Given a table name and arbitrary JSON, the importer infers column
//! types, creates tables on demand, flattens nested objects into prefixed
//! columns, and spins nested arrays off into dynamically named child
//! tables linked back to their parent row by a foreign key. Dictionary
//! shapes (a map of key to record arrays) import recursively under one
//! table with a `group_id` tag per key.
//!
//! Runs entirely client-side: everything reaches the database as ordinary
//! statements and batches through a [`sqlvault_worker::WorkerHandle`].

mod admin;
mod error;
mod flatten;
mod importer;

pub use admin::{clear_database, clear_table};
pub use error::{ImportError, ImportResult};
pub use importer::{ImportReport, JsonImporter};

//! Single-writer SQLite worker for SQLVault.
//!
//! This crate provides:
//! - A dedicated worker thread owning every database handle
//! - The access gate (password bootstrap and verification at init)
//! - The transaction engine (single statements, atomic batches, export)
//! - An async client handle correlating requests with responses
//!
//! # Architecture
//!
//! All SQLite connections live on one background thread. Requests are sent
//! through a channel and executed in FIFO order, so statements belonging to
//! one batch can never interleave with another request against the same
//! handle.
//!
//! ```ignore
//! let worker = Worker::spawn(base_dir)?;
//! worker.init("app.sqlite3", Some("hunter2")).await?;
//! let rows = worker
//!     .execute_sql("app.sqlite3", "SELECT * FROM users", vec![])
//!     .await?;
//! ```
//!
//! **Important**: only SQL and the verifier crypto run on the worker
//! thread. Callers must not assume any ordering between their own
//! concurrent requests beyond per-batch atomicity.

mod engine;
mod error;
mod export;
mod gate;
mod handle;
mod registry;
mod worker;

pub use error::{WorkerError, WorkerResult};
pub use handle::{database_filename, WorkerHandle};
pub use worker::Worker;

//! The dedicated worker thread: FIFO dispatch of protocol requests.

use std::path::{Path, PathBuf};

use sqlvault_protocol::{Request, RequestBody, Response, ResponseBody};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::handle::WorkerHandle;
use crate::registry::HandleRegistry;
use crate::{engine, export, gate};

/// A request together with its reply slot. The oneshot sender guarantees
/// at most one response per request.
pub(crate) struct Envelope {
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}

/// The SQLVault worker.
///
/// Spawns one background thread that exclusively owns every database
/// handle and its cached key. Requests are consumed strictly in FIFO
/// order, so two batches against the same handle can never interleave.
pub struct Worker;

impl Worker {
    /// Spawn the worker thread. Database files are resolved relative to
    /// `base_dir`. The thread shuts down when every handle is dropped.
    pub fn spawn(base_dir: impl Into<PathBuf>) -> WorkerResult<WorkerHandle> {
        let base_dir = base_dir.into();
        let (tx, mut rx) = mpsc::channel::<Envelope>(64);

        std::thread::Builder::new()
            .name("sqlvault-worker".to_string())
            .spawn(move || {
                info!(base_dir = %base_dir.display(), "worker thread started");
                let mut registry = HandleRegistry::default();
                while let Some(Envelope { request, reply }) = rx.blocking_recv() {
                    let response = dispatch(&mut registry, &base_dir, request);
                    // A dropped caller merely discards the reply.
                    let _ = reply.send(response);
                }
                debug!("request channel closed, worker thread exiting");
            })
            .map_err(|e| WorkerError::Channel(format!("Failed to spawn worker thread: {e}")))?;

        Ok(WorkerHandle::new(tx))
    }
}

fn dispatch(registry: &mut HandleRegistry, base_dir: &Path, request: Request) -> Response {
    let Request { id, body } = request;
    match handle_request(registry, base_dir, body) {
        Ok(body) => Response::success(&id, body),
        Err(e) => {
            warn!(request_id = %id, error = %e, "request failed");
            Response::error(&id, e.code(), &e.to_string())
        }
    }
}

fn handle_request(
    registry: &mut HandleRegistry,
    base_dir: &Path,
    body: RequestBody,
) -> WorkerResult<ResponseBody> {
    match body {
        RequestBody::Init {
            filename,
            flags,
            password,
        } => {
            gate::open_database(
                registry,
                base_dir,
                &filename,
                flags.as_deref(),
                password.as_deref(),
            )?;
            Ok(ResponseBody::Initialized { filename })
        }
        RequestBody::ExecuteSql {
            filename,
            sql,
            params,
        } => {
            let handle = registry.get(&filename)?;
            let rows = engine::execute(&handle.conn, &sql, &params)?;
            Ok(ResponseBody::Rows { rows })
        }
        RequestBody::BatchSql {
            filename,
            statements,
        } => {
            let handle = registry.get_mut(&filename)?;
            let rows_affected = engine::batch(&mut handle.conn, &statements)?;
            Ok(ResponseBody::RowsAffected { rows_affected })
        }
        RequestBody::BatchReturnSql {
            filename,
            statements,
        } => {
            let handle = registry.get_mut(&filename)?;
            let rows = engine::batch_returning(&mut handle.conn, &statements)?;
            Ok(ResponseBody::BatchRows { rows })
        }
        RequestBody::Export { filename, password } => {
            let bytes = export::export_database(registry, &filename, password.as_deref())?;
            Ok(ResponseBody::Exported { bytes })
        }
    }
}

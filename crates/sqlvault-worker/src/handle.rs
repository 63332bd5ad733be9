//! Async client handle: sends requests, awaits the correlated response.

use serde_json::Value;
use sqlvault_protocol::{Request, RequestBody, Response, ResponseBody, Row, SqlStatement};
use tokio::sync::{mpsc, oneshot};

use crate::error::{WorkerError, WorkerResult};
use crate::worker::Envelope;

/// Map a logical database name to its on-disk filename.
pub fn database_filename(name: &str) -> String {
    format!("{name}.sqlite3")
}

/// Cloneable handle to the worker thread.
///
/// Each request gets a fresh id and a oneshot reply slot; the handle
/// resolves exactly once per request, success or failure, so callers
/// await readiness instead of polling for it.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Envelope>,
}

impl WorkerHandle {
    pub(crate) fn new(tx: mpsc::Sender<Envelope>) -> Self {
        Self { tx }
    }

    async fn request(&self, body: RequestBody) -> WorkerResult<ResponseBody> {
        let request = Request::new(body);
        let id = request.id.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(Envelope {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| WorkerError::Channel("worker thread has shut down".to_string()))?;

        let Response { id: response_id, result, error } = reply_rx
            .await
            .map_err(|_| WorkerError::Channel("worker dropped the request".to_string()))?;

        if response_id != id {
            return Err(WorkerError::Protocol(format!(
                "response id {response_id} does not match request id {id}"
            )));
        }
        match (result, error) {
            (Some(body), None) => Ok(body),
            (_, Some(info)) => Err(WorkerError::from_error_info(info)),
            (None, None) => Err(WorkerError::Protocol("empty response".to_string())),
        }
    }

    /// Open (or create) a database handle. Resolves once initialization
    /// completes; a second init for the same filename fails.
    pub async fn init(&self, filename: &str, password: Option<&str>) -> WorkerResult<String> {
        self.init_with_flags(filename, None, password).await
    }

    /// [`init`](Self::init) with an explicit open mode: `c` create
    /// (default), `w` read-write without create, `r` read-only.
    pub async fn init_with_flags(
        &self,
        filename: &str,
        flags: Option<&str>,
        password: Option<&str>,
    ) -> WorkerResult<String> {
        match self
            .request(RequestBody::Init {
                filename: filename.to_string(),
                flags: flags.map(String::from),
                password: password.map(String::from),
            })
            .await?
        {
            ResponseBody::Initialized { filename } => Ok(filename),
            other => Err(unexpected(other)),
        }
    }

    /// Execute a single statement and return every resulting row.
    pub async fn execute_sql(
        &self,
        filename: &str,
        sql: &str,
        params: Vec<Value>,
    ) -> WorkerResult<Vec<Row>> {
        match self
            .request(RequestBody::ExecuteSql {
                filename: filename.to_string(),
                sql: sql.to_string(),
                params,
            })
            .await?
        {
            ResponseBody::Rows { rows } => Ok(rows),
            other => Err(unexpected(other)),
        }
    }

    /// Execute statements as one atomic batch; returns the total
    /// changed-row count.
    pub async fn batch_sql(
        &self,
        filename: &str,
        statements: Vec<SqlStatement>,
    ) -> WorkerResult<u64> {
        match self
            .request(RequestBody::BatchSql {
                filename: filename.to_string(),
                statements,
            })
            .await?
        {
            ResponseBody::RowsAffected { rows_affected } => Ok(rows_affected),
            other => Err(unexpected(other)),
        }
    }

    /// Execute statements as one atomic batch, returning the row set each
    /// statement produced, in input order.
    pub async fn batch_return_sql(
        &self,
        filename: &str,
        statements: Vec<SqlStatement>,
    ) -> WorkerResult<Vec<Vec<Row>>> {
        match self
            .request(RequestBody::BatchReturnSql {
                filename: filename.to_string(),
                statements,
            })
            .await?
        {
            ResponseBody::BatchRows { rows } => Ok(rows),
            other => Err(unexpected(other)),
        }
    }

    /// Export the checkpointed database file as raw bytes, suitable for
    /// writing to disk with a `.sqlite3` extension.
    pub async fn export_db(
        &self,
        filename: &str,
        password: Option<&str>,
    ) -> WorkerResult<Vec<u8>> {
        match self
            .request(RequestBody::Export {
                filename: filename.to_string(),
                password: password.map(String::from),
            })
            .await?
        {
            ResponseBody::Exported { bytes } => Ok(bytes),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(body: ResponseBody) -> WorkerError {
    WorkerError::Protocol(format!("unexpected response body: {body:?}"))
}

//! Message contract between callers and the SQLVault worker.
//!
//! Every operation on a database travels as a [`Request`] and is answered
//! by exactly one [`Response`], correlated by a unique request id. The
//! payload is a tagged union with one variant per message type, carrying
//! only the fields valid for that variant.
//!
//! The channel fulfilling this contract must deliver at most one response
//! per request and must deliver either a success or an error for every
//! request. Ordering across concurrent requests is not guaranteed, but
//! each batch executes atomically on the worker.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One result row: an ordered mapping of column name to value.
pub type Row = serde_json::Map<String, Value>;

/// One SQL statement with its bind parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlStatement {
    /// SQL text.
    pub sql: String,
    /// Bind parameters, positional.
    #[serde(default)]
    pub params: Vec<Value>,
}

impl SqlStatement {
    /// Create a statement.
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Request payload, one variant per message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RequestBody {
    /// Open (or create) a database handle for `filename`.
    ///
    /// `flags` selects the open mode: `c` create (default), `w` read-write
    /// without create, `r` read-only. Unknown characters are ignored.
    Init {
        filename: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flags: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    /// Execute a single statement and return its rows.
    ExecuteSql {
        filename: String,
        sql: String,
        #[serde(default)]
        params: Vec<Value>,
    },
    /// Execute statements as one transaction; no result rows captured.
    BatchSql {
        filename: String,
        statements: Vec<SqlStatement>,
    },
    /// Execute statements as one transaction, capturing rows per statement.
    BatchReturnSql {
        filename: String,
        statements: Vec<SqlStatement>,
    },
    /// Checkpoint and read the database file's raw bytes.
    Export {
        filename: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
}

/// Response payload, mirroring [`RequestBody`] variant by variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ResponseBody {
    /// Handle is open and ready.
    Initialized { filename: String },
    /// Rows produced by a single statement.
    Rows { rows: Vec<Row> },
    /// Total changed-row count of a batch.
    RowsAffected { rows_affected: u64 },
    /// Per-statement row sets of a returning batch, in input order.
    BatchRows { rows: Vec<Vec<Row>> },
    /// Raw bytes of the checkpointed database file.
    Exported { bytes: Vec<u8> },
}

/// Request message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation.
    pub id: String,
    /// Operation payload.
    #[serde(flatten)]
    pub body: RequestBody,
}

impl Request {
    /// Create a new request with an auto-generated ID.
    pub fn new(body: RequestBody) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            body,
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Response message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Request ID for correlation.
    pub id: String,
    /// Result payload (if successful).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResponseBody>,
    /// Error information (if failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

/// Error information in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code (see [`error_codes`]).
    pub code: i32,
    /// Error message.
    pub message: String,
}

impl Response {
    /// Create a successful response.
    pub fn success(id: &str, result: ResponseBody) -> Self {
        Self {
            id: id.to_string(),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: &str, code: i32, message: &str) -> Self {
        Self {
            id: id.to_string(),
            result: None,
            error: Some(ErrorInfo {
                code,
                message: message.to_string(),
            }),
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check if the response is successful.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Standard error codes, one per error in the taxonomy.
pub mod error_codes {
    pub const ALREADY_INITIALIZED: i32 = -32010;
    pub const ACCESS_DENIED: i32 = -32011;
    pub const INVALID_PASSWORD: i32 = -32012;
    pub const PASSWORD_REQUIRED: i32 = -32013;
    pub const SQL_ERROR: i32 = -32015;
    pub const DECRYPTION_ERROR: i32 = -32016;
    pub const INTERNAL_ERROR: i32 = -32603;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = Request::new(RequestBody::Init {
            filename: "app.sqlite3".to_string(),
            flags: None,
            password: None,
        });
        let json = request.to_json().unwrap();

        assert!(json.contains("\"type\":\"init\""));
        assert!(json.contains("\"filename\":\"app.sqlite3\""));
        assert!(json.contains("\"id\":"));
        // Absent optional fields must not appear on the wire.
        assert!(!json.contains("password"));
        assert!(!json.contains("flags"));
    }

    #[test]
    fn test_init_flags_roundtrip() {
        let json = r#"{"id":"abc","type":"init","filename":"f","flags":"r"}"#;
        let request = Request::from_json(json).unwrap();
        match request.body {
            RequestBody::Init { flags, password, .. } => {
                assert_eq!(flags.as_deref(), Some("r"));
                assert!(password.is_none());
            }
            other => panic!("unexpected body: {:?}", other),
        }

        let request = Request::new(RequestBody::Init {
            filename: "f".into(),
            flags: Some("ct".into()),
            password: None,
        });
        assert!(request.to_json().unwrap().contains("\"flags\":\"ct\""));
    }

    #[test]
    fn test_all_request_types_serialize() {
        let bodies = vec![
            (
                RequestBody::Init {
                    filename: "f".into(),
                    flags: None,
                    password: Some("pw".into()),
                },
                "init",
            ),
            (
                RequestBody::ExecuteSql {
                    filename: "f".into(),
                    sql: "SELECT 1".into(),
                    params: vec![],
                },
                "executeSql",
            ),
            (
                RequestBody::BatchSql {
                    filename: "f".into(),
                    statements: vec![],
                },
                "batchSql",
            ),
            (
                RequestBody::BatchReturnSql {
                    filename: "f".into(),
                    statements: vec![],
                },
                "batchReturnSql",
            ),
            (
                RequestBody::Export {
                    filename: "f".into(),
                    password: None,
                },
                "export",
            ),
        ];

        for (body, expected_tag) in bodies {
            let json = Request::new(body).to_json().unwrap();
            assert!(
                json.contains(&format!("\"type\":\"{}\"", expected_tag)),
                "expected tag {} in {}",
                expected_tag,
                json
            );
        }
    }

    #[test]
    fn test_request_deserialization() {
        let json = r#"{"id":"abc","type":"executeSql","filename":"f","sql":"SELECT 1"}"#;
        let request = Request::from_json(json).unwrap();

        assert_eq!(request.id, "abc");
        match request.body {
            RequestBody::ExecuteSql { filename, sql, params } => {
                assert_eq!(filename, "f");
                assert_eq!(sql, "SELECT 1");
                assert!(params.is_empty());
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn test_response_success() {
        let response = Response::success(
            "123",
            ResponseBody::RowsAffected { rows_affected: 4 },
        );
        let json = response.to_json().unwrap();

        assert!(json.contains("\"id\":\"123\""));
        assert!(json.contains("\"rows_affected\":4"));
        assert!(!json.contains("\"error\""));
        assert!(response.is_success());
    }

    #[test]
    fn test_response_error() {
        let response = Response::error("123", error_codes::INVALID_PASSWORD, "Invalid password");
        let json = response.to_json().unwrap();

        assert!(json.contains("\"code\":-32012"));
        assert!(json.contains("\"message\":\"Invalid password\""));
        assert!(!json.contains("\"result\""));
        assert!(!response.is_success());
    }

    #[test]
    fn test_response_roundtrip() {
        let response = Response::success(
            "test-id",
            ResponseBody::Initialized {
                filename: "f".into(),
            },
        );
        let parsed = Response::from_json(&response.to_json().unwrap()).unwrap();
        assert_eq!(parsed.id, "test-id");
        assert!(parsed.is_success());
        assert!(parsed.result.is_some());
    }

    #[test]
    fn test_request_id_uniqueness() {
        let a = Request::new(RequestBody::Export {
            filename: "f".into(),
            password: None,
        });
        let b = Request::new(RequestBody::Export {
            filename: "f".into(),
            password: None,
        });
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_sql_statement_default_params() {
        let stmt: SqlStatement = serde_json::from_str(r#"{"sql":"SELECT 1"}"#).unwrap();
        assert!(stmt.params.is_empty());
    }
}

//! Statement execution: single statements and atomic batches.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use sqlvault_protocol::{Row, SqlStatement};
use tracing::debug;

use crate::error::WorkerResult;

/// Coerce JSON bind parameters to SQLite values.
///
/// Strings and numbers bind natively; everything else (booleans, null,
/// arrays, objects) is stringified first. This is a deliberate, lossy
/// normalization, not a type-preserving path.
fn bind_values(params: &[Value]) -> Vec<SqlValue> {
    params
        .iter()
        .map(|value| match value {
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Integer(i)
                } else {
                    SqlValue::Real(n.as_f64().unwrap_or_default())
                }
            }
            other => SqlValue::Text(other.to_string()),
        })
        .collect()
}

/// Map a SQLite result cell to a JSON value. BLOBs become base64 strings.
fn cell_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(BASE64.encode(b)),
    }
}

/// Execute one statement and collect every resulting row as an ordered
/// column-name-to-value mapping.
pub(crate) fn execute(conn: &Connection, sql: &str, params: &[Value]) -> WorkerResult<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = stmt.query(params_from_iter(bind_values(params)))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut mapped = Row::new();
        for (i, column) in columns.iter().enumerate() {
            mapped.insert(column.clone(), cell_to_json(row.get_ref(i)?));
        }
        out.push(mapped);
    }
    Ok(out)
}

/// Execute statements as one transaction, accumulating the changed-row
/// count after each. Result rows are discarded. Any failure rolls the
/// whole batch back and surfaces the triggering error.
pub(crate) fn batch(conn: &mut Connection, statements: &[SqlStatement]) -> WorkerResult<u64> {
    let tx = conn.transaction()?;

    let run = |tx: &rusqlite::Transaction<'_>| -> WorkerResult<u64> {
        let mut changes: u64 = 0;
        for statement in statements {
            execute(tx, &statement.sql, &statement.params)?;
            changes += tx.changes();
        }
        Ok(changes)
    };

    match run(&tx) {
        Ok(changes) => {
            tx.commit()?;
            debug!(statements = statements.len(), changes, "batch committed");
            Ok(changes)
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

/// Like [`batch`], but captures the full row set each statement produced,
/// in input order. Non-selecting statements yield an empty row set.
pub(crate) fn batch_returning(
    conn: &mut Connection,
    statements: &[SqlStatement],
) -> WorkerResult<Vec<Vec<Row>>> {
    let tx = conn.transaction()?;

    let run = |tx: &rusqlite::Transaction<'_>| -> WorkerResult<Vec<Vec<Row>>> {
        let mut results = Vec::with_capacity(statements.len());
        for statement in statements {
            results.push(execute(tx, &statement.sql, &statement.params)?);
        }
        Ok(results)
    };

    match run(&tx) {
        Ok(results) => {
            tx.commit()?;
            debug!(statements = statements.len(), "returning batch committed");
            Ok(results)
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a TEXT, b REAL, c INTEGER)")
            .unwrap();
        conn
    }

    #[test]
    fn test_param_coercion_lossy() {
        let conn = memory_db();
        execute(
            &conn,
            "INSERT INTO t (a, b, c) VALUES (?1, ?2, ?3)",
            &[json!(true), json!(1.5), json!(null)],
        )
        .unwrap();

        let rows = execute(&conn, "SELECT a, b, c FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        // Booleans and null arrive stringified; numbers bind natively.
        assert_eq!(rows[0]["a"], json!("true"));
        assert_eq!(rows[0]["b"], json!(1.5));
        assert_eq!(rows[0]["c"], json!("null"));
    }

    #[test]
    fn test_rows_are_ordered_by_column() {
        let conn = memory_db();
        execute(
            &conn,
            "INSERT INTO t (a, b, c) VALUES ('x', 2.0, 3)",
            &[],
        )
        .unwrap();

        let rows = execute(&conn, "SELECT c, a, b FROM t", &[]).unwrap();
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, ["c", "a", "b"]);
    }

    #[test]
    fn test_batch_accumulates_changes() {
        let mut conn = memory_db();
        let changed = batch(
            &mut conn,
            &[
                SqlStatement::new("INSERT INTO t (a) VALUES ('one')", vec![]),
                SqlStatement::new("INSERT INTO t (a) VALUES ('two')", vec![]),
                SqlStatement::new("UPDATE t SET b = 1.0", vec![]),
            ],
        )
        .unwrap();
        assert_eq!(changed, 4);
    }

    #[test]
    fn test_batch_rolls_back_on_failure() {
        let mut conn = memory_db();
        conn.execute("INSERT INTO t (a) VALUES ('before')", [])
            .unwrap();

        // Failure at every position k must leave the table untouched.
        for k in 0..3 {
            let mut statements: Vec<SqlStatement> = (0..3)
                .map(|i| SqlStatement::new(format!("INSERT INTO t (a) VALUES ('row{i}')"), vec![]))
                .collect();
            statements[k] = SqlStatement::new("INSERT INTO nonexistent VALUES (1)", vec![]);

            assert!(batch(&mut conn, &statements).is_err());
            let rows = execute(&conn, "SELECT a FROM t", &[]).unwrap();
            assert_eq!(rows.len(), 1, "rollback failed at position {k}");
        }
    }

    #[test]
    fn test_batch_returning_row_sets_in_order() {
        let mut conn = memory_db();
        let results = batch_returning(
            &mut conn,
            &[
                SqlStatement::new("INSERT INTO t (a, c) VALUES ('x', 1)", vec![]),
                SqlStatement::new("SELECT a FROM t", vec![]),
                SqlStatement::new("SELECT c FROM t WHERE a = ?1", vec![json!("x")]),
            ],
        )
        .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_empty());
        assert_eq!(results[1][0]["a"], json!("x"));
        assert_eq!(results[2][0]["c"], json!(1));
    }

    #[test]
    fn test_blob_cells_become_base64() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE blobs (data BLOB)").unwrap();
        conn.execute("INSERT INTO blobs VALUES (x'010203')", [])
            .unwrap();

        let rows = execute(&conn, "SELECT data FROM blobs", &[]).unwrap();
        assert_eq!(rows[0]["data"], json!(BASE64.encode([1u8, 2, 3])));
    }
}

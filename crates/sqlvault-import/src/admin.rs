//! Administrative operations: clearing tables and wiping the database.

use serde_json::Value;
use sqlvault_protocol::SqlStatement;
use sqlvault_worker::WorkerHandle;
use tracing::info;

use crate::error::ImportResult;

/// Tables never touched by [`clear_database`].
const RESERVED_TABLES_SQL: &str = "
    SELECT name FROM sqlite_master
    WHERE type='table'
    AND name NOT LIKE 'sqlite_%'
    AND name NOT IN ('_audit_log', '_security')
";

/// Delete every record from one table. Fails if the table does not exist.
pub async fn clear_table(
    handle: &WorkerHandle,
    filename: &str,
    table: &str,
) -> ImportResult<()> {
    let sql = format!("DELETE FROM \"{table}\"");
    handle.execute_sql(filename, &sql, Vec::new()).await?;
    Ok(())
}

/// Drop every user table, leaving the reserved tables and SQLite
/// internals in place. Returns the number of tables dropped; an empty
/// database reports zero without error.
pub async fn clear_database(handle: &WorkerHandle, filename: &str) -> ImportResult<u64> {
    let rows = handle
        .execute_sql(filename, RESERVED_TABLES_SQL, Vec::new())
        .await?;
    if rows.is_empty() {
        return Ok(0);
    }

    let tables: Vec<String> = rows
        .iter()
        .filter_map(|row| row.get("name").and_then(Value::as_str).map(String::from))
        .collect();
    info!(filename, count = tables.len(), "dropping user tables");

    // Constraints off so drop order cannot matter, then one atomic batch.
    handle
        .execute_sql(filename, "PRAGMA foreign_keys = OFF", Vec::new())
        .await?;
    let drops = tables
        .iter()
        .map(|name| SqlStatement::new(format!("DROP TABLE IF EXISTS \"{name}\""), Vec::new()))
        .collect();
    handle.batch_sql(filename, drops).await?;
    handle
        .execute_sql(filename, "PRAGMA foreign_keys = ON", Vec::new())
        .await?;

    // Reclaim file space.
    handle.execute_sql(filename, "VACUUM", Vec::new()).await?;

    Ok(tables.len() as u64)
}

//! The JSON importer: table inference, inserts, updates and the
//! recursive complex-data import.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlvault_protocol::SqlStatement;
use sqlvault_worker::WorkerHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ImportError, ImportResult};
use crate::flatten::{flatten_object, is_dictionary};

/// Foreign-key column stamped on rows imported from a dictionary shape.
const GROUP_KEY_COLUMN: &str = "group_id";

/// Aggregate insertion report, one node per table touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    /// Table rows were written to.
    pub table: String,
    /// Rows written to that exact table.
    pub inserted: u64,
    /// Reports for every derived child table.
    #[serde(default)]
    pub children: Vec<ImportReport>,
}

impl ImportReport {
    fn empty(table: String) -> Self {
        Self {
            table,
            inserted: 0,
            children: Vec::new(),
        }
    }
}

/// JSON importer bound to one database.
pub struct JsonImporter {
    handle: WorkerHandle,
    filename: String,
}

impl JsonImporter {
    /// Create an importer for `filename` (must already be initialized).
    pub fn new(handle: WorkerHandle, filename: impl Into<String>) -> Self {
        Self {
            handle,
            filename: filename.into(),
        }
    }

    /// Create `table` if it does not exist, deriving one column per key of
    /// `sample`: numbers map to REAL, booleans to INTEGER, everything else
    /// to TEXT. Once a table exists this is a no-op regardless of schema
    /// drift (schema is frozen at first write).
    pub async fn ensure_table(
        &self,
        table: &str,
        sample: &Map<String, Value>,
    ) -> ImportResult<()> {
        let columns = sample
            .iter()
            .map(|(key, value)| {
                let sql_type = match value {
                    Value::Number(_) => "REAL",
                    Value::Bool(_) => "INTEGER",
                    _ => "TEXT",
                };
                format!("\"{key}\" {sql_type}")
            })
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!("CREATE TABLE IF NOT EXISTS \"{table}\" ({columns})");
        self.handle
            .execute_sql(&self.filename, &sql, Vec::new())
            .await?;
        Ok(())
    }

    /// Insert a single object or an array of objects, creating the table
    /// from the first row's shape if needed. An array inserts as one
    /// atomic batch. Empty or absent data is a no-op success.
    pub async fn insert_from_json(&self, table: &str, data: &Value) -> ImportResult<()> {
        match data {
            Value::Null => Ok(()),
            Value::Array(rows) if rows.is_empty() => Ok(()),
            Value::Array(rows) => {
                let sample = as_object(&rows[0])?;
                self.ensure_table(table, sample).await?;

                let statements = rows
                    .iter()
                    .map(|row| Ok(insert_statement(table, as_object(row)?)))
                    .collect::<ImportResult<Vec<_>>>()?;
                self.handle.batch_sql(&self.filename, statements).await?;
                Ok(())
            }
            Value::Object(row) => {
                self.ensure_table(table, row).await?;
                let statement = insert_statement(table, row);
                self.handle
                    .execute_sql(&self.filename, &statement.sql, statement.params)
                    .await?;
                Ok(())
            }
            other => Err(ImportError::InvalidData(format!(
                "expected an object or array of objects, got {other}"
            ))),
        }
    }

    /// Update one row identified by `id_column`. Fails when the payload
    /// lacks the identifier; a payload containing only the identifier is
    /// a no-op success.
    pub async fn update_from_json(
        &self,
        table: &str,
        data: &Map<String, Value>,
        id_column: &str,
    ) -> ImportResult<()> {
        let Some(id_value) = data.get(id_column) else {
            return Err(ImportError::MissingIdentifier(id_column.to_string()));
        };

        let update_keys: Vec<&String> = data.keys().filter(|k| *k != id_column).collect();
        if update_keys.is_empty() {
            return Ok(());
        }

        let set_clause = update_keys
            .iter()
            .map(|k| format!("\"{k}\" = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE \"{table}\" SET {set_clause} WHERE \"{id_column}\" = ?");

        let mut params: Vec<Value> = update_keys.iter().map(|k| data[*k].clone()).collect();
        params.push(id_value.clone());

        self.handle.execute_sql(&self.filename, &sql, params).await?;
        Ok(())
    }

    /// Import arbitrarily nested JSON into `table` and its derived child
    /// tables, returning the aggregate insertion report.
    ///
    /// Dictionary shapes import each value under the same table with a
    /// `group_id` column holding the dictionary key. Arrays flatten each
    /// element, bulk-insert the rows, and recurse into child tables named
    /// `<table>_<childKey>`, each child row carrying a `<table>_guid`
    /// foreign key. A single record imports as a one-element array. Any
    /// other shape reports zero insertions.
    pub async fn import_complex(&self, table: &str, data: &Value) -> ImportResult<ImportReport> {
        let report = self
            .import_level(table.to_string(), data.clone(), None)
            .await?;
        info!(
            table,
            inserted = report.inserted,
            child_tables = report.children.len(),
            "complex import finished"
        );
        Ok(report)
    }

    /// One recursion level. Boxed because the future is self-referential
    /// across await points in the recursive calls.
    fn import_level<'a>(
        &'a self,
        table: String,
        data: Value,
        parent_key: Option<(String, String)>,
    ) -> Pin<Box<dyn Future<Output = ImportResult<ImportReport>> + Send + 'a>> {
        Box::pin(async move {
            match data {
                Value::Object(map) if is_dictionary(&map) => {
                    self.import_dictionary(table, map).await
                }
                // A bare record behaves as a one-element array.
                Value::Object(map) => {
                    self.import_rows(table, vec![Value::Object(map)], parent_key)
                        .await
                }
                Value::Array(items) => self.import_rows(table, items, parent_key).await,
                _ => Ok(ImportReport::empty(table)),
            }
        })
    }

    /// Dictionary case: recurse per entry, tagging rows with the key, and
    /// aggregate counts and child reports.
    async fn import_dictionary(
        &self,
        table: String,
        map: Map<String, Value>,
    ) -> ImportResult<ImportReport> {
        let mut inserted = 0;
        let mut children = Vec::new();

        for (key, value) in map {
            let report = self
                .import_level(
                    table.clone(),
                    value,
                    Some((GROUP_KEY_COLUMN.to_string(), key)),
                )
                .await?;
            inserted += report.inserted;
            children.extend(report.children);
        }

        Ok(ImportReport {
            table,
            inserted,
            children,
        })
    }

    /// Array case: flatten every element, stamp the parent key, collect
    /// child rows under their table names, bulk-insert, then recurse.
    async fn import_rows(
        &self,
        table: String,
        items: Vec<Value>,
        parent_key: Option<(String, String)>,
    ) -> ImportResult<ImportReport> {
        let mut flat_rows: Vec<Value> = Vec::new();
        let mut child_tables: BTreeMap<String, Vec<Value>> = BTreeMap::new();

        for item in &items {
            let Some(obj) = item.as_object() else {
                debug!(table, "skipping non-object array element");
                continue;
            };

            let flattened = flatten_object(obj, "");
            let mut row = flattened.row;
            if let Some((column, value)) = &parent_key {
                row.insert(column.clone(), Value::String(value.clone()));
            }

            // Identifier used only to link this row's own children.
            let row_id = row
                .get("guid")
                .filter(|v| !v.is_null())
                .or_else(|| row.get("id").filter(|v| !v.is_null()))
                .cloned()
                .unwrap_or_else(|| Value::String(Uuid::new_v4().to_string()));

            let foreign_key = format!("{table}_guid");
            for (child_key, mut child_rows) in flattened.children {
                for child in child_rows.iter_mut() {
                    if let Some(child_obj) = child.as_object_mut() {
                        child_obj.insert(foreign_key.clone(), row_id.clone());
                    }
                }
                child_tables
                    .entry(child_key)
                    .or_default()
                    .extend(child_rows);
            }

            flat_rows.push(Value::Object(row));
        }

        let inserted = flat_rows.len() as u64;
        if !flat_rows.is_empty() {
            self.insert_from_json(&table, &Value::Array(flat_rows))
                .await?;
        }

        let mut children = Vec::new();
        for (child_key, rows) in child_tables {
            let child_table = format!("{table}_{child_key}");
            children.push(
                self.import_level(child_table, Value::Array(rows), None)
                    .await?,
            );
        }

        Ok(ImportReport {
            table,
            inserted,
            children,
        })
    }
}

fn as_object(value: &Value) -> ImportResult<&Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ImportError::InvalidData(format!("expected an object row, got {value}")))
}

/// Build one parameterized INSERT for a flat row.
fn insert_statement(table: &str, row: &Map<String, Value>) -> SqlStatement {
    let columns = row
        .keys()
        .map(|k| format!("\"{k}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; row.len()].join(", ");
    let sql = format!("INSERT INTO \"{table}\" ({columns}) VALUES ({placeholders})");
    SqlStatement::new(sql, row.values().cloned().collect())
}

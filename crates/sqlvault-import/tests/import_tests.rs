//! End-to-end import tests against a live worker.

use serde_json::{json, Value};
use sqlvault_import::{clear_database, clear_table, ImportError, JsonImporter};
use sqlvault_worker::{Worker, WorkerHandle};
use tempfile::TempDir;

const DB: &str = "import.sqlite3";

async fn setup(dir: &TempDir) -> (WorkerHandle, JsonImporter) {
    let worker = Worker::spawn(dir.path()).unwrap();
    worker.init(DB, None).await.unwrap();
    let importer = JsonImporter::new(worker.clone(), DB);
    (worker, importer)
}

async fn user_tables(worker: &WorkerHandle) -> Vec<String> {
    worker
        .execute_sql(
            DB,
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            vec![],
        )
        .await
        .unwrap()
        .iter()
        .filter_map(|row| row.get("name").and_then(Value::as_str).map(String::from))
        .collect()
}

#[tokio::test]
async fn empty_array_import_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let (worker, importer) = setup(&dir).await;

    let report = importer.import_complex("t", &json!([])).await.unwrap();
    assert_eq!(report.table, "t");
    assert_eq!(report.inserted, 0);
    assert!(report.children.is_empty());
    assert!(user_tables(&worker).await.is_empty());
}

#[tokio::test]
async fn scalar_import_reports_zero() {
    let dir = TempDir::new().unwrap();
    let (_worker, importer) = setup(&dir).await;

    let report = importer.import_complex("t", &json!(42)).await.unwrap();
    assert_eq!(report.inserted, 0);
}

#[tokio::test]
async fn nested_object_and_array_import() {
    let dir = TempDir::new().unwrap();
    let (worker, importer) = setup(&dir).await;

    let data = json!({"a": 1, "b": {"c": 2}, "d": [{"x": 1}, {"x": 2}]});
    let report = importer.import_complex("t", &data).await.unwrap();

    assert_eq!(report.table, "t");
    assert_eq!(report.inserted, 1);
    assert_eq!(report.children.len(), 1);
    assert_eq!(report.children[0].table, "t_d");
    assert_eq!(report.children[0].inserted, 2);
    assert!(report.children[0].children.is_empty());

    // The parent row is flattened: nested object becomes a prefixed column.
    let rows = worker
        .execute_sql(DB, "SELECT a, b_c FROM t", vec![])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["a"], json!(1.0));
    assert_eq!(rows[0]["b_c"], json!(2.0));

    // Both child rows carry the same generated parent id.
    let child_rows = worker
        .execute_sql(DB, "SELECT x, t_guid FROM t_d ORDER BY x", vec![])
        .await
        .unwrap();
    assert_eq!(child_rows.len(), 2);
    let parent_id = child_rows[0]["t_guid"].as_str().unwrap().to_string();
    assert!(!parent_id.is_empty());
    assert_eq!(child_rows[1]["t_guid"], json!(parent_id));
}

#[tokio::test]
async fn child_rows_link_to_explicit_guid() {
    let dir = TempDir::new().unwrap();
    let (worker, importer) = setup(&dir).await;

    let data = json!([
        {"guid": "g-1", "sku": "A", "images": [{"url": "u1"}, {"url": "u2"}]},
        {"guid": "g-2", "sku": "B", "images": [{"url": "u3"}]}
    ]);
    let report = importer.import_complex("products", &data).await.unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.children[0].table, "products_images");
    assert_eq!(report.children[0].inserted, 3);

    let rows = worker
        .execute_sql(
            DB,
            "SELECT url, products_guid FROM products_images ORDER BY url",
            vec![],
        )
        .await
        .unwrap();
    assert_eq!(rows[0]["products_guid"], json!("g-1"));
    assert_eq!(rows[1]["products_guid"], json!("g-1"));
    assert_eq!(rows[2]["products_guid"], json!("g-2"));
}

#[tokio::test]
async fn dictionary_import_tags_group_id() {
    let dir = TempDir::new().unwrap();
    let (worker, importer) = setup(&dir).await;

    let data = json!({
        "k1": [{"guid": "g1"}],
        "k2": [{"guid": "g2"}]
    });
    let report = importer.import_complex("t", &data).await.unwrap();
    assert_eq!(report.table, "t");
    assert_eq!(report.inserted, 2);

    let rows = worker
        .execute_sql(DB, "SELECT guid, group_id FROM t ORDER BY guid", vec![])
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["group_id"], json!("k1"));
    assert_eq!(rows[1]["group_id"], json!("k2"));
}

#[tokio::test]
async fn ensure_table_schema_is_frozen_at_first_write() {
    let dir = TempDir::new().unwrap();
    let (worker, importer) = setup(&dir).await;

    importer
        .ensure_table("t", json!({"a": 1}).as_object().unwrap())
        .await
        .unwrap();
    // Later samples with different shapes never alter the table.
    importer
        .ensure_table("t", json!({"b": "x", "c": true}).as_object().unwrap())
        .await
        .unwrap();

    let columns: Vec<String> = worker
        .execute_sql(DB, "PRAGMA table_info(t)", vec![])
        .await
        .unwrap()
        .iter()
        .filter_map(|row| row.get("name").and_then(Value::as_str).map(String::from))
        .collect();
    assert_eq!(columns, ["a"]);
}

#[tokio::test]
async fn insert_from_json_array_is_atomic() {
    let dir = TempDir::new().unwrap();
    let (worker, importer) = setup(&dir).await;

    importer
        .insert_from_json("t", &json!([{"a": 1}, {"a": 2}, {"a": 3}]))
        .await
        .unwrap();

    let rows = worker
        .execute_sql(DB, "SELECT COUNT(*) AS n FROM t", vec![])
        .await
        .unwrap();
    assert_eq!(rows[0]["n"], json!(3));

    // Empty and absent payloads are no-op successes.
    importer.insert_from_json("t", &json!([])).await.unwrap();
    importer.insert_from_json("t", &Value::Null).await.unwrap();
}

#[tokio::test]
async fn update_from_json_rules() {
    let dir = TempDir::new().unwrap();
    let (worker, importer) = setup(&dir).await;

    importer
        .insert_from_json("t", &json!({"id": "r1", "name": "old"}))
        .await
        .unwrap();

    // Missing identifier fails.
    let err = importer
        .update_from_json("t", json!({"name": "new"}).as_object().unwrap(), "id")
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::MissingIdentifier(_)));

    // Identifier-only payload is a no-op success.
    importer
        .update_from_json("t", json!({"id": "r1"}).as_object().unwrap(), "id")
        .await
        .unwrap();

    importer
        .update_from_json(
            "t",
            json!({"id": "r1", "name": "new"}).as_object().unwrap(),
            "id",
        )
        .await
        .unwrap();

    let rows = worker
        .execute_sql(DB, "SELECT name FROM t WHERE id = ?1", vec![json!("r1")])
        .await
        .unwrap();
    assert_eq!(rows[0]["name"], json!("new"));
}

#[tokio::test]
async fn clear_table_and_clear_database() {
    let dir = TempDir::new().unwrap();
    let (worker, importer) = setup(&dir).await;

    let data = json!([
        {"guid": "g-1", "sku": "A", "images": [{"url": "u1"}]}
    ]);
    importer.import_complex("products", &data).await.unwrap();

    clear_table(&worker, DB, "products").await.unwrap();
    let rows = worker
        .execute_sql(DB, "SELECT COUNT(*) AS n FROM products", vec![])
        .await
        .unwrap();
    assert_eq!(rows[0]["n"], json!(0));

    // Clearing a missing table surfaces the engine error.
    assert!(clear_table(&worker, DB, "missing").await.is_err());

    let dropped = clear_database(&worker, DB).await.unwrap();
    assert_eq!(dropped, 2);
    assert!(user_tables(&worker).await.is_empty());

    // Wiping an already-empty database reports zero without error.
    assert_eq!(clear_database(&worker, DB).await.unwrap(), 0);
}

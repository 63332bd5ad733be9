//! Object flattening and the dictionary-shape heuristic.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Result of flattening one JSON object: a single-level row of scalars
/// plus the arrays extracted from it, keyed by child-table name.
pub(crate) struct Flattened {
    pub row: Map<String, Value>,
    pub children: BTreeMap<String, Vec<Value>>,
}

/// Recursively flatten an object.
///
/// Arrays are lifted unchanged into `children` under their original key.
/// Nested objects are flattened with `prefix_key` column naming and
/// merged into the parent; arrays found inside nested objects surface as
/// children of the outermost call. Scalars stay in the row.
pub(crate) fn flatten_object(obj: &Map<String, Value>, prefix: &str) -> Flattened {
    let mut row = Map::new();
    let mut children: BTreeMap<String, Vec<Value>> = BTreeMap::new();

    for (key, value) in obj {
        let column = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}_{key}")
        };

        match value {
            Value::Array(items) => {
                children
                    .entry(key.clone())
                    .or_default()
                    .extend(items.iter().cloned());
            }
            Value::Object(nested) => {
                let nested_flat = flatten_object(nested, &column);
                row.extend(nested_flat.row);
                for (child_key, child_rows) in nested_flat.children {
                    children.entry(child_key).or_default().extend(child_rows);
                }
            }
            scalar => {
                row.insert(column, scalar.clone());
            }
        }
    }

    Flattened { row, children }
}

/// Heuristic: a non-array object whose first value is an array is a
/// grouping map of id -> records, not a single data record.
pub(crate) fn is_dictionary(obj: &Map<String, Value>) -> bool {
    obj.values().next().map_or(false, Value::is_array)
}

//! Collapse nested records into single-level rows.
//!
//! Keys are joined path segments: `{"a": {"b": 1}}` becomes `a_b`, and a
//! sequence of mappings is inlined by position (`a_0_x`, `a_1_x`, ...).
//! Any other sequence is stored whole as its JSON text. Keys that already
//! contain the separator can collide; the later write wins.

use crate::types::{FlatRow, Record};
use serde_json::{Map, Value};

/// Default path separator.
pub const DEFAULT_SEPARATOR: &str = "_";

/// Flatten one mapping into a row.
pub fn flatten(fields: &Map<String, Value>, sep: &str) -> FlatRow {
    let mut row = FlatRow::new();
    flatten_into(&mut row, fields, None, sep);
    row
}

/// Flatten every record, preserving order.
pub fn flatten_all(records: &[Record], sep: &str) -> Vec<FlatRow> {
    records.iter().map(|r| flatten(r.fields(), sep)).collect()
}

fn flatten_into(row: &mut FlatRow, fields: &Map<String, Value>, parent: Option<&str>, sep: &str) {
    for (key, value) in fields {
        let path = match parent {
            Some(parent) => format!("{parent}{sep}{key}"),
            None => key.clone(),
        };
        flatten_value(row, path, value, sep);
    }
}

fn flatten_value(row: &mut FlatRow, path: String, value: &Value, sep: &str) {
    match value {
        Value::Object(child) => flatten_into(row, child, Some(&path), sep),
        Value::Array(items) if is_sequence_of_mappings(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(row, format!("{path}{sep}{index}"), item, sep);
            }
        }
        // Scalars, mixed and empty sequences land as one cell.
        other => row.insert(path, other.clone()),
    }
}

fn is_sequence_of_mappings(items: &[Value]) -> bool {
    !items.is_empty() && items.iter().all(Value::is_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_nested_mapping() {
        let row = flatten(&map(json!({"a": {"b": 1}})), DEFAULT_SEPARATOR);
        assert_eq!(row.cells(), &map(json!({"a_b": 1})));
    }

    #[test]
    fn test_sequence_of_mappings_by_index() {
        let row = flatten(&map(json!({"a": [{"x": 1}, {"x": 2}]})), DEFAULT_SEPARATOR);
        assert_eq!(row.cells(), &map(json!({"a_0_x": 1, "a_1_x": 2})));
    }

    #[test]
    fn test_scalar_sequences_become_text() {
        let row = flatten(
            &map(json!({"tags": ["a", "b"], "empty": [], "mixed": [{"x": 1}, 2]})),
            DEFAULT_SEPARATOR,
        );
        assert_eq!(row.get("tags"), Some(&json!(r#"["a","b"]"#)));
        assert_eq!(row.get("empty"), Some(&json!("[]")));
        assert_eq!(row.get("mixed"), Some(&json!(r#"[{"x":1},2]"#)));
    }

    #[test]
    fn test_deep_nesting_with_custom_separator() {
        let row = flatten(
            &map(json!({"game": {"teams": [{"home": {"name": "SEA"}}], "id": 9}})),
            ".",
        );
        assert_eq!(
            row.cells(),
            &map(json!({"game.teams.0.home.name": "SEA", "game.id": 9}))
        );
    }

    #[test]
    fn test_idempotent_on_flat_input() {
        let flat = map(json!({"a_b": 1, "c": "x", "d": null, "e": true, "f": "[1,2]"}));
        let once = flatten(&flat, DEFAULT_SEPARATOR);
        let twice = flatten(&once.clone().into_map(), DEFAULT_SEPARATOR);
        assert_eq!(once.cells(), &flat);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_empty_mapping_contributes_nothing() {
        let row = flatten(&map(json!({"meta": {}, "id": 1})), DEFAULT_SEPARATOR);
        assert_eq!(row.cells(), &map(json!({"id": 1})));
    }

    #[test]
    fn test_collision_later_write_wins() {
        let row = flatten(&map(json!({"a": {"b": 1}, "a_b": 2})), DEFAULT_SEPARATOR);
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("a_b"), Some(&json!(2)));
    }

    #[test]
    fn test_no_containers_in_output() {
        let row = flatten(
            &map(json!({"a": {"b": [{"c": {"d": [1]}}]}, "e": [[1], [2]]})),
            DEFAULT_SEPARATOR,
        );
        assert!(row.cells().values().all(|v| !v.is_object() && !v.is_array()));
    }
}

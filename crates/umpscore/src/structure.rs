//! Shape summaries of JSON responses, used by endpoint discovery reports.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The top-level shape of a response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseShape {
    Object {
        keys: Vec<String>,
        sample_types: Map<String, Value>,
    },
    Array {
        count: usize,
        item_keys: Vec<String>,
        sample_item_types: Map<String, Value>,
    },
}

/// Summarize a body. Only mappings and sequences led by a mapping have a shape.
pub fn analyze(body: &Value) -> Option<ResponseShape> {
    match body {
        Value::Object(fields) => Some(ResponseShape::Object {
            keys: fields.keys().cloned().collect(),
            sample_types: type_map(fields),
        }),
        Value::Array(items) => {
            let first = items.first()?.as_object()?;
            Some(ResponseShape::Array {
                count: items.len(),
                item_keys: first.keys().cloned().collect(),
                sample_item_types: type_map(first),
            })
        }
        _ => None,
    }
}

/// JSON type name of a value.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_map(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(type_name(v).to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_shape() {
        let shape = analyze(&json!({"name": "x", "games": 3, "tags": []})).unwrap();
        match shape {
            ResponseShape::Object { keys, sample_types } => {
                assert_eq!(keys, vec!["name", "games", "tags"]);
                assert_eq!(sample_types["games"], json!("number"));
                assert_eq!(sample_types["tags"], json!("array"));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn test_array_shape() {
        let shape = analyze(&json!([{"id": 1, "ok": true}, {"id": 2}])).unwrap();
        assert_eq!(
            shape,
            ResponseShape::Array {
                count: 2,
                item_keys: vec!["id".into(), "ok".into()],
                sample_item_types: json!({"id": "number", "ok": "bool"})
                    .as_object()
                    .unwrap()
                    .clone(),
            }
        );
    }

    #[test]
    fn test_no_shape() {
        assert!(analyze(&json!([])).is_none());
        assert!(analyze(&json!([1, 2])).is_none());
        assert!(analyze(&json!("text")).is_none());
    }
}

//! Lenient access to loosely shaped replay JSON.
//!
//! Replay writers changed container shapes over the years: the result
//! section is an array in some files and an object keyed `"0"`, `"1"` in
//! others, and the legacy payload keys dicts by integers. These helpers treat
//! both shapes alike.

use serde_json::Value;

/// Element `index` of a JSON array, or the member keyed by its decimal
/// string in an object.
pub fn element(container: &Value, index: usize) -> Option<&Value> {
    match container {
        Value::Array(items) => items.get(index),
        Value::Object(members) => members.get(&index.to_string()),
        _ => None,
    }
}

/// Render a JSON value as an object key.
pub fn map_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

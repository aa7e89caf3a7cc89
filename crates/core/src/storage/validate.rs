//! Shape validation for snapshot documents.
//!
//! Runs on the raw JSON before typed deserialization so that a malformed
//! document is reported with the path of the first offending field.

use serde_json::{Map, Value};
use std::fmt;

/// The first field of a snapshot document that does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// JSON-pointer-like location, e.g. `nodes[3][1].embedding[0]`.
    pub path: String,
    pub expected: &'static str,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}", self.path, self.expected)
    }
}

impl std::error::Error for ValidationError {}

fn fail<T>(path: impl Into<String>, expected: &'static str) -> Result<T, ValidationError> {
    Err(ValidationError {
        path: path.into(),
        expected,
    })
}

/// Checks field presence and types of a snapshot document.
pub fn validate_snapshot(doc: &Value) -> Result<(), ValidationError> {
    let Some(root) = doc.as_object() else {
        return fail("$", "an object");
    };

    for field in ["M", "efConstruction", "levelMax"] {
        require_unsigned(root, field, field)?;
    }
    match root.get("entryPointId") {
        Some(v) if v.is_i64() || v.is_u64() => {}
        _ => return fail("entryPointId", "an integer"),
    }
    match root.get("metric") {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if s == "cosine" || s == "euclidean" => {}
        Some(_) => return fail("metric", "\"cosine\" or \"euclidean\""),
    }

    let (key, nodes) = match (root.get("nodes"), root.get("node")) {
        (Some(nodes), _) => ("nodes", nodes),
        (None, Some(nodes)) => ("node", nodes),
        (None, None) => return fail("nodes", "an array"),
    };
    let Some(nodes) = nodes.as_array() else {
        return fail(key, "an array");
    };
    for (i, entry) in nodes.iter().enumerate() {
        validate_entry(&format!("{key}[{i}]"), entry)?;
    }
    Ok(())
}

fn validate_entry(path: &str, entry: &Value) -> Result<(), ValidationError> {
    let pair = match entry.as_array() {
        Some(pair) if pair.len() == 2 => pair,
        _ => return fail(path, "an [id, node] pair"),
    };
    if !pair[0].is_u64() {
        return fail(format!("{path}[0]"), "an unsigned integer id");
    }

    let record_path = format!("{path}[1]");
    let Some(record) = pair[1].as_object() else {
        return fail(record_path, "an object");
    };
    require_unsigned(record, "id", &format!("{record_path}.id"))?;
    require_unsigned(record, "level", &format!("{record_path}.level"))?;
    match record.get("content") {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => return fail(format!("{record_path}.content"), "a string or null"),
    }

    let embedding_path = format!("{record_path}.embedding");
    let Some(embedding) = record.get("embedding").and_then(Value::as_array) else {
        return fail(embedding_path, "an array of numbers");
    };
    if let Some(i) = embedding.iter().position(|v| !v.is_number()) {
        return fail(format!("{embedding_path}[{i}]"), "a number");
    }

    let neighbors_path = format!("{record_path}.neighbors");
    let Some(layers) = record.get("neighbors").and_then(Value::as_array) else {
        return fail(neighbors_path, "an array of arrays");
    };
    for (layer, list) in layers.iter().enumerate() {
        let Some(list) = list.as_array() else {
            return fail(format!("{neighbors_path}[{layer}]"), "an array of integers");
        };
        if let Some(j) = list.iter().position(|v| !(v.is_i64() || v.is_u64())) {
            return fail(format!("{neighbors_path}[{layer}][{j}]"), "an integer");
        }
    }
    Ok(())
}

fn require_unsigned(
    obj: &Map<String, Value>,
    field: &str,
    path: &str,
) -> Result<(), ValidationError> {
    match obj.get(field) {
        Some(v) if v.is_u64() => Ok(()),
        _ => fail(path, "an unsigned integer"),
    }
}

//! Flattening of nested JSON records into dot-separated keys.

use serde_json::{Map, Value};

/// One collected record: a flat map from dotted paths to leaf values.
pub type RawRecord = Map<String, Value>;

/// Flattens nested objects so `{"adv": {"price": "1"}}` becomes
/// `{"adv.price": "1"}`. Arrays and scalars are kept as leaves.
#[must_use]
pub fn flatten(value: &Value) -> RawRecord {
    let mut out = Map::new();
    match value {
        Value::Object(map) => flatten_into(&mut out, None, map),
        other => {
            out.insert(String::new(), other.clone());
        }
    }
    out
}

fn flatten_into(out: &mut RawRecord, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, value) in map {
        let path = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(out, Some(&path), inner),
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

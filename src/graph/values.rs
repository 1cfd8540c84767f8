//! Path resolution through JSON response payloads.

use serde_json::Value;

/// Every non-null value reachable by following `path` through `data`.
///
/// Arrays are flattened at every level (including the result), null and
/// missing values are pruned, and scalars cannot be descended into.
pub fn values_at_path<'a, S: AsRef<str>>(data: &'a Value, path: &[S]) -> Vec<&'a Value> {
    let mut out = Vec::new();
    collect(data, path, &mut out);
    out
}

fn collect<'a, S: AsRef<str>>(data: &'a Value, path: &[S], out: &mut Vec<&'a Value>) {
    match data {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                collect(item, path, out);
            }
        }
        _ if path.is_empty() => out.push(data),
        Value::Object(map) => {
            if let Some(child) = map.get(path[0].as_ref()) {
                collect(child, &path[1..], out);
            }
        }
        _ => {}
    }
}

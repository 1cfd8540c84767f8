//! Feeding response payloads into memory.
//!
//! Every string or number leaf is stored under the name of the field that
//! holds it. When the enclosing object reports its `__typename`, the schema
//! supplies richer labels: the qualified field name, the type name and the
//! declared scalar type.

use serde_json::{Map, Value};

use crate::error::MemoryResult;
use crate::memory::{Assoc, FuzzyMemory, MemoryValue, Tokenizer};
use crate::schema::{Schema, TYPENAME_FIELD, TypeKind};

/// Store every scalar leaf of `data` in `memory`.
///
/// Returns the number of newly stored entries.
pub fn ingest<T: Tokenizer>(schema: &Schema, memory: &mut FuzzyMemory<T>, data: &Value) -> MemoryResult<usize> {
    let mut stored = 0;
    walk(schema, memory, data, None, &mut stored)?;
    Ok(stored)
}

fn walk<T: Tokenizer>(
    schema: &Schema,
    memory: &mut FuzzyMemory<T>,
    data: &Value,
    parent: Option<(&Map<String, Value>, &str)>,
    stored: &mut usize,
) -> MemoryResult<()> {
    match data {
        Value::Array(items) => {
            for item in items {
                walk(schema, memory, item, parent, stored)?;
            }
        }
        Value::Object(map) => {
            for (key, value) in map {
                walk(schema, memory, value, Some((map, key.as_str())), stored)?;
            }
        }
        Value::String(_) | Value::Number(_) => {
            // Top-level scalars have no label to remember them by.
            let Some((container, key)) = parent else {
                return Ok(());
            };
            let (Some(value), Some(assoc)) = (MemoryValue::from_json(data), leaf_assoc(schema, container, key))
            else {
                return Ok(());
            };
            if memory.store(value, assoc)? {
                *stored += 1;
            }
        }
        Value::Null | Value::Bool(_) => {}
    }
    Ok(())
}

/// Labels for the scalar at `container[key]`, or `None` if it must not be stored.
fn leaf_assoc(schema: &Schema, container: &Map<String, Value>, key: &str) -> Option<Assoc> {
    if key == TYPENAME_FIELD {
        return None;
    }

    let mut assoc = Assoc::new();

    if let Some(typename) = container.get(TYPENAME_FIELD).and_then(Value::as_str) {
        match schema.get(typename).and_then(|ty| ty.field(key)) {
            Some(field) => {
                let scalar = field.ty.named_type();
                if schema.get(scalar).is_some_and(|ty| ty.kind == TypeKind::Enum) {
                    return None;
                }
                let scalar_weight = match scalar {
                    "Float" | "Int" | "String" => 0.1,
                    _ => 0.4,
                };
                assoc.insert(format!("{typename} {key}"), 1.0);
                assoc.insert(typename.to_string(), 0.3);
                assoc.insert(scalar.to_string(), scalar_weight);
            }
            None => {
                tracing::debug!(typename, field = key, "response field not in schema");
            }
        }
    }

    assoc.insert(key.to_string(), 1.0);
    Some(assoc)
}

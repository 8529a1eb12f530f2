use crate::example::value_kind;
use crate::merge::merge;
use log::debug;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Describe a concrete value as a schema node by inspecting its shape.
///
/// Scalars keep the literal as `example` when `with_example` is set. Lists
/// are described from their first element only; an empty list or map gives
/// a bare `object`. `additional` is merged over the result.
pub fn describe_value(value: &Value, additional: Option<&Value>, with_example: bool) -> Value {
    let described = describe_node(value, with_example);
    match additional {
        Some(extra @ Value::Object(_)) => merge([described, extra.clone()]),
        _ => described,
    }
}

/// Describe any serializable value through its serde mapping.
///
/// Serialization stands in for the "export to mapping" capability; a value
/// that fails to serialize is described as a bare `object`.
pub fn describe_serializable<T: Serialize>(value: &T, additional: Option<&Value>, with_example: bool) -> Value {
    match serde_json::to_value(value) {
        Ok(exported) => describe_value(&exported, additional, with_example),
        Err(e) => {
            debug!("Value could not be exported for description: {}", e);
            json!({"type": "object"})
        }
    }
}

fn describe_node(value: &Value, with_example: bool) -> Value {
    match value {
        Value::Array(items) => match items.first() {
            Some(first) => json!({
                "type": "array",
                "items": describe_node(first, with_example),
            }),
            None => json!({"type": "object"}),
        },
        Value::Object(entries) => {
            if entries.is_empty() {
                return json!({"type": "object"});
            }
            let properties: Map<String, Value> = entries
                .iter()
                .map(|(key, entry)| (key.clone(), describe_node(entry, with_example)))
                .collect();
            json!({"type": "object", "properties": properties})
        }
        scalar => {
            let mut node = Map::new();
            node.insert("type".to_string(), json!(value_kind(scalar).as_str()));
            if with_example && !scalar.is_null() {
                node.insert("example".to_string(), scalar.clone());
            }
            Value::Object(node)
        }
    }
}

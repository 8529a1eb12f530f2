//! Deep merge of schema- and document-shaped trees.
//!
//! Trees are [`serde_json::Value`]s, so lists and mappings are told apart by
//! the value variant itself. The rules applied for every pair:
//!
//! - list + list: incoming elements are appended (positional keys never
//!   overwrite each other);
//! - mapping + mapping: keys whose values are containers of the same kind
//!   on both sides are merged recursively, every other key is overwritten by
//!   the right operand;
//! - anything else: the right operand wins.
//!
//! Merging is a left fold, so `merge([merge([a, b]), c]) == merge([a, b, c])`.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeMode {
    Plain,
    /// Skip appending list elements already present in the accumulator.
    Unique,
    /// Children of a `properties` mapping are replaced, never deep-merged.
    PropertiesRewrite,
}

/// Merge all values left to right.
pub fn merge<I>(values: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    fold(values, MergeMode::Plain)
}

/// Like [`merge`], but list accumulators never receive duplicates.
pub fn merge_unique<I>(values: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    fold(values, MergeMode::Unique)
}

/// Like [`merge`], but each entry of a `properties` mapping is taken whole
/// from the right operand.
pub fn merge_with_properties_rewrite<I>(values: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    fold(values, MergeMode::PropertiesRewrite)
}

/// Merge `incoming` into `target` in place.
pub fn merge_into(target: &mut Value, incoming: Value) {
    merge_pair(target, incoming, MergeMode::Plain);
}

fn fold<I>(values: I, mode: MergeMode) -> Value
where
    I: IntoIterator<Item = Value>,
{
    let mut iter = values.into_iter();
    let mut acc = match iter.next() {
        Some(first) => first,
        None => return Value::Object(Map::new()),
    };
    for value in iter {
        merge_pair(&mut acc, value, mode);
    }
    acc
}

fn merge_pair(acc: &mut Value, incoming: Value, mode: MergeMode) {
    match (acc, incoming) {
        (Value::Object(target), Value::Object(source)) => merge_maps(target, source, mode),
        (Value::Array(target), Value::Array(source)) => {
            for value in source {
                if mode == MergeMode::Unique && target.contains(&value) {
                    continue;
                }
                target.push(value);
            }
        }
        (acc, incoming) => *acc = incoming,
    }
}

fn merge_maps(target: &mut Map<String, Value>, source: Map<String, Value>, mode: MergeMode) {
    for (key, value) in source {
        match target.get_mut(&key) {
            Some(Value::Object(existing)) if mode == MergeMode::PropertiesRewrite && key == "properties" => {
                match value {
                    Value::Object(children) => {
                        for (name, child) in children {
                            existing.insert(name, child);
                        }
                    }
                    other => {
                        target.insert(key, other);
                    }
                }
            }
            Some(existing) if same_container(&*existing, &value) => merge_pair(existing, value, mode),
            _ => {
                target.insert(key, value);
            }
        }
    }
}

fn same_container(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_))
    )
}

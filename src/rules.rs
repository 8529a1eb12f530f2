//! Example documents synthesized from validation rules.
//!
//! Request classes describe their input as a flat map of dotted keys to rule
//! lists (`"videos.*.url" => "required|url"`). The map is expanded into a
//! [`RuleTree`], every leaf gets an example from its first rule that yields
//! one, all rules contribute schema constraints, and `required` rules are
//! tracked in a parallel tree.

use crate::context::DescribeContext;
use crate::describer::describe_value;
use crate::example::value_kind;
use crate::rule_token::{RawRules, RuleKind, RuleToken};
use crate::type_normalizer::ScalarKind;
use indexmap::IndexMap;
use log::debug;
use serde_json::{json, Map, Value};

/// Segment standing for every element of an array
pub const WILDCARD: &str = "*";

/// Raw rules of a request class, keyed by dotted path
pub type RuleMap = IndexMap<String, RawRules>;

/// Nested rules; see [`expand_rules`]
pub type RuleTree = IndexMap<String, RuleNode>;

#[derive(Debug, Clone, PartialEq)]
pub enum RuleNode {
    Leaf(Vec<RuleToken>),
    Branch(RuleTree),
}

/// Required flags mirroring the shape of a [`RuleTree`].
#[derive(Debug, Clone, PartialEq)]
pub enum RequiredNode {
    Leaf(bool),
    Branch {
        /// The branch's own rules contain `required`
        self_required: bool,
        children: IndexMap<String, RequiredNode>,
    },
}

impl RequiredNode {
    pub fn is_required(&self) -> bool {
        match self {
            RequiredNode::Leaf(required) => *required,
            RequiredNode::Branch { self_required, .. } => *self_required,
        }
    }
}

/// Everything derived from one rule map.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSynthesis {
    /// Example document
    pub example: Value,
    /// Schema constraints per dotted path
    pub constraints: IndexMap<String, Map<String, Value>>,
    /// Required flags per top-level key
    pub required: IndexMap<String, RequiredNode>,
}

/// Expand dotted keys into a nested tree.
///
/// A key that is both a leaf and the parent of other keys becomes a branch;
/// its own rules stay reachable through the raw map. Numeric segments
/// (`items.0`) are dropped.
pub fn expand_rules(raw: &RuleMap) -> RuleTree {
    let mut tree = RuleTree::new();
    for (path, rules) in raw {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            continue;
        }
        if segments.iter().any(|segment| is_numeric(segment)) {
            debug!("Dropping list-indexed rule key {}", path);
            continue;
        }
        insert_path(&mut tree, &segments, rules.tokens());
    }
    tree
}

fn insert_path(tree: &mut RuleTree, segments: &[&str], tokens: Vec<RuleToken>) {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => return,
    };
    if rest.is_empty() {
        if !matches!(tree.get(*head), Some(RuleNode::Branch(_))) {
            tree.insert(head.to_string(), RuleNode::Leaf(tokens));
        }
        return;
    }
    let node = tree
        .entry(head.to_string())
        .or_insert_with(|| RuleNode::Branch(RuleTree::new()));
    if let RuleNode::Leaf(_) = node {
        *node = RuleNode::Branch(RuleTree::new());
    }
    if let RuleNode::Branch(children) = node {
        insert_path(children, rest, tokens);
    }
}

fn is_numeric(segment: &str) -> bool {
    segment.chars().all(|c| c.is_ascii_digit())
}

/// Synthesize the example document, constraints and required tree.
pub fn synthesize(ctx: &mut DescribeContext, tree: &RuleTree, raw: &RuleMap) -> RuleSynthesis {
    let mut synthesis = RuleSynthesis {
        example: Value::Null,
        constraints: IndexMap::new(),
        required: IndexMap::new(),
    };
    let (example, required) = synthesize_branch(ctx, tree, raw, None, None, &mut synthesis.constraints);
    synthesis.example = example;
    synthesis.required = required;
    synthesis
}

fn synthesize_branch(
    ctx: &mut DescribeContext,
    tree: &RuleTree,
    raw: &RuleMap,
    prefix: Option<&str>,
    parent: Option<&str>,
    constraints: &mut IndexMap<String, Map<String, Value>>,
) -> (Value, IndexMap<String, RequiredNode>) {
    let mut example = Map::new();
    let mut required = IndexMap::new();

    for (key, node) in tree {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };
        let name = if key == WILDCARD { parent.unwrap_or(key) } else { key.as_str() };

        match node {
            RuleNode::Leaf(tokens) => {
                let value = leaf_example(ctx, name, tokens);
                record_constraints(constraints, &path, tokens, &value);
                required.insert(key.clone(), RequiredNode::Leaf(has_rule(tokens, &RuleKind::Required)));
                example.insert(key.clone(), value);
            }
            RuleNode::Branch(children) => {
                let (nested, children_required) =
                    synthesize_branch(ctx, children, raw, Some(&path), Some(name), constraints);
                let nested = if is_wildcard_only(children) {
                    match nested {
                        Value::Object(mut map) => json!([map.remove(WILDCARD).unwrap_or(Value::Null)]),
                        other => other,
                    }
                } else {
                    nested
                };
                let own = raw.get(&path).map(RawRules::tokens).unwrap_or_default();
                record_constraints(constraints, &path, &own, &nested);
                required.insert(
                    key.clone(),
                    RequiredNode::Branch {
                        self_required: has_rule(&own, &RuleKind::Required),
                        children: children_required,
                    },
                );
                example.insert(key.clone(), nested);
            }
        }
    }
    (Value::Object(example), required)
}

fn is_wildcard_only(tree: &RuleTree) -> bool {
    tree.len() == 1 && tree.contains_key(WILDCARD)
}

fn has_rule(tokens: &[RuleToken], kind: &RuleKind) -> bool {
    tokens.iter().any(|token| &token.kind == kind)
}

/// Example of a leaf: the first rule yielding one wins, then the field name,
/// then a plain string.
fn leaf_example(ctx: &mut DescribeContext, name: &str, tokens: &[RuleToken]) -> Value {
    for token in tokens {
        if let Some(value) = ctx.examples.example(None, Some(name), Some(token)).value {
            return value;
        }
    }
    if let Some(value) = ctx.examples.example(None, Some(name), None).value {
        return value;
    }
    ctx.examples
        .example(Some("string"), Some(name), None)
        .value
        .unwrap_or_else(|| json!(name))
}

/// Constraints of every rule token, keyed by the kind of the example.
fn record_constraints(
    constraints: &mut IndexMap<String, Map<String, Value>>,
    path: &str,
    tokens: &[RuleToken],
    example: &Value,
) {
    let kind = value_kind(example);
    let mut found = Map::new();
    for token in tokens {
        match token.kind {
            RuleKind::Min => insert_bound(&mut found, kind, Bound::Min, token.numeric_param(0)),
            RuleKind::Max => insert_bound(&mut found, kind, Bound::Max, token.numeric_param(0)),
            RuleKind::Between => {
                insert_bound(&mut found, kind, Bound::Min, token.numeric_param(0));
                insert_bound(&mut found, kind, Bound::Max, token.numeric_param(1));
            }
            RuleKind::Size => {
                insert_bound(&mut found, kind, Bound::Min, token.numeric_param(0));
                insert_bound(&mut found, kind, Bound::Max, token.numeric_param(0));
            }
            RuleKind::In => {
                found.insert("enum".to_string(), enum_values(&token.params));
            }
            RuleKind::Nullable => {
                found.insert("nullable".to_string(), json!(true));
            }
            _ => {}
        }
    }
    if !found.is_empty() {
        constraints.entry(path.to_string()).or_default().extend(found);
    }
}

#[derive(Clone, Copy)]
enum Bound {
    Min,
    Max,
}

fn insert_bound(found: &mut Map<String, Value>, kind: ScalarKind, bound: Bound, value: Option<Value>) {
    let Some(value) = value else { return };
    let key = match (kind, bound) {
        (ScalarKind::Integer | ScalarKind::Number, Bound::Min) => "minimum",
        (ScalarKind::Integer | ScalarKind::Number, Bound::Max) => "maximum",
        (ScalarKind::String, Bound::Min) => "minLength",
        (ScalarKind::String, Bound::Max) => "maxLength",
        (ScalarKind::Array, Bound::Min) => "minItems",
        (ScalarKind::Array, Bound::Max) => "maxItems",
        _ => return,
    };
    found.insert(key.to_string(), value);
}

/// Sorted allowed values without blanks; numbers when every value is one.
fn enum_values(params: &[String]) -> Value {
    let mut values: Vec<&str> = params.iter().map(|p| p.trim()).filter(|p| !p.is_empty()).collect();
    let numbers: Option<Vec<i64>> = values.iter().map(|v| v.parse::<i64>().ok()).collect();
    if let Some(mut numbers) = numbers {
        numbers.sort_unstable();
        numbers.dedup();
        return json!(numbers);
    }
    values.sort_unstable();
    values.dedup();
    json!(values)
}

/// Schema of the synthesized document.
///
/// Examples become typed properties, constraints and labels are attached
/// at their paths and `required` lists are written per object level when
/// not empty.
pub fn to_schema(synthesis: &RuleSynthesis, labels: &IndexMap<String, String>) -> Value {
    let mut schema = describe_value(&synthesis.example, None, true);
    if schema.get("properties").is_none() {
        schema = json!({ "type": "object", "properties": {} });
    }
    for (path, found) in &synthesis.constraints {
        if let Some(Value::Object(node)) = node_at_path(&mut schema, path) {
            node.extend(found.clone());
        }
    }
    for (path, label) in labels {
        if let Some(Value::Object(node)) = node_at_path(&mut schema, path) {
            node.insert("description".to_string(), json!(label));
        }
    }
    apply_required(&mut schema, &synthesis.required);
    schema
}

fn node_at_path<'v>(schema: &'v mut Value, path: &str) -> Option<&'v mut Value> {
    path.split('.').try_fold(schema, |node, segment| {
        if segment == WILDCARD {
            node.get_mut("items")
        } else {
            node.get_mut("properties")?.get_mut(segment)
        }
    })
}

fn apply_required(schema: &mut Value, required: &IndexMap<String, RequiredNode>) {
    let names: Vec<&String> = required
        .iter()
        .filter(|(key, node)| key.as_str() != WILDCARD && node.is_required())
        .map(|(key, _)| key)
        .collect();
    if !names.is_empty() && schema.get("properties").is_some() {
        if let Value::Object(node) = schema {
            node.insert("required".to_string(), json!(names));
        }
    }
    for (key, node) in required {
        let RequiredNode::Branch { children, .. } = node else {
            continue;
        };
        let child = if key == WILDCARD {
            schema.get_mut("items")
        } else {
            schema.get_mut("properties").and_then(|p| p.get_mut(key))
        };
        if let Some(child) = child {
            apply_required(child, children);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::reflection::ClassRegistry;
    use pretty_assertions::assert_eq;

    fn rules(entries: &[(&str, &str)]) -> RuleMap {
        entries
            .iter()
            .map(|(key, rules)| (key.to_string(), RawRules::from(*rules)))
            .collect()
    }

    fn schema_for(raw: &RuleMap) -> Value {
        let registry = ClassRegistry::new();
        let mut ctx = DescribeContext::new(&registry, &GeneratorConfig::default()).unwrap();
        let synthesis = synthesize(&mut ctx, &expand_rules(raw), raw);
        to_schema(&synthesis, &IndexMap::new())
    }

    #[test]
    fn test_expand_dotted_keys() {
        let raw = rules(&[
            ("title", "required|string"),
            ("videos", "array"),
            ("videos.*.url", "url"),
            ("videos.0.url", "url"),
        ]);
        let tree = expand_rules(&raw);
        assert!(matches!(tree.get("title"), Some(RuleNode::Leaf(tokens)) if tokens.len() == 2));
        let Some(RuleNode::Branch(videos)) = tree.get("videos") else {
            panic!("videos should be a branch");
        };
        assert_eq!(videos.keys().collect::<Vec<_>>(), vec!["*"]);
        let Some(RuleNode::Branch(element)) = videos.get("*") else {
            panic!("wildcard should be a branch");
        };
        assert!(matches!(element.get("url"), Some(RuleNode::Leaf(_))));
    }

    #[test]
    fn test_leaf_declared_before_children_becomes_branch() {
        let raw = rules(&[("meta.tags", "array"), ("meta", "required")]);
        let tree = expand_rules(&raw);
        assert!(matches!(tree.get("meta"), Some(RuleNode::Branch(_))));
    }

    #[test]
    fn test_required_propagation() {
        let raw = rules(&[("title", "required|string"), ("tags.*", "string")]);
        let schema = schema_for(&raw);
        assert_eq!(schema["required"], json!(["title"]));
        assert_eq!(schema["properties"]["tags"]["type"], json!("array"));
        assert_eq!(schema["properties"]["tags"]["items"]["type"], json!("string"));
    }

    #[test]
    fn test_string_constraints_use_length_keys() {
        let raw = rules(&[("nickname", "required|min:3|max:10")]);
        let schema = schema_for(&raw);
        let nickname = &schema["properties"]["nickname"];
        assert_eq!(nickname["type"], json!("string"));
        assert_eq!(nickname["minLength"], json!(3));
        assert_eq!(nickname["maxLength"], json!(10));
        assert!(nickname.get("minimum").is_none());
    }

    #[test]
    fn test_email_and_age_end_to_end() {
        let registry = ClassRegistry::new();
        let mut ctx = DescribeContext::new(&registry, &GeneratorConfig::default()).unwrap();
        let raw = RuleMap::from_iter([
            ("email".to_string(), RawRules::from(vec!["required", "email"])),
            ("age".to_string(), RawRules::from(vec!["integer", "min:18"])),
        ]);
        let synthesis = synthesize(&mut ctx, &expand_rules(&raw), &raw);
        let schema = to_schema(&synthesis, &IndexMap::new());

        let email = &schema["properties"]["email"];
        assert_eq!(email["type"], json!("string"));
        assert_eq!(email["example"], json!("john.smith@example.com"));

        let age = &schema["properties"]["age"];
        assert_eq!(age["type"], json!("integer"));
        assert_eq!(age["minimum"], json!(18));
        assert!(age["example"].as_i64().unwrap() >= 1);

        assert_eq!(schema["required"], json!(["email"]));
    }

    #[test]
    fn test_between_in_and_nullable() {
        let raw = rules(&[
            ("price", "numeric|between:1.5,99"),
            ("status", "in:published,,draft"),
            ("level", "nullable|in:3,1,2"),
        ]);
        let schema = schema_for(&raw);
        let price = &schema["properties"]["price"];
        assert_eq!(price["minimum"], json!(1.5));
        assert_eq!(price["maximum"], json!(99));
        assert_eq!(schema["properties"]["status"]["enum"], json!(["draft", "published"]));
        assert_eq!(schema["properties"]["status"]["example"], json!("published"));
        assert_eq!(schema["properties"]["level"]["enum"], json!([1, 2, 3]));
        assert_eq!(schema["properties"]["level"]["nullable"], json!(true));
        assert!(schema.get("required").is_none());
    }

    #[test]
    fn test_wildcard_leaf_uses_parent_name() {
        let raw = rules(&[("website", "required|array|min:1"), ("website.*", "string")]);
        let schema = schema_for(&raw);
        let website = &schema["properties"]["website"];
        assert_eq!(website["type"], json!("array"));
        assert_eq!(website["minItems"], json!(1));
        assert!(website["items"]["example"].as_str().unwrap().starts_with("https://"));
        assert_eq!(schema["required"], json!(["website"]));
    }

    #[test]
    fn test_nested_required_lists() {
        let raw = rules(&[
            ("address", "required"),
            ("address.city", "required|string"),
            ("address.zip", "string"),
            ("videos.*.url", "required|url"),
        ]);
        let schema = schema_for(&raw);
        assert_eq!(schema["required"], json!(["address"]));
        assert_eq!(schema["properties"]["address"]["required"], json!(["city"]));
        let video = &schema["properties"]["videos"]["items"];
        assert_eq!(video["type"], json!("object"));
        assert_eq!(video["required"], json!(["url"]));
    }

    #[test]
    fn test_labels_become_descriptions() {
        let registry = ClassRegistry::new();
        let mut ctx = DescribeContext::new(&registry, &GeneratorConfig::default()).unwrap();
        let raw = rules(&[("title", "string"), ("tags.*", "string")]);
        let synthesis = synthesize(&mut ctx, &expand_rules(&raw), &raw);
        let labels = IndexMap::from([
            ("title".to_string(), "Post title".to_string()),
            ("tags.*".to_string(), "A tag".to_string()),
        ]);
        let schema = to_schema(&synthesis, &labels);
        assert_eq!(schema["properties"]["title"]["description"], json!("Post title"));
        assert_eq!(schema["properties"]["tags"]["items"]["description"], json!("A tag"));
    }
}

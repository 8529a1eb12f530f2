//! Schema builder for one documented value: a response body, a property, a
//! parameter.
//!
//! A [`Variable`] is assembled with the fluent setters and turned into a
//! schema node by [`Variable::describe`]. The steps are:
//!
//! 1. fill in a missing type from the example (or from the name), or a
//!    missing example from the type;
//! 2. map the type to a schema type;
//! 3. expand objects from class metadata, going through the reference cache;
//! 4. expand arrays into `items`;
//! 5. attach the common attributes and strip keys the final type forbids.

use crate::annotation::{Annotation, AnnotationKind, ResponseAnnotation};
use crate::context::DescribeContext;
use crate::describer::describe_value;
use crate::example::value_kind;
use crate::error::{Error, Result};
use crate::merge::{merge_into, merge_with_properties_rewrite};
use crate::reference_cache::ReferenceKey;
use crate::type_normalizer::{ScalarKind, TypeToken};
use log::{debug, warn};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

const ARRAY_SUFFIX: &str = "[]";

/// Keys that only make sense for one schema type.
const ARRAY_ONLY_KEYS: [&str; 3] = ["items", "minItems", "maxItems"];
const OBJECT_ONLY_KEYS: [&str; 2] = ["properties", "required"];
const STRING_ONLY_KEYS: [&str; 2] = ["minLength", "maxLength"];
const NUMBER_ONLY_KEYS: [&str; 2] = ["minimum", "maximum"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variable {
    name: Option<String>,
    type_name: Option<String>,
    example: Option<Value>,
    description: Option<String>,
    with: Vec<String>,
    except: Vec<String>,
    only: Vec<String>,
    /// Schema fragments merged over the described properties; dotted keys
    /// address nested properties.
    properties: Map<String, Value>,
    /// Item type for arrays whose declared type carries no `[]`.
    items: Option<String>,
}

impl Variable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: &str) -> Self {
        Self::new().name(name)
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn type_name(mut self, type_name: &str) -> Self {
        self.type_name = Some(type_name.to_string());
        self
    }

    pub fn example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Relations to expand.
    pub fn with(mut self, with: Vec<String>) -> Self {
        self.with = with;
        self
    }

    /// Properties to drop.
    pub fn except(mut self, except: Vec<String>) -> Self {
        self.except = except;
        self
    }

    /// Properties to keep, all others are dropped.
    pub fn only(mut self, only: Vec<String>) -> Self {
        self.only = only;
        self
    }

    pub fn properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }

    pub fn items(mut self, items: &str) -> Self {
        self.items = Some(items.to_string());
        self
    }

    fn set_type_opt(mut self, type_name: Option<&String>) -> Self {
        self.type_name = type_name.cloned();
        self
    }

    fn set_example_opt(mut self, example: Option<&Value>) -> Self {
        self.example = example.cloned();
        self
    }

    fn set_description_opt(mut self, description: Option<&String>) -> Self {
        self.description = description.cloned();
        self
    }

    /// Variable for a documented response.
    pub fn from_response(response: &ResponseAnnotation) -> Self {
        Variable::new()
            .set_type_opt(response.type_name.as_ref())
            .set_example_opt(response.example.as_ref())
            .set_description_opt(response.description.as_ref())
            .with(response.with.clone())
            .except(response.except.clone())
            .only(response.only.clone())
            .properties(response.properties.clone())
    }

    fn unset(&self, attribute: &'static str) -> Error {
        Error::UnsetAttribute {
            variable: self.name.clone().unwrap_or_else(|| "<anonymous>".to_string()),
            attribute,
        }
    }

    pub fn get_name(&self) -> Result<&str> {
        self.name.as_deref().ok_or_else(|| self.unset("name"))
    }

    pub fn get_type(&self) -> Result<&str> {
        self.type_name.as_deref().ok_or_else(|| self.unset("type"))
    }

    pub fn get_example(&self) -> Result<&Value> {
        self.example.as_ref().ok_or_else(|| self.unset("example"))
    }

    pub fn get_description(&self) -> Result<&str> {
        self.description.as_deref().ok_or_else(|| self.unset("description"))
    }

    /// Resolve the final schema node.
    ///
    /// Fails only on configuration errors met during object expansion. A
    /// variable without name, type and example degrades to `{type: null}`,
    /// see [`is_degenerate`].
    pub fn describe(&self, ctx: &mut DescribeContext) -> Result<Value> {
        self.describe_node(ctx, true)
    }

    fn describe_node(&self, ctx: &mut DescribeContext, include_example: bool) -> Result<Value> {
        let (type_name, example) = self.fill_missing(ctx, include_example);
        let Some(raw_type) = type_name else {
            debug!("Nothing to describe for {:?}", self.name);
            return Ok(json!({ "type": null }));
        };

        let mut schema_type = match ctx.types.swagger_type(&raw_type) {
            Some(schema_type) => schema_type,
            None => return Ok(json!({ "type": null })),
        };
        if schema_type == "array" && is_non_empty_map(example.as_ref()) {
            schema_type = "object".to_string();
        }
        let format = ctx.types.swagger_format(&raw_type);

        let body = if schema_type == "array" {
            self.describe_array(ctx, &raw_type, example.as_ref())?
        } else if schema_type == "object" || ScalarKind::from_alias(&schema_type).is_none() {
            let class = (schema_type != "object").then(|| schema_type.clone());
            let body = self.describe_object(ctx, class.as_deref(), example.as_ref())?;
            if body.get("$ref").is_some() {
                return Ok(body);
            }
            schema_type = "object".to_string();
            body
        } else {
            Value::Object(Map::new())
        };

        let mut node = Map::new();
        node.insert("type".to_string(), json!(schema_type));
        if let Value::Object(body) = body {
            node.extend(body);
        }
        if let Some(format) = format {
            node.insert("format".to_string(), json!(format));
        }
        if let Some(description) = &self.description {
            node.insert("description".to_string(), json!(description));
        }
        if include_example {
            if let Some(example) = example.filter(|e| !is_empty_container(e)) {
                node.insert("example".to_string(), example);
            }
        }
        strip_incompatible(&mut node);
        Ok(Value::Object(node))
    }

    /// Type and example after filling in whatever can be derived.
    fn fill_missing(&self, ctx: &mut DescribeContext, include_example: bool) -> (Option<String>, Option<Value>) {
        let name = self.name.as_deref();
        match (&self.type_name, &self.example) {
            (Some(type_name), Some(example)) => (Some(type_name.clone()), Some(example.clone())),
            (None, Some(example)) => (Some(infer_type(example)), Some(example.clone())),
            (Some(type_name), None) => {
                if !include_example {
                    return (Some(type_name.clone()), None);
                }
                let normalized = ctx.types.normalize(type_name, false);
                let example = if is_basic_or_basic_array(&TypeToken::parse(&normalized)) {
                    ctx.examples.example(Some(&normalized), name, None).value
                } else {
                    None
                };
                (Some(type_name.clone()), example)
            }
            (None, None) => match name {
                Some(name) => {
                    let guessed = ctx.examples.example(None, Some(name), None);
                    (guessed.type_name, guessed.value)
                }
                None => (None, None),
            },
        }
    }

    fn describe_array(&self, ctx: &mut DescribeContext, raw_type: &str, example: Option<&Value>) -> Result<Value> {
        let normalized = ctx.types.normalize(raw_type, false);
        let items = if normalized.ends_with(ARRAY_SUFFIX) {
            let inner = ctx.types.normalize(raw_type, true);
            let element = Variable {
                name: self.name.clone(),
                type_name: Some(inner),
                example: example.and_then(Value::as_array).and_then(|list| list.first().cloned()),
                description: None,
                with: self.with.clone(),
                except: self.except.clone(),
                only: self.only.clone(),
                properties: self.properties.clone(),
                items: None,
            };
            element.describe_node(ctx, false)?
        } else if let Some(hint) = &self.items {
            Variable::new().type_name(hint).describe_node(ctx, false)?
        } else if let Some(first) = example.and_then(Value::as_array).and_then(|list| list.first()) {
            describe_value(first, None, false)
        } else {
            json!({ "type": "string" })
        };
        let items = if is_degenerate(&items) {
            json!({ "type": "string" })
        } else {
            items
        };
        Ok(json!({ "items": items }))
    }

    fn describe_object(&self, ctx: &mut DescribeContext, class: Option<&str>, example: Option<&Value>) -> Result<Value> {
        let class = class.filter(|class| ctx.classes.class_exists(class));
        let Some(class) = class else {
            let base = match example {
                Some(map) if is_non_empty_map(Some(map)) => describe_value(map, None, true),
                _ => json!({ "properties": {} }),
            };
            let mut properties = base
                .get("properties")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            self.apply_overrides(ctx, &mut properties)?;
            self.apply_except(&mut properties);
            return Ok(json!({ "properties": properties }));
        };

        // Overridden descriptions are never shared through the cache.
        if !self.properties.is_empty() {
            debug!("Expanding {} inline for its property overrides", class);
            let properties = self.expand_class(ctx, class)?;
            return Ok(Value::Object(class_body(ctx, class, properties)));
        }

        if let Some(reference) = ctx.references.get_reference(class, &self.with, &self.except, &self.only) {
            return Ok(reference);
        }
        let key = ReferenceKey::new(class, &self.with, &self.except, &self.only);
        if !ctx.references.begin(&key) {
            if ctx.references.is_enabled() {
                return Ok(key.to_ref());
            }
            warn!("Cyclic class {} described as a plain object", class);
            return Ok(json!({ "properties": {} }));
        }

        let properties = match self.expand_class(ctx, class) {
            Ok(properties) => properties,
            Err(e) => {
                ctx.references.finish(&key);
                return Err(e);
            }
        };
        ctx.references.finish(&key);

        let body = class_body(ctx, class, properties);
        let body = ctx
            .references
            .set_reference(class, Value::Object(body), &self.with, &self.except, &self.only, true);
        Ok(body)
    }

    /// Described properties of `class`, symlinks followed and every filter
    /// applied.
    fn expand_class(&self, ctx: &mut DescribeContext, class: &str) -> Result<Map<String, Value>> {
        debug!("Expanding class {}", class);
        let collected = collect_property_specs(ctx, class)?;
        let included: HashSet<&str> = top_level(&self.with).collect();
        let only: HashSet<&str> = top_level(&self.only).collect();

        let mut properties = Map::new();
        for (name, spec) in collected {
            let is_relation = spec.get("relation").and_then(Value::as_bool).unwrap_or(false);
            if is_relation && !included.contains(name.as_str()) {
                continue;
            }
            if !only.is_empty() && !only.contains(name.as_str()) {
                continue;
            }
            let mut nested = Variable::named(&name)
                .with(nested_entries(&self.with, &name))
                .except(nested_entries(&self.except, &name))
                .only(nested_entries(&self.only, &name))
                .properties(nested_properties(&self.properties, &name));
            nested.type_name = spec.get("type").and_then(Value::as_str).map(str::to_string);
            nested.example = spec.get("example").cloned();
            nested.description = spec.get("description").and_then(Value::as_str).map(str::to_string);

            let described = nested.describe(ctx)?;
            if is_degenerate(&described) {
                warn!("Property {}::{} has no type or example, skipping", class, name);
                continue;
            }
            properties.insert(name, described);
        }

        self.apply_overrides(ctx, &mut properties)?;
        self.apply_except(&mut properties);
        Ok(properties)
    }

    /// Merge explicit property fragments over the described ones.
    fn apply_overrides(&self, ctx: &mut DescribeContext, properties: &mut Map<String, Value>) -> Result<()> {
        for (name, fragment) in &self.properties {
            if name.contains('.') {
                continue;
            }
            let fragment = match fragment {
                // A bare string is shorthand for the property type.
                Value::String(type_name) => Variable::named(name).type_name(type_name).describe(ctx)?,
                other => other.clone(),
            };
            match properties.get_mut(name) {
                Some(existing) => merge_into(existing, fragment),
                None => {
                    properties.insert(name.clone(), fragment);
                }
            }
        }
        Ok(())
    }

    fn apply_except(&self, properties: &mut Map<String, Value>) {
        let excluded: HashSet<&str> = self
            .except
            .iter()
            .map(String::as_str)
            .filter(|name| !name.contains('.'))
            .collect();
        properties.retain(|name, _| !excluded.contains(name.as_str()));
    }
}

/// Property specs of a class and its symlink chain, as
/// `name -> {type, description, example, relation}` fragments.
///
/// Earlier classes win on conflicts unless a symlink asks to override.
fn collect_property_specs(ctx: &DescribeContext, class: &str) -> Result<Map<String, Value>> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut acc = Map::new();
    let mut current = class.to_string();
    let mut override_properties = false;

    loop {
        visited.insert(current.clone());
        let own = class_property_specs(ctx, &current);
        if override_properties {
            acc = match merge_with_properties_rewrite([
                json!({ "properties": acc }),
                json!({ "properties": own }),
            ]) {
                Value::Object(mut merged) => match merged.remove("properties") {
                    Some(Value::Object(properties)) => properties,
                    _ => Map::new(),
                },
                _ => Map::new(),
            };
        } else {
            for (name, spec) in own {
                if !acc.contains_key(&name) {
                    acc.insert(name, spec);
                }
            }
        }

        let symlink = ctx
            .classes
            .class_annotations(&current, Some(AnnotationKind::Symlink))
            .into_iter()
            .find_map(|annotation| match annotation {
                Annotation::Symlink(symlink) => Some(symlink),
                _ => None,
            });
        let Some(symlink) = symlink else { break };
        let target = symlink.class.trim_start_matches('\\').to_string();
        if visited.contains(&target) {
            debug!("Symlink chain of {} repeats at {}", class, target);
            break;
        }
        if !ctx.classes.class_exists(&target) {
            return Err(Error::Configuration(format!(
                "Symlink target `{}` declared on class `{}` does not exist",
                target, current
            )));
        }
        if !symlink.merge {
            acc = Map::new();
        }
        override_properties = symlink.override_properties;
        current = target;
    }

    Ok(acc)
}

/// Reflection properties of one class with property annotations applied
/// and ignored properties removed.
fn class_property_specs(ctx: &DescribeContext, class: &str) -> Map<String, Value> {
    let mut specs = Map::new();
    for property in ctx.classes.public_properties(class) {
        let mut spec = Map::new();
        insert_opt(&mut spec, "type", property.type_name.map(Value::String));
        insert_opt(&mut spec, "description", property.description.map(Value::String));
        insert_opt(&mut spec, "example", property.example);
        specs.insert(property.name, Value::Object(spec));
    }

    let mut ignored: HashSet<String> = HashSet::new();
    for annotation in ctx.classes.class_annotations(class, None) {
        match annotation {
            Annotation::Property(property) => {
                let entry = specs
                    .entry(property.name.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(spec) = entry {
                    insert_opt(spec, "type", property.type_name.map(Value::String));
                    insert_opt(spec, "description", property.description.map(Value::String));
                    insert_opt(spec, "example", property.example);
                    if property.relation {
                        spec.insert("relation".to_string(), json!(true));
                    }
                }
            }
            Annotation::IgnoredProperties { names } => ignored.extend(names),
            _ => {}
        }
    }
    specs.retain(|name, _| !ignored.contains(name));
    specs
}

fn class_body(ctx: &DescribeContext, class: &str, properties: Map<String, Value>) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("type".to_string(), json!("object"));
    if let Some(description) = class_description(ctx, class) {
        body.insert("description".to_string(), json!(description));
    }
    body.insert("properties".to_string(), Value::Object(properties));
    body
}

/// Class summary; a `description` annotation wins over the reflected one.
fn class_description(ctx: &DescribeContext, class: &str) -> Option<String> {
    ctx.classes
        .class_annotations(class, Some(AnnotationKind::Description))
        .into_iter()
        .find_map(|annotation| match annotation {
            Annotation::Description { text } => Some(text),
            _ => None,
        })
        .or_else(|| ctx.classes.class_description(class))
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}

/// First path segment of every entry.
fn top_level(entries: &[String]) -> impl Iterator<Item = &str> {
    entries
        .iter()
        .filter_map(|entry| entry.split('.').next())
        .filter(|segment| !segment.is_empty())
}

/// Entries under `prefix.`, with the prefix removed.
fn nested_entries(entries: &[String], prefix: &str) -> Vec<String> {
    entries
        .iter()
        .filter_map(|entry| entry.strip_prefix(prefix)?.strip_prefix('.'))
        .map(str::to_string)
        .collect()
}

fn nested_properties(properties: &Map<String, Value>, prefix: &str) -> Map<String, Value> {
    properties
        .iter()
        .filter_map(|(key, value)| {
            let rest = key.strip_prefix(prefix)?.strip_prefix('.')?;
            Some((rest.to_string(), value.clone()))
        })
        .collect()
}

/// Internal type token inferred from a concrete example.
///
/// A list of maps gives `object[]` even though no class backs it.
pub fn infer_type(example: &Value) -> String {
    match example {
        Value::Array(items) => match items.first() {
            Some(first) => format!("{}{}", infer_type(first), ARRAY_SUFFIX),
            None => ScalarKind::Array.as_str().to_string(),
        },
        other => value_kind(other).as_str().to_string(),
    }
}

fn is_basic_or_basic_array(token: &TypeToken) -> bool {
    match token {
        TypeToken::Scalar(kind) => kind.is_basic(),
        TypeToken::ArrayOf(inner) => is_basic_or_basic_array(inner),
        TypeToken::ClassRef(_) => false,
    }
}

fn is_non_empty_map(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Object(map)) if !map.is_empty())
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Null => true,
        _ => false,
    }
}

/// Remove keys that contradict the node's type.
fn strip_incompatible(node: &mut Map<String, Value>) {
    let schema_type = node.get("type").and_then(Value::as_str).unwrap_or_default().to_string();
    let mut forbidden: Vec<&str> = Vec::new();
    if schema_type != "array" {
        forbidden.extend(ARRAY_ONLY_KEYS);
    }
    if schema_type != "object" {
        forbidden.extend(OBJECT_ONLY_KEYS);
    }
    if schema_type != "string" {
        forbidden.extend(STRING_ONLY_KEYS);
    }
    if schema_type != "integer" && schema_type != "number" {
        forbidden.extend(NUMBER_ONLY_KEYS);
    }
    node.retain(|key, _| !forbidden.contains(&key.as_str()));
}

/// True for the `{type: null}` node produced when nothing could be
/// described; such nodes must not reach a document.
pub fn is_degenerate(node: &Value) -> bool {
    match node {
        Value::Object(map) => {
            map.get("type").map_or(true, Value::is_null)
                && !map.contains_key("$ref")
                && !map.contains_key("properties")
                && !map.contains_key("items")
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::reflection::{ClassDef, ClassRegistry};
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn registry(yaml: &str) -> ClassRegistry {
        let classes: IndexMap<String, ClassDef> = serde_yaml::from_str(yaml).unwrap();
        let mut registry = ClassRegistry::new();
        for (name, def) in classes {
            registry.insert(&name, def);
        }
        registry
    }

    fn context<'a>(registry: &'a ClassRegistry, collect_references: bool) -> DescribeContext<'a> {
        let config = GeneratorConfig {
            collect_references,
            ..GeneratorConfig::default()
        };
        DescribeContext::new(registry, &config).unwrap()
    }

    const MODELS: &str = r#"
App\Models\User:
  properties:
    id: { type: int, example: 1 }
    name: { type: string, example: Jane }
    password: { type: string }
    manager: { type: App\Models\User }
  annotations:
    - kind: description
      text: A registered user
    - kind: property
      name: posts
      type: App\Models\Post[]
      relation: true
    - kind: ignored_properties
      names: [password]
App\Models\Post:
  properties:
    title: { type: string, example: Hello }
    author: { type: App\Models\User }
App\Models\Admin:
  properties:
    level: { type: int, example: 3 }
  annotations:
    - kind: symlink
      class: App\Models\User
App\Models\Guest:
  properties:
    name: { type: string, example: Guest }
  annotations:
    - kind: symlink
      class: App\Models\Ghost
App\Models\Node:
  properties:
    next: { type: App\Models\Node }
"#;

    #[test]
    fn test_basic_type_gets_synthesized_example() {
        let registry = ClassRegistry::new();
        let mut ctx = context(&registry, true);
        let node = Variable::named("age").type_name("int").describe(&mut ctx).unwrap();
        assert_eq!(node["type"], json!("integer"));
        assert!(node["example"].as_i64().unwrap() >= 1);
    }

    #[test]
    fn test_string_array_has_string_items_and_one_element_example() {
        let registry = ClassRegistry::new();
        let mut ctx = context(&registry, true);
        let node = Variable::named("tags").type_name("string[]").describe(&mut ctx).unwrap();
        assert_eq!(node["type"], json!("array"));
        assert_eq!(node["items"], json!({"type": "string"}));
        assert_eq!(node["example"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_type_inferred_from_example() {
        let registry = ClassRegistry::new();
        let mut ctx = context(&registry, true);
        let node = Variable::named("point")
            .example(json!({"x": 1, "y": 2.5}))
            .describe(&mut ctx)
            .unwrap();
        assert_eq!(node["type"], json!("object"));
        assert_eq!(node["properties"]["x"]["type"], json!("integer"));
        assert_eq!(node["properties"]["y"]["type"], json!("number"));
        assert_eq!(node["example"], json!({"x": 1, "y": 2.5}));

        let list = Variable::named("points")
            .example(json!([{"x": 1}]))
            .describe(&mut ctx)
            .unwrap();
        assert_eq!(list["type"], json!("array"));
        assert_eq!(list["items"]["type"], json!("object"));
        assert_eq!(list["items"]["properties"]["x"]["type"], json!("integer"));
        assert!(list["items"].get("example").is_none());
    }

    #[test]
    fn test_map_example_forces_object_over_array_type() {
        let registry = ClassRegistry::new();
        let mut ctx = context(&registry, true);
        let node = Variable::named("meta")
            .type_name("array")
            .example(json!({"page": 1}))
            .describe(&mut ctx)
            .unwrap();
        assert_eq!(node["type"], json!("object"));
        assert!(node.get("items").is_none());
        assert_eq!(node["properties"]["page"]["type"], json!("integer"));
    }

    #[test]
    fn test_class_expansion_is_collected_and_referenced() {
        let registry = registry(MODELS);
        let mut ctx = context(&registry, true);
        let node = Variable::new().type_name("App\\Models\\User").describe(&mut ctx).unwrap();
        assert_eq!(node, json!({"$ref": "#/components/x-objects/App_Models_User"}));

        let body = ctx.references.body("App_Models_User").unwrap().clone();
        assert_eq!(body["description"], json!("A registered user"));
        let names: Vec<_> = body["properties"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(names, vec!["id", "name", "manager"]);
        assert_eq!(
            body["properties"]["manager"],
            json!({"$ref": "#/components/x-objects/App_Models_User"})
        );

        let again = Variable::new().type_name("\\App\\Models\\User").describe(&mut ctx).unwrap();
        assert_eq!(again, node);
        assert_eq!(ctx.references.len(), 1);
    }

    #[test]
    fn test_relations_expand_only_when_requested() {
        let registry = registry(MODELS);
        let mut ctx = context(&registry, true);
        let node = Variable::new()
            .type_name("App\\Models\\User")
            .with(vec!["posts".to_string()])
            .except(vec!["manager".to_string()])
            .describe(&mut ctx)
            .unwrap();
        assert_eq!(
            node,
            json!({"$ref": "#/components/x-objects/App_Models_User__w_posts__wo_manager"})
        );
        let body = ctx
            .references
            .body("App_Models_User__w_posts__wo_manager")
            .unwrap()
            .clone();
        assert!(body["properties"].get("manager").is_none());
        assert_eq!(body["properties"]["posts"]["type"], json!("array"));
        assert_eq!(
            body["properties"]["posts"]["items"],
            json!({"$ref": "#/components/x-objects/App_Models_Post"})
        );
    }

    #[test]
    fn test_only_and_nested_dotted_filters() {
        let registry = registry(MODELS);
        let mut ctx = context(&registry, false);
        let node = Variable::new()
            .type_name("App\\Models\\Post")
            .only(vec!["title".to_string(), "author".to_string()])
            .except(vec!["author.manager".to_string()])
            .describe(&mut ctx)
            .unwrap();
        let author = &node["properties"]["author"];
        assert_eq!(author["type"], json!("object"));
        assert!(author["properties"].get("manager").is_none());
        assert_eq!(author["properties"]["name"]["example"], json!("Jane"));
    }

    #[test]
    fn test_property_overrides_win() {
        let registry = registry(MODELS);
        let mut ctx = context(&registry, false);
        let mut overrides = Map::new();
        overrides.insert("id".to_string(), json!({"description": "Primary key"}));
        overrides.insert("score".to_string(), json!("float"));
        overrides.insert("manager.id".to_string(), json!({"example": 99}));
        let node = Variable::new()
            .type_name("App\\Models\\User")
            .properties(overrides)
            .describe(&mut ctx)
            .unwrap();
        assert_eq!(
            node["properties"]["id"],
            json!({"type": "integer", "example": 1, "description": "Primary key"})
        );
        assert_eq!(node["properties"]["score"]["type"], json!("number"));
    }

    #[test]
    fn test_symlink_merges_target_properties() {
        let registry = registry(MODELS);
        let mut ctx = context(&registry, true);
        Variable::new().type_name("App\\Models\\Admin").describe(&mut ctx).unwrap();
        let body = ctx.references.body("App_Models_Admin").unwrap().clone();
        let names: Vec<_> = body["properties"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(names, vec!["level", "id", "name", "manager"]);
    }

    #[test]
    fn test_symlink_to_missing_class_is_configuration_error() {
        let registry = registry(MODELS);
        let mut ctx = context(&registry, true);
        let err = Variable::new()
            .type_name("App\\Models\\Guest")
            .describe(&mut ctx)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("App\\Models\\Ghost"));
    }

    #[test]
    fn test_self_reference_terminates() {
        let registry = registry(MODELS);
        let mut ctx = context(&registry, true);
        let node = Variable::new().type_name("App\\Models\\Node").describe(&mut ctx).unwrap();
        assert_eq!(node, json!({"$ref": "#/components/x-objects/App_Models_Node"}));

        let mut inline = context(&registry, false);
        let node = Variable::new().type_name("App\\Models\\Node").describe(&mut inline).unwrap();
        assert_eq!(node["properties"]["next"], json!({"type": "object", "properties": {}}));
    }

    #[test]
    fn test_unknown_class_degrades_to_empty_properties() {
        let registry = ClassRegistry::new();
        let mut ctx = context(&registry, true);
        let node = Variable::new().type_name("App\\Missing").describe(&mut ctx).unwrap();
        assert_eq!(node, json!({"type": "object", "properties": {}}));
    }

    #[test]
    fn test_empty_variable_is_degenerate() {
        let registry = ClassRegistry::new();
        let mut ctx = context(&registry, true);
        let node = Variable::new().describe(&mut ctx).unwrap();
        assert!(is_degenerate(&node));
        assert!(!is_degenerate(&json!({"type": "string"})));
        assert!(!is_degenerate(&json!({"$ref": "#/components/x-objects/User"})));
    }

    #[test]
    fn test_date_alias_keeps_format() {
        let registry = ClassRegistry::new();
        let mut ctx = context(&registry, true);
        let node = Variable::named("created_at").type_name("\\DateTime").describe(&mut ctx).unwrap();
        assert_eq!(node["type"], json!("string"));
        assert_eq!(node["format"], json!("date-time"));
    }

    #[test]
    fn test_typed_getters_report_unset_attributes() {
        let variable = Variable::named("user");
        assert_eq!(variable.get_name().unwrap(), "user");
        let err = variable.get_type().unwrap_err();
        assert_eq!(err.to_string(), "Attribute `type` is not set on variable `user`");
        assert!(variable.get_example().is_err());
        assert!(variable.get_description().is_err());
    }

    #[test]
    fn test_infer_type() {
        assert_eq!(infer_type(&json!([[1]])), "integer[][]");
        assert_eq!(infer_type(&json!([])), "array");
        assert_eq!(infer_type(&json!(true)), "boolean");
        assert_eq!(infer_type(&json!([1.5])), "number[]");
        assert_eq!(infer_type(&json!({"a": 1})), "object");
    }

    const LINKED: &str = r#"
App\Models\Profile:
  description: Public profile
  properties:
    id: { type: int, example: 1 }
    name: { type: string, example: Profile }
App\Models\Account:
  properties:
    name: { type: string, example: Account }
    balance: { type: int, example: 10 }
  annotations:
    - kind: symlink
      class: App\Models\Profile
      override: true
App\Models\Badge:
  properties:
    level: { type: int, example: 3 }
  annotations:
    - kind: symlink
      class: App\Models\Profile
      merge: false
App\Models\Team:
  description: Reflected summary
  annotations:
    - kind: description
      text: Annotated summary
"#;

    fn property_names(body: &Value) -> Vec<String> {
        body["properties"].as_object().unwrap().keys().cloned().collect()
    }

    #[test]
    fn test_reflected_class_description_is_used() {
        let registry = registry(LINKED);
        let mut ctx = context(&registry, true);
        Variable::new().type_name("App\\Models\\Profile").describe(&mut ctx).unwrap();
        let body = ctx.references.body("App_Models_Profile").unwrap();
        assert_eq!(body["description"], json!("Public profile"));

        Variable::new().type_name("App\\Models\\Team").describe(&mut ctx).unwrap();
        let body = ctx.references.body("App_Models_Team").unwrap();
        assert_eq!(body["description"], json!("Annotated summary"));
    }

    #[test]
    fn test_symlink_override_lets_target_properties_win() {
        let registry = registry(LINKED);
        let mut ctx = context(&registry, true);
        Variable::new().type_name("App\\Models\\Account").describe(&mut ctx).unwrap();
        let body = ctx.references.body("App_Models_Account").unwrap().clone();
        assert_eq!(property_names(&body), vec!["name", "balance", "id"]);
        assert_eq!(body["properties"]["name"]["example"], json!("Profile"));
    }

    #[test]
    fn test_symlink_without_merge_keeps_only_target_properties() {
        let registry = registry(LINKED);
        let mut ctx = context(&registry, true);
        Variable::new().type_name("App\\Models\\Badge").describe(&mut ctx).unwrap();
        let body = ctx.references.body("App_Models_Badge").unwrap().clone();
        assert_eq!(property_names(&body), vec!["id", "name"]);
        assert_eq!(body["properties"]["name"]["example"], json!("Profile"));
    }

    #[test]
    fn test_overridden_description_does_not_leak_into_collected_body() {
        let registry = registry(MODELS);
        let mut ctx = context(&registry, true);
        let mut overrides = Map::new();
        overrides.insert("id".to_string(), json!({"description": "Only for this response"}));

        let overridden = Variable::new()
            .type_name("App\\Models\\User")
            .properties(overrides)
            .describe(&mut ctx)
            .unwrap();
        assert!(overridden.get("$ref").is_none());
        assert_eq!(overridden["type"], json!("object"));
        assert_eq!(
            overridden["properties"]["id"]["description"],
            json!("Only for this response")
        );

        let plain = Variable::new().type_name("App\\Models\\User").describe(&mut ctx).unwrap();
        assert_eq!(plain, json!({"$ref": "#/components/x-objects/App_Models_User"}));
        let body = ctx.references.body("App_Models_User").unwrap();
        assert!(body["properties"]["id"].get("description").is_none());
    }

    #[test]
    fn test_override_applies_after_class_was_collected() {
        let registry = registry(MODELS);
        let mut ctx = context(&registry, true);
        Variable::new().type_name("App\\Models\\User").describe(&mut ctx).unwrap();

        let mut overrides = Map::new();
        overrides.insert("extra".to_string(), json!("string"));
        let overridden = Variable::new()
            .type_name("App\\Models\\User")
            .properties(overrides)
            .describe(&mut ctx)
            .unwrap();
        assert_eq!(overridden["properties"]["extra"]["type"], json!("string"));
        assert_eq!(
            overridden["properties"]["manager"],
            json!({"$ref": "#/components/x-objects/App_Models_User"})
        );

        let body = ctx.references.body("App_Models_User").unwrap();
        assert!(body["properties"].get("extra").is_none());
        assert_eq!(ctx.references.len(), 1);
    }
}

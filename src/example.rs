//! Deterministic example values for documented fields.
//!
//! Examples come from a validation rule (`email`, `uuid`, ...), from a rule
//! guessed out of the field name, or from the field's scalar type. Every
//! source owns a fixed sequence of ten plausible values served round-robin,
//! and resolved values are cached per field so the same field shows the same
//! example everywhere in one document.

use crate::error::{Error, Result};
use crate::rule_token::{RuleKind, RuleToken};
use crate::type_normalizer::ScalarKind;
use indexmap::IndexMap;
use log::debug;
use serde_json::{json, Value};
use std::collections::HashMap;

const SEQUENCE_LENGTH: usize = 10;

/// Suffixes that mark a variant of another field (`password_confirm`).
const NAME_SUFFIXES: [&str; 6] = [
    "_confirmation",
    "_confirm",
    "_original",
    "_example",
    "_new",
    "_old",
];

const BUILTIN_NAMES: &[(&str, &str)] = &[
    ("email", "email"),
    ("phone", "phone"),
    ("phone_number", "phone"),
    ("mobile", "phone"),
    ("name", "name"),
    ("full_name", "name"),
    ("first_name", "first_name"),
    ("firstname", "first_name"),
    ("last_name", "last_name"),
    ("lastname", "last_name"),
    ("password", "password"),
    ("url", "url"),
    ("link", "url"),
    ("website", "url"),
    ("avatar", "url"),
    ("uuid", "uuid"),
    ("guid", "uuid"),
    ("ip", "ip"),
    ("ip_address", "ip"),
    ("created_at", "date_time"),
    ("updated_at", "date_time"),
    ("deleted_at", "date_time"),
    ("published_at", "date_time"),
    ("date", "date"),
    ("birthday", "date"),
    ("birth_date", "date"),
    ("time", "time"),
    ("title", "title"),
    ("description", "text"),
    ("body", "text"),
    ("content", "text"),
    ("comment", "text"),
    ("slug", "slug"),
    ("id", "integer"),
    ("page", "integer"),
    ("per_page", "integer"),
    ("limit", "integer"),
    ("offset", "integer"),
    ("count", "integer"),
    ("total", "integer"),
    ("age", "integer"),
    ("quantity", "integer"),
    ("price", "numeric"),
    ("amount", "numeric"),
    ("active", "boolean"),
    ("is_active", "boolean"),
    ("enabled", "boolean"),
];

/// Field name to example rule lookup.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    rules: HashMap<String, RuleKind>,
}

impl NameRegistry {
    /// Build the registry from the built-in names plus `extra`.
    ///
    /// A name registered for two rules whose examples have different types
    /// is a configuration error.
    pub fn build(extra: &IndexMap<String, String>) -> Result<Self> {
        let mut registry = NameRegistry::default();
        let builtin = BUILTIN_NAMES.iter().map(|(name, rule)| (*name, *rule));
        let configured = extra.iter().map(|(name, rule)| (name.as_str(), rule.as_str()));
        for (name, rule) in builtin.chain(configured) {
            registry.register(name, RuleKind::from_name(rule))?;
        }
        Ok(registry)
    }

    fn register(&mut self, name: &str, kind: RuleKind) -> Result<()> {
        if let Some(existing) = self.rules.get(name) {
            if existing.scalar_kind() != kind.scalar_kind() {
                return Err(Error::Configuration(format!(
                    "example name `{}` is registered for rule `{}` and conflicting rule `{}`",
                    name,
                    existing.name(),
                    kind.name()
                )));
            }
        }
        self.rules.insert(name.to_string(), kind);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&RuleKind> {
        self.rules.get(name)
    }
}

/// Outcome of an example lookup: the value, if any, and the type it was
/// resolved for.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub value: Option<Value>,
    pub type_name: Option<String>,
}

#[derive(Debug)]
struct Rotation {
    values: Vec<Value>,
    cursor: usize,
}

impl Rotation {
    fn next(&mut self) -> Option<Value> {
        if self.values.is_empty() {
            return None;
        }
        let value = self.values[self.cursor % self.values.len()].clone();
        self.cursor = (self.cursor + 1) % self.values.len();
        Some(value)
    }
}

pub struct ExampleProvider {
    names: NameRegistry,
    sequences: HashMap<String, Rotation>,
    cache: HashMap<String, Value>,
}

impl ExampleProvider {
    pub fn new(names: NameRegistry) -> Self {
        Self {
            names,
            sequences: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    /// Resolve an example for a field.
    ///
    /// `type_name` is a normalized type (`string`, `integer[]`, ...). When it
    /// is missing the type follows from `rule`, and when the rule is missing
    /// it is guessed from `name`.
    pub fn example(&mut self, type_name: Option<&str>, name: Option<&str>, rule: Option<&RuleToken>) -> Example {
        let stripped = name.map(strip_name_suffix).filter(|n| !n.is_empty());
        let named_rule = stripped.and_then(|n| self.names.lookup(n)).cloned();

        let mut rule = match rule {
            Some(rule) => Some(rule.clone()),
            None => named_rule.clone().map(RuleToken::new),
        };
        // A bare type rule gives way to the field's semantic rule of the same type.
        if let (Some(current), Some(named)) = (&rule, &named_rule) {
            if current.kind.is_plain_type() && current.kind.scalar_kind() == named.scalar_kind() {
                rule = Some(RuleToken::new(named.clone()));
            }
        }

        let type_name = match type_name {
            Some(t) => Some(canonical_type(t)),
            None => rule.as_ref().and_then(rule_type),
        };

        if let Some(inner) = type_name.as_deref().and_then(|t| t.strip_suffix("[]")) {
            let inner = self.example(Some(inner), name, rule.as_ref());
            return Example {
                value: inner.value.map(|value| json!([value])),
                type_name,
            };
        }

        let key = stripped.map(|n| format!("{}|{}", n, type_name.as_deref().unwrap_or("")));
        if let Some(cached) = key.as_ref().and_then(|k| self.cache.get(k)) {
            return Example {
                value: Some(cached.clone()),
                type_name,
            };
        }

        let requested_kind = type_name.as_deref().and_then(ScalarKind::from_alias);
        let value = rule
            .as_ref()
            .filter(|r| requested_kind.is_none() || rule_kind_matches(r, requested_kind))
            .and_then(|r| self.rule_example(r))
            .or_else(|| requested_kind.and_then(|kind| self.type_example(kind)));

        if let (Some(key), Some(value)) = (key, value.as_ref()) {
            if !value.is_null() {
                debug!("Caching example for {}", key);
                self.cache.insert(key, value.clone());
            }
        }

        Example { value, type_name }
    }

    /// Next value of the rotating sequence generated for `rule`.
    pub fn rule_example(&mut self, rule: &RuleToken) -> Option<Value> {
        if rule.kind == RuleKind::In {
            return in_example(&rule.params);
        }
        let values = rule_sequence(&rule.kind)?;
        self.next_in_sequence(&format!("rule:{}", rule.kind.name()), values)
    }

    /// Next value of the rotating sequence generated for a scalar kind.
    pub fn type_example(&mut self, kind: ScalarKind) -> Option<Value> {
        let values = type_sequence(kind)?;
        self.next_in_sequence(&format!("type:{}", kind.as_str()), values)
    }

    fn next_in_sequence(&mut self, key: &str, values: Vec<Value>) -> Option<Value> {
        self.sequences
            .entry(key.to_string())
            .or_insert_with(|| Rotation { values, cursor: 0 })
            .next()
    }

    /// Forget the per-run field cache.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Forget cached fields and restart every sequence.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.sequences.clear();
    }
}

/// Remove one variant suffix from a field name.
pub fn strip_name_suffix(name: &str) -> &str {
    NAME_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or(name)
}

fn canonical_type(type_name: &str) -> String {
    let trimmed = type_name.trim();
    let base = trimmed.trim_end_matches("[]");
    let suffix = &trimmed[base.len()..];
    match ScalarKind::from_alias(&base.to_ascii_lowercase()) {
        Some(kind) => format!("{}{}", kind.as_str(), suffix),
        None => trimmed.to_string(),
    }
}

fn rule_type(rule: &RuleToken) -> Option<String> {
    if rule.kind == RuleKind::In {
        return in_example(&rule.params).map(|value| value_kind(&value).as_str().to_string());
    }
    rule.kind.scalar_kind().map(|kind| kind.as_str().to_string())
}

fn rule_kind_matches(rule: &RuleToken, requested: Option<ScalarKind>) -> bool {
    match rule.kind {
        RuleKind::In => true,
        _ => rule.kind.scalar_kind() == requested,
    }
}

/// Kind of a concrete example value.
pub fn value_kind(value: &Value) -> ScalarKind {
    match value {
        Value::Null => ScalarKind::Null,
        Value::Bool(_) => ScalarKind::Boolean,
        Value::Number(n) if n.is_i64() || n.is_u64() => ScalarKind::Integer,
        Value::Number(_) => ScalarKind::Number,
        Value::String(_) => ScalarKind::String,
        Value::Array(_) => ScalarKind::Array,
        Value::Object(_) => ScalarKind::Object,
    }
}

/// First allowed value, as a number when every option is numeric.
fn in_example(params: &[String]) -> Option<Value> {
    let first = params.iter().find(|p| !p.trim().is_empty())?;
    if let Ok(n) = first.parse::<i64>() {
        return Some(json!(n));
    }
    Some(json!(first))
}

fn sequence<F>(make: F) -> Vec<Value>
where
    F: Fn(usize) -> Value,
{
    (0..SEQUENCE_LENGTH).map(make).collect()
}

fn pick(pool: &'static [&'static str]) -> Vec<Value> {
    sequence(|i| json!(pool[i % pool.len()]))
}

const FIRST_NAMES: &[&str] = &[
    "John", "Jane", "Alice", "Bob", "Carol", "David", "Emma", "Frank", "Grace", "Henry",
];
const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Miller", "Davis", "Wilson", "Moore", "Taylor",
];
const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "tempor",
];
const TITLES: &[&str] = &[
    "Getting started",
    "Release notes",
    "Weekly report",
    "Project kickoff",
    "Quarterly review",
    "Team update",
    "Product launch",
    "Design proposal",
    "Meeting summary",
    "Roadmap draft",
];
const SENTENCES: &[&str] = &[
    "Lorem ipsum dolor sit amet, consectetur adipiscing elit.",
    "Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.",
    "Ut enim ad minim veniam, quis nostrud exercitation ullamco.",
    "Duis aute irure dolor in reprehenderit in voluptate velit esse.",
    "Excepteur sint occaecat cupidatat non proident.",
    "Sunt in culpa qui officia deserunt mollit anim id est laborum.",
    "Curabitur pretium tincidunt lacus, nulla gravida orci.",
    "Nam vel justo eu erat faucibus tincidunt.",
    "Integer posuere erat a ante venenatis dapibus.",
    "Vestibulum id ligula porta felis euismod semper.",
];

fn rule_sequence(kind: &RuleKind) -> Option<Vec<Value>> {
    let values = match kind {
        RuleKind::Email => sequence(|i| {
            json!(format!(
                "{}.{}@example.com",
                FIRST_NAMES[i].to_lowercase(),
                LAST_NAMES[i].to_lowercase()
            ))
        }),
        RuleKind::Url => sequence(|i| json!(format!("https://example.com/{}", WORDS[i]))),
        RuleKind::Uuid => sequence(|i| {
            json!(format!(
                "{:08x}-{:04x}-4{:03x}-a{:03x}-{:012x}",
                0x5f3a_1c00 + i * 0x1111,
                0x1a2b + i,
                0x100 + i * 7,
                0x200 + i * 11,
                0x1234_5678_9abc_usize + i * 0x1_0001
            ))
        }),
        RuleKind::Ip => sequence(|i| json!(format!("192.168.0.{}", 10 + i))),
        RuleKind::Date => sequence(|i| json!(format!("2024-01-{:02}", 10 + i))),
        RuleKind::DateTime => sequence(|i| json!(format!("2024-01-{:02}T09:{:02}:00Z", 10 + i, i * 5))),
        RuleKind::Time => sequence(|i| json!(format!("{:02}:{:02}:00", 8 + i, (i * 15) % 60))),
        RuleKind::Json => sequence(|i| json!(format!("{{\"key\":\"{}\"}}", WORDS[i]))),
        RuleKind::Alpha => pick(WORDS),
        RuleKind::AlphaNum => sequence(|i| json!(format!("{}{}", WORDS[i], 100 + i))),
        RuleKind::Phone => sequence(|i| json!(format!("+1-202-555-01{:02}", 10 + i))),
        RuleKind::Name => sequence(|i| json!(format!("{} {}", FIRST_NAMES[i], LAST_NAMES[i]))),
        RuleKind::FirstName => pick(FIRST_NAMES),
        RuleKind::LastName => pick(LAST_NAMES),
        RuleKind::Password => sequence(|i| json!(format!("Secret#{}{}", WORDS[i], 2024 + i))),
        RuleKind::Title => pick(TITLES),
        RuleKind::Text => pick(SENTENCES),
        RuleKind::Slug => sequence(|i| json!(TITLES[i].to_lowercase().replace(' ', "-"))),
        RuleKind::String => return type_sequence(ScalarKind::String),
        RuleKind::Integer => return type_sequence(ScalarKind::Integer),
        RuleKind::Numeric => return type_sequence(ScalarKind::Number),
        RuleKind::Boolean => return type_sequence(ScalarKind::Boolean),
        RuleKind::Array => sequence(|i| json!([WORDS[i]])),
        RuleKind::Required
        | RuleKind::Nullable
        | RuleKind::Min
        | RuleKind::Max
        | RuleKind::Between
        | RuleKind::Size
        | RuleKind::In
        | RuleKind::Other(_) => return None,
    };
    Some(values)
}

fn type_sequence(kind: ScalarKind) -> Option<Vec<Value>> {
    const INTEGERS: [i64; SEQUENCE_LENGTH] = [1, 5, 10, 12, 25, 42, 50, 73, 100, 128];
    const NUMBERS: [f64; SEQUENCE_LENGTH] = [1.5, 2.75, 3.14, 9.99, 12.5, 19.95, 25.0, 42.42, 99.9, 100.25];
    let values = match kind {
        ScalarKind::String => pick(WORDS),
        ScalarKind::Integer => sequence(|i| json!(INTEGERS[i])),
        ScalarKind::Number => sequence(|i| json!(NUMBERS[i])),
        ScalarKind::Boolean => sequence(|i| json!(i % 2 == 0)),
        ScalarKind::Null | ScalarKind::Array | ScalarKind::Object => return None,
    };
    Some(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> ExampleProvider {
        ExampleProvider::new(NameRegistry::build(&IndexMap::new()).unwrap())
    }

    #[test]
    fn test_same_field_gets_same_example() {
        let mut examples = provider();
        let first = examples.example(Some("string"), Some("nickname"), None);
        let second = examples.example(Some("string"), Some("nickname"), None);
        assert!(first.value.is_some());
        assert_eq!(first, second);

        let other = examples.example(Some("string"), Some("city"), None);
        assert_ne!(other.value, first.value);
    }

    #[test]
    fn test_confirm_suffix_shares_cache_identity() {
        let mut examples = provider();
        let password = examples.example(None, Some("password"), None);
        let confirm = examples.example(None, Some("password_confirm"), None);
        assert_eq!(password.value, confirm.value);
        assert_eq!(confirm.type_name.as_deref(), Some("string"));
    }

    #[test]
    fn test_type_is_inferred_from_rule_and_name() {
        let mut examples = provider();
        let by_rule = examples.example(None, None, RuleToken::parse("email").as_ref());
        assert_eq!(by_rule.type_name.as_deref(), Some("string"));
        assert_eq!(by_rule.value, Some(json!("john.smith@example.com")));

        let by_name = examples.example(None, Some("age"), None);
        assert_eq!(by_name.type_name.as_deref(), Some("integer"));
        assert!(by_name.value.unwrap().as_i64().unwrap() >= 1);
    }

    #[test]
    fn test_plain_type_rule_yields_to_semantic_name() {
        let mut examples = provider();
        let example = examples.example(None, Some("email"), RuleToken::parse("string").as_ref());
        let value = example.value.unwrap();
        assert!(value.as_str().unwrap().contains('@'));
    }

    #[test]
    fn test_array_type_wraps_single_element() {
        let mut examples = provider();
        let example = examples.example(Some("string[]"), Some("tags"), None);
        assert_eq!(example.type_name.as_deref(), Some("string[]"));
        let list = example.value.unwrap();
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert!(list[0].is_string());
    }

    #[test]
    fn test_in_rule_uses_first_option() {
        let mut examples = provider();
        let status = examples.example(None, Some("status"), RuleToken::parse("in:draft,published").as_ref());
        assert_eq!(status.value, Some(json!("draft")));
        assert_eq!(status.type_name.as_deref(), Some("string"));

        let level = examples.example(None, Some("level"), RuleToken::parse("in:1,2,3").as_ref());
        assert_eq!(level.value, Some(json!(1)));
        assert_eq!(level.type_name.as_deref(), Some("integer"));
    }

    #[test]
    fn test_unresolvable_example_is_none() {
        let mut examples = provider();
        let example = examples.example(None, Some("mystery"), None);
        assert_eq!(example.value, None);
        let example = examples.example(Some("object"), Some("payload"), None);
        assert_eq!(example.value, None);
        let example = examples.example(None, None, RuleToken::parse("required").as_ref());
        assert_eq!(example.value, None);
    }

    #[test]
    fn test_sequences_rotate_and_wrap() {
        let mut examples = provider();
        let values: Vec<_> = (0..SEQUENCE_LENGTH + 1)
            .map(|_| examples.type_example(ScalarKind::Integer).unwrap())
            .collect();
        assert_ne!(values[0], values[1]);
        assert_eq!(values[0], values[SEQUENCE_LENGTH]);
    }

    #[test]
    fn test_reset_restarts_sequences_and_forgets_fields() {
        let mut examples = provider();
        let first = examples.example(Some("string"), Some("nickname"), None);
        examples.example(Some("string"), Some("city"), None);
        examples.reset();
        let again = examples.example(Some("string"), Some("city"), None);
        assert_eq!(again.value, first.value);
    }

    #[test]
    fn test_conflicting_name_registration_is_a_configuration_error() {
        let mut extra = IndexMap::new();
        extra.insert("email".to_string(), "integer".to_string());
        let err = NameRegistry::build(&extra).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("email"));

        let mut compatible = IndexMap::new();
        compatible.insert("email".to_string(), "url".to_string());
        compatible.insert("sku".to_string(), "alpha_num".to_string());
        let registry = NameRegistry::build(&compatible).unwrap();
        assert_eq!(registry.lookup("email"), Some(&RuleKind::Url));
        assert_eq!(registry.lookup("sku"), Some(&RuleKind::AlphaNum));
    }

    #[test]
    fn test_strip_name_suffix() {
        assert_eq!(strip_name_suffix("password_confirm"), "password");
        assert_eq!(strip_name_suffix("password_confirmation"), "password");
        assert_eq!(strip_name_suffix("email_old"), "email");
        assert_eq!(strip_name_suffix("email"), "email");
    }
}

use crate::config::ClassAlias;
use crate::reflection::{canonical_class_name, ClassSource};
use indexmap::IndexMap;
use log::debug;
use std::collections::HashMap;
use std::fmt;

const ARRAY_SUFFIX: &str = "[]";

/// Basic schema kinds a type token can normalize to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    Array,
    Object,
}

impl ScalarKind {
    /// Map a (lower-case) type name or alias to its kind.
    pub fn from_alias(name: &str) -> Option<ScalarKind> {
        match name {
            "string" | "str" | "mixed" => Some(ScalarKind::String),
            "int" | "integer" | "long" => Some(ScalarKind::Integer),
            "float" | "double" | "number" | "decimal" => Some(ScalarKind::Number),
            "bool" | "boolean" | "true" | "false" => Some(ScalarKind::Boolean),
            "null" | "void" => Some(ScalarKind::Null),
            "array" | "iterable" => Some(ScalarKind::Array),
            "object" | "stdclass" => Some(ScalarKind::Object),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Number => "number",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Null => "null",
            ScalarKind::Array => "array",
            ScalarKind::Object => "object",
        }
    }

    /// Kinds that carry a literal value (everything but containers and null).
    pub fn is_basic(&self) -> bool {
        matches!(
            self,
            ScalarKind::String | ScalarKind::Integer | ScalarKind::Number | ScalarKind::Boolean
        )
    }
}

/// A normalized type identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeToken {
    Scalar(ScalarKind),
    ArrayOf(Box<TypeToken>),
    ClassRef(String),
}

impl TypeToken {
    /// Interpret an already normalized type string.
    pub fn parse(normalized: &str) -> TypeToken {
        if let Some(inner) = normalized.strip_suffix(ARRAY_SUFFIX) {
            return TypeToken::ArrayOf(Box::new(TypeToken::parse(inner)));
        }
        match ScalarKind::from_alias(normalized) {
            Some(kind) => TypeToken::Scalar(kind),
            None => TypeToken::ClassRef(normalized.to_string()),
        }
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeToken::Scalar(kind) => write!(f, "{}", kind.as_str()),
            TypeToken::ArrayOf(inner) => write!(f, "{}{}", inner, ARRAY_SUFFIX),
            TypeToken::ClassRef(name) => write!(f, "{}", name),
        }
    }
}

/// Canonicalizes raw type names (`?int`, `string|null`, `\App\User[]`, ...)
/// and maps them to schema types.
///
/// Results are memoized per raw token. Class knowledge comes from the
/// registry and the configured class aliases, both immutable for the run.
pub struct TypeNormalizer<'a> {
    classes: &'a dyn ClassSource,
    aliases: IndexMap<String, ClassAlias>,
    normalized: HashMap<(String, bool), String>,
    class_checks: HashMap<String, bool>,
}

impl<'a> TypeNormalizer<'a> {
    pub fn new(classes: &'a dyn ClassSource, aliases: IndexMap<String, ClassAlias>) -> Self {
        Self {
            classes,
            aliases,
            normalized: HashMap::new(),
            class_checks: HashMap::new(),
        }
    }

    /// Normalize a raw type token.
    ///
    /// Only the first alternative of a union is kept. With `strip_array` one
    /// level of `[]` is removed.
    pub fn normalize(&mut self, raw: &str, strip_array: bool) -> String {
        let key = (raw.to_string(), strip_array);
        if let Some(cached) = self.normalized.get(&key) {
            return cached.clone();
        }

        let mut token = raw.trim();
        if let Some((first, _)) = token.split_once('|') {
            token = first.trim();
        }
        let token = token.trim_start_matches('?');

        let mut base = token;
        let mut depth = 0;
        while let Some(inner) = base.strip_suffix(ARRAY_SUFFIX) {
            base = inner;
            depth += 1;
        }
        if strip_array && depth > 0 {
            depth -= 1;
        }

        let mut normalized = self.normalize_base(base.trim());
        for _ in 0..depth {
            normalized.push_str(ARRAY_SUFFIX);
        }

        debug!("Normalized type `{}` to `{}`", raw, normalized);
        self.normalized.insert(key, normalized.clone());
        normalized
    }

    fn normalize_base(&mut self, base: &str) -> String {
        if let Some(kind) = ScalarKind::from_alias(&base.to_ascii_lowercase()) {
            return kind.as_str().to_string();
        }
        let trimmed = canonical_class_name(base);
        if self.is_known_class(trimmed) {
            trimmed.to_string()
        } else {
            trimmed.to_lowercase()
        }
    }

    fn is_known_class(&self, name: &str) -> bool {
        !name.is_empty() && (self.aliases.contains_key(name) || self.classes.class_exists(name))
    }

    /// True when the normalized token ends with the array suffix.
    pub fn is_type_array(&mut self, raw: &str) -> bool {
        self.normalize(raw, false).ends_with(ARRAY_SUFFIX)
    }

    /// True when the token, array suffixes removed, names a known class or
    /// interface rather than a scalar kind.
    pub fn is_type_class_name(&mut self, raw: &str) -> bool {
        if let Some(cached) = self.class_checks.get(raw) {
            return *cached;
        }
        let normalized = self.normalize(raw, false);
        let base = normalized.trim_end_matches(ARRAY_SUFFIX);
        let is_class = ScalarKind::from_alias(base).is_none() && self.is_known_class(base);
        self.class_checks.insert(raw.to_string(), is_class);
        is_class
    }

    /// Schema type for a raw type token.
    ///
    /// Arrays map to `array`, scalars to their kind, aliased classes to the
    /// alias type. Any other class is returned unchanged, which callers take
    /// as "expand as object".
    pub fn swagger_type(&mut self, raw: &str) -> Option<String> {
        let normalized = self.normalize(raw, false);
        if normalized.is_empty() {
            return None;
        }
        if normalized.ends_with(ARRAY_SUFFIX) {
            return Some(ScalarKind::Array.as_str().to_string());
        }
        if let Some(kind) = ScalarKind::from_alias(&normalized) {
            return Some(kind.as_str().to_string());
        }
        if let Some(alias) = self.aliases.get(&normalized) {
            return Some(alias.schema_type.clone());
        }
        Some(normalized)
    }

    /// Format registered for an aliased class.
    pub fn swagger_format(&mut self, raw: &str) -> Option<String> {
        let normalized = self.normalize(raw, false);
        self.aliases.get(&normalized).and_then(|alias| alias.format.clone())
    }

    /// Parsed form of [`TypeNormalizer::normalize`].
    pub fn token(&mut self, raw: &str) -> TypeToken {
        TypeToken::parse(&self.normalize(raw, false))
    }
}

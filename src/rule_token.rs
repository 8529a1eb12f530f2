//! Validation rule tokens such as `required`, `max:255` or `in:draft,published`.

use crate::type_normalizer::ScalarKind;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// Rules of a single field as written by the application: either a
/// pipe-separated string (`"required|string|max:255"`) or a list of tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRules {
    Piped(String),
    List(Vec<String>),
}

impl RawRules {
    pub fn tokens(&self) -> Vec<RuleToken> {
        match self {
            RawRules::Piped(rules) => rules.split('|').filter_map(RuleToken::parse).collect(),
            RawRules::List(rules) => rules.iter().filter_map(|rule| RuleToken::parse(rule)).collect(),
        }
    }
}

impl From<&str> for RawRules {
    fn from(rules: &str) -> Self {
        RawRules::Piped(rules.to_string())
    }
}

impl From<Vec<&str>> for RawRules {
    fn from(rules: Vec<&str>) -> Self {
        RawRules::List(rules.into_iter().map(str::to_string).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleKind {
    // constraints
    Required,
    Nullable,
    Min,
    Max,
    Between,
    Size,
    In,
    // plain types
    String,
    Integer,
    Numeric,
    Boolean,
    Array,
    // semantic formats
    Email,
    Url,
    Uuid,
    Ip,
    Date,
    DateTime,
    Time,
    Json,
    Alpha,
    AlphaNum,
    Phone,
    Name,
    FirstName,
    LastName,
    Password,
    Title,
    Text,
    Slug,
    /// A rule with no documentation meaning, kept for diagnostics.
    Other(String),
}

impl RuleKind {
    pub fn from_name(name: &str) -> RuleKind {
        match name.trim().to_ascii_lowercase().as_str() {
            "required" => RuleKind::Required,
            "nullable" => RuleKind::Nullable,
            "min" => RuleKind::Min,
            "max" => RuleKind::Max,
            "between" => RuleKind::Between,
            "size" => RuleKind::Size,
            "in" => RuleKind::In,
            "string" => RuleKind::String,
            "int" | "integer" => RuleKind::Integer,
            "numeric" | "decimal" | "float" => RuleKind::Numeric,
            "bool" | "boolean" => RuleKind::Boolean,
            "array" | "list" => RuleKind::Array,
            "email" => RuleKind::Email,
            "url" | "active_url" => RuleKind::Url,
            "uuid" => RuleKind::Uuid,
            "ip" | "ipv4" | "ipv6" => RuleKind::Ip,
            "date" | "date_format" => RuleKind::Date,
            "date_time" | "datetime" => RuleKind::DateTime,
            "time" => RuleKind::Time,
            "json" => RuleKind::Json,
            "alpha" => RuleKind::Alpha,
            "alpha_num" | "alpha_dash" => RuleKind::AlphaNum,
            "phone" => RuleKind::Phone,
            "name" => RuleKind::Name,
            "first_name" => RuleKind::FirstName,
            "last_name" => RuleKind::LastName,
            "password" => RuleKind::Password,
            "title" => RuleKind::Title,
            "text" => RuleKind::Text,
            "slug" => RuleKind::Slug,
            other => RuleKind::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RuleKind::Required => "required",
            RuleKind::Nullable => "nullable",
            RuleKind::Min => "min",
            RuleKind::Max => "max",
            RuleKind::Between => "between",
            RuleKind::Size => "size",
            RuleKind::In => "in",
            RuleKind::String => "string",
            RuleKind::Integer => "integer",
            RuleKind::Numeric => "numeric",
            RuleKind::Boolean => "boolean",
            RuleKind::Array => "array",
            RuleKind::Email => "email",
            RuleKind::Url => "url",
            RuleKind::Uuid => "uuid",
            RuleKind::Ip => "ip",
            RuleKind::Date => "date",
            RuleKind::DateTime => "date_time",
            RuleKind::Time => "time",
            RuleKind::Json => "json",
            RuleKind::Alpha => "alpha",
            RuleKind::AlphaNum => "alpha_num",
            RuleKind::Phone => "phone",
            RuleKind::Name => "name",
            RuleKind::FirstName => "first_name",
            RuleKind::LastName => "last_name",
            RuleKind::Password => "password",
            RuleKind::Title => "title",
            RuleKind::Text => "text",
            RuleKind::Slug => "slug",
            RuleKind::Other(name) => name.as_str(),
        }
    }

    /// Scalar kind of the examples this rule produces, `None` for pure
    /// constraints and unknown rules.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            RuleKind::Required
            | RuleKind::Nullable
            | RuleKind::Min
            | RuleKind::Max
            | RuleKind::Between
            | RuleKind::Size
            | RuleKind::In
            | RuleKind::Other(_) => None,
            RuleKind::Integer => Some(ScalarKind::Integer),
            RuleKind::Numeric => Some(ScalarKind::Number),
            RuleKind::Boolean => Some(ScalarKind::Boolean),
            RuleKind::Array => Some(ScalarKind::Array),
            _ => Some(ScalarKind::String),
        }
    }

    /// Rules that only state a type and carry no semantic meaning.
    pub fn is_plain_type(&self) -> bool {
        matches!(
            self,
            RuleKind::String | RuleKind::Integer | RuleKind::Numeric | RuleKind::Boolean
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleToken {
    pub kind: RuleKind,
    pub params: Vec<String>,
}

impl RuleToken {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            params: Vec::new(),
        }
    }

    /// Parse `name[:param,param...]`. Blank tokens yield `None`.
    pub fn parse(token: &str) -> Option<RuleToken> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        let (name, params) = match token.split_once(':') {
            Some((name, params)) => (name, params.split(',').map(|p| p.trim().to_string()).collect()),
            None => (token, Vec::new()),
        };
        Some(RuleToken {
            kind: RuleKind::from_name(name),
            params,
        })
    }

    /// Numeric parameter at `index`: a decimal point means floating point,
    /// anything else is read as an integer.
    pub fn numeric_param(&self, index: usize) -> Option<Value> {
        let raw = self.params.get(index)?.trim();
        if raw.contains('.') {
            raw.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
        } else {
            raw.parse::<i64>().ok().map(|n| Value::Number(n.into()))
        }
    }
}

impl fmt::Display for RuleToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.params.is_empty() {
            write!(f, "{}", self.kind.name())
        } else {
            write!(f, "{}:{}", self.kind.name(), self.params.join(","))
        }
    }
}

//! Generator configuration read from the `config` section of a manifest.
//!
//! Every field has a default so a manifest may omit the section entirely.
//! Run-level switches from the command line are applied on top by
//! [`crate::cli::run`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Simplified schema for a class that should not be expanded into an object
/// (dates are the usual case).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassAlias {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl ClassAlias {
    pub fn new(schema_type: &str, format: Option<&str>) -> Self {
        Self {
            schema_type: schema_type.to_string(),
            format: format.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// OpenAPI version written to the document
    pub openapi: String,
    /// Collect expanded classes under `components.x-objects` and reference them
    pub collect_references: bool,
    /// Media type used for request and response bodies
    pub content_type: String,
    /// Extra class aliases, merged over the built-in date/time aliases
    pub class_aliases: IndexMap<String, ClassAlias>,
    /// Extra field name to example rule registrations
    pub example_names: IndexMap<String, String>,
    /// Classes emitted under `components.schemas`
    pub definitions: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            openapi: "3.0.0".to_string(),
            collect_references: true,
            content_type: "application/json".to_string(),
            class_aliases: IndexMap::new(),
            example_names: IndexMap::new(),
            definitions: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    /// Built-in aliases overlaid with the configured ones.
    pub fn resolved_class_aliases(&self) -> IndexMap<String, ClassAlias> {
        let mut aliases: IndexMap<String, ClassAlias> = [
            "DateTime",
            "DateTimeImmutable",
            "DateTimeInterface",
            "Carbon\\Carbon",
            "Carbon\\CarbonImmutable",
            "Illuminate\\Support\\Carbon",
        ]
        .into_iter()
        .map(|class| (class.to_string(), ClassAlias::new("string", Some("date-time"))))
        .collect();

        for (class, alias) in &self.class_aliases {
            aliases.insert(class.trim_start_matches('\\').to_string(), alias.clone());
        }
        aliases
    }
}

//! Typed annotation records attached to classes and controller methods.
//!
//! Annotations form a closed set; every consumer matches on [`Annotation`]
//! instead of looking up attributes by name.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    Tag(TagAnnotation),
    Summary { text: String },
    Description { text: String },
    Response(ResponseAnnotation),
    RequestBody(RequestBodyAnnotation),
    Parameter(ParameterAnnotation),
    Property(PropertyAnnotation),
    Symlink(SymlinkAnnotation),
    IgnoredProperties { names: Vec<String> },
    Deprecated,
}

/// Discriminant of [`Annotation`], used to filter provider lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    Tag,
    Summary,
    Description,
    Response,
    RequestBody,
    Parameter,
    Property,
    Symlink,
    IgnoredProperties,
    Deprecated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagAnnotation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseAnnotation {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub with: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub except: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub only: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

fn default_status() -> u16 {
    200
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBodyAnnotation {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    #[default]
    Path,
    Query,
    Header,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterAnnotation {
    pub name: String,
    #[serde(rename = "in", default)]
    pub location: ParameterLocation,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyAnnotation {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    /// Relation properties are expanded only when requested through `with`.
    #[serde(default)]
    pub relation: bool,
}

/// Declares that a class also exposes the documented properties of `class`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymlinkAnnotation {
    pub class: String,
    /// Keep the declaring class's own properties next to the target's.
    #[serde(default = "default_true")]
    pub merge: bool,
    /// Let the target's properties win over already collected ones.
    #[serde(default, rename = "override")]
    pub override_properties: bool,
}

fn default_true() -> bool {
    true
}

impl Annotation {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::Tag(_) => AnnotationKind::Tag,
            Annotation::Summary { .. } => AnnotationKind::Summary,
            Annotation::Description { .. } => AnnotationKind::Description,
            Annotation::Response(_) => AnnotationKind::Response,
            Annotation::RequestBody(_) => AnnotationKind::RequestBody,
            Annotation::Parameter(_) => AnnotationKind::Parameter,
            Annotation::Property(_) => AnnotationKind::Property,
            Annotation::Symlink(_) => AnnotationKind::Symlink,
            Annotation::IgnoredProperties { .. } => AnnotationKind::IgnoredProperties,
            Annotation::Deprecated => AnnotationKind::Deprecated,
        }
    }

    /// Attribute mapping of the annotation, `kind` included.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Attributes without the `kind` discriminator, in declaration order.
    pub fn attributes(&self) -> IndexMap<String, Value> {
        match self.to_value() {
            Value::Object(map) => map.into_iter().filter(|(key, _)| key != "kind").collect(),
            _ => IndexMap::new(),
        }
    }
}

/// Keeps only annotations of the requested kind, or all when `filter` is `None`.
pub fn filter_annotations(annotations: &[Annotation], filter: Option<AnnotationKind>) -> Vec<Annotation> {
    annotations
        .iter()
        .filter(|annotation| filter.map_or(true, |kind| annotation.kind() == kind))
        .cloned()
        .collect()
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "@{:?}", self.kind())?;
        let attributes = self.attributes();
        if attributes.is_empty() {
            return Ok(());
        }
        let rendered: Vec<String> = attributes
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("{}=\"{}\"", key, s),
                other => format!("{}={}", key, other),
            })
            .collect();
        write!(f, "({})", rendered.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_tagged_annotations() {
        let yaml = r#"
- kind: tag
  name: Users
- kind: response
  type: App\Models\User
  with: [posts]
- kind: symlink
  class: App\Models\Base
- kind: deprecated
"#;
        let annotations: Vec<Annotation> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(annotations.len(), 4);
        assert_eq!(annotations[0].kind(), AnnotationKind::Tag);

        match &annotations[1] {
            Annotation::Response(response) => {
                assert_eq!(response.status, 200);
                assert_eq!(response.type_name.as_deref(), Some("App\\Models\\User"));
                assert_eq!(response.with, vec!["posts".to_string()]);
            }
            other => panic!("Expected response annotation, got {:?}", other),
        }

        match &annotations[2] {
            Annotation::Symlink(symlink) => {
                assert!(symlink.merge);
                assert!(!symlink.override_properties);
            }
            other => panic!("Expected symlink annotation, got {:?}", other),
        }
        assert_eq!(annotations[3], Annotation::Deprecated);
    }

    #[test]
    fn test_filter_by_kind() {
        let annotations = vec![
            Annotation::Tag(TagAnnotation {
                name: "Users".to_string(),
                description: None,
            }),
            Annotation::Summary {
                text: "List users".to_string(),
            },
        ];
        let tags = filter_annotations(&annotations, Some(AnnotationKind::Tag));
        assert_eq!(tags.len(), 1);
        assert_eq!(filter_annotations(&annotations, None).len(), 2);
    }

    #[test]
    fn test_to_value_and_display() {
        let annotation = Annotation::Tag(TagAnnotation {
            name: "Users".to_string(),
            description: Some("User management".to_string()),
        });
        assert_eq!(
            annotation.to_value(),
            json!({"kind": "tag", "name": "Users", "description": "User management"})
        );
        assert_eq!(
            annotation.to_string(),
            "@Tag(name=\"Users\", description=\"User management\")"
        );
        assert_eq!(Annotation::Deprecated.to_string(), "@Deprecated");
    }
}

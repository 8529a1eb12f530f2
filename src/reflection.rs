//! Class metadata of the documented application.
//!
//! The host framework exports what reflection knows about its classes
//! (public properties, annotations, controller methods and validation rules)
//! into the manifest. [`ClassRegistry`] serves that data through the
//! provider traits the describer depends on, so the core never cares where
//! the metadata came from.

use crate::annotation::{filter_annotations, Annotation, AnnotationKind};
use crate::rule_token::RawRules;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read access to class structure.
pub trait ReflectionProvider {
    fn class_exists(&self, name: &str) -> bool;
    /// Public, non-static instance properties in declaration order.
    fn public_properties(&self, class: &str) -> Vec<PropertyInfo>;
    fn declared_type(&self, class: &str, property: &str) -> Option<String>;
    /// Class summary.
    fn class_description(&self, class: &str) -> Option<String>;
}

/// Read access to class and method annotations.
pub trait AnnotationProvider {
    fn class_annotations(&self, class: &str, filter: Option<AnnotationKind>) -> Vec<Annotation>;
    /// `method_ref` has the form `Class@method`.
    fn method_annotations(&self, method_ref: &str, filter: Option<AnnotationKind>) -> Vec<Annotation>;
}

/// Everything the describer needs to know about classes.
pub trait ClassSource: ReflectionProvider + AnnotationProvider {}

impl<T: ReflectionProvider + AnnotationProvider> ClassSource for T {}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInfo {
    pub name: String,
    pub type_name: Option<String>,
    pub description: Option<String>,
    pub example: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyDef {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(rename = "static")]
    pub is_static: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub annotations: Vec<Annotation>,
    /// Request/DTO class injected into the action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassDef {
    pub kind: ClassKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub properties: IndexMap<String, PropertyDef>,
    pub annotations: Vec<Annotation>,
    pub methods: IndexMap<String, MethodDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<IndexMap<String, RawRules>>,
    /// Reading the rules of this class fails with this message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_error: Option<String>,
    /// Human-readable names of rule keys, used as field descriptions
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, String>,
}

/// All known classes, keyed by fully-qualified name without a leading `\`.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: IndexMap<String, ClassDef>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class, replacing any previous definition with the same name.
    pub fn insert(&mut self, name: &str, class: ClassDef) {
        let name = canonical_class_name(name);
        if self.classes.contains_key(name) {
            debug!("Replacing class definition: {}", name);
        }
        self.classes.insert(name.to_string(), class);
    }

    pub fn get(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(canonical_class_name(name))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// Look up a controller method by `Class@method` reference.
    pub fn method(&self, method_ref: &str) -> Option<&MethodDef> {
        let (class, method) = split_method_ref(method_ref)?;
        self.get(class)?.methods.get(method)
    }

    /// Raw validation rules of a request class.
    ///
    /// Fails with the recorded message when the class's rules cannot be
    /// read; an unknown class or a class without rules yields an empty map.
    pub fn rules(&self, class: &str) -> std::result::Result<IndexMap<String, RawRules>, String> {
        let Some(def) = self.get(class) else {
            return Ok(IndexMap::new());
        };
        if let Some(message) = &def.rules_error {
            return Err(message.clone());
        }
        Ok(def.rules.clone().unwrap_or_default())
    }

    /// Rule key labels of a request class.
    pub fn labels(&self, class: &str) -> IndexMap<String, String> {
        self.get(class).map(|def| def.labels.clone()).unwrap_or_default()
    }
}

impl ReflectionProvider for ClassRegistry {
    fn class_exists(&self, name: &str) -> bool {
        self.classes.contains_key(canonical_class_name(name))
    }

    fn public_properties(&self, class: &str) -> Vec<PropertyInfo> {
        let Some(def) = self.get(class) else {
            return Vec::new();
        };
        // Interfaces declare no instance state.
        if def.kind == ClassKind::Interface {
            return Vec::new();
        }
        def.properties
            .iter()
            .filter(|(_, property)| !property.is_static)
            .map(|(name, property)| PropertyInfo {
                name: name.clone(),
                type_name: property.type_name.clone(),
                description: property.description.clone(),
                example: property.example.clone(),
            })
            .collect()
    }

    fn declared_type(&self, class: &str, property: &str) -> Option<String> {
        self.get(class)?.properties.get(property)?.type_name.clone()
    }

    fn class_description(&self, class: &str) -> Option<String> {
        self.get(class)?.description.clone()
    }
}

impl AnnotationProvider for ClassRegistry {
    fn class_annotations(&self, class: &str, filter: Option<AnnotationKind>) -> Vec<Annotation> {
        self.get(class)
            .map(|def| filter_annotations(&def.annotations, filter))
            .unwrap_or_default()
    }

    fn method_annotations(&self, method_ref: &str, filter: Option<AnnotationKind>) -> Vec<Annotation> {
        self.method(method_ref)
            .map(|method| filter_annotations(&method.annotations, filter))
            .unwrap_or_default()
    }
}

/// Strip the single leading namespace separator.
pub fn canonical_class_name(name: &str) -> &str {
    name.strip_prefix('\\').unwrap_or(name)
}

/// Split `Class@method` into its parts.
pub fn split_method_ref(method_ref: &str) -> Option<(&str, &str)> {
    let (class, method) = method_ref.split_once('@')?;
    if class.is_empty() || method.is_empty() {
        return None;
    }
    Some((class, method))
}

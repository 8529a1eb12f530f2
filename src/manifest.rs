//! Application manifests exported by the host framework.
//!
//! A manifest carries the `info` block, generator configuration, class
//! metadata and the route table. Several manifests can be combined into
//! one before building the document.

use crate::config::GeneratorConfig;
use crate::reflection::{canonical_class_name, ClassDef, ClassRegistry};
use crate::route::RouteInfo;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

/// The OpenAPI `info` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for Info {
    fn default() -> Self {
        Self {
            title: "API Documentation".to_string(),
            version: "1.0.0".to_string(),
            description: None,
        }
    }
}

/// One manifest file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Document metadata
    pub info: Info,
    /// Generator options
    pub config: GeneratorConfig,
    /// Class metadata keyed by fully-qualified class name
    pub classes: IndexMap<String, ClassDef>,
    /// Route table of the application
    pub routes: Vec<RouteInfo>,
}

impl Manifest {
    /// Fold manifests in order into one.
    ///
    /// Later class definitions replace earlier ones and routes are
    /// concatenated; class names lose their leading `\`. `info` and
    /// `config` come from the last manifest that sets them to something
    /// other than the defaults.
    pub fn combine(manifests: Vec<Manifest>) -> Manifest {
        let mut combined = Manifest::default();
        for manifest in manifests {
            if manifest.info != Info::default() {
                combined.info = manifest.info;
            }
            if manifest.config != GeneratorConfig::default() {
                combined.config = manifest.config;
            }
            for (name, class) in manifest.classes {
                let name = canonical_class_name(&name).to_string();
                if combined.classes.contains_key(&name) {
                    debug!("Class {} redefined by a later manifest", name);
                }
                combined.classes.insert(name, class);
            }
            combined.routes.extend(manifest.routes);
        }
        combined
    }

    /// Class metadata served through the provider traits.
    pub fn registry(&self) -> ClassRegistry {
        let mut registry = ClassRegistry::new();
        for (name, class) in &self.classes {
            registry.insert(name, class.clone());
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::ReflectionProvider;
    use crate::route::HttpMethod;

    const MANIFEST: &str = r#"
info:
  title: Shop API
  version: 2.1.0
config:
  content_type: application/vnd.api+json
classes:
  '\App\Models\User':
    properties:
      id: { type: int }
      name: { type: string }
routes:
  - method: GET
    uri: users/{id}
    action: App\Http\Controllers\UserController@show
"#;

    #[test]
    fn test_deserialize_manifest() {
        let manifest: Manifest = serde_yaml::from_str(MANIFEST).unwrap();
        assert_eq!(manifest.info.title, "Shop API");
        assert_eq!(manifest.config.content_type, "application/vnd.api+json");
        assert!(manifest.config.collect_references);
        assert_eq!(manifest.routes[0].method, HttpMethod::Get);

        let registry = manifest.registry();
        assert!(registry.class_exists("App\\Models\\User"));
        assert_eq!(registry.public_properties("App\\Models\\User").len(), 2);
    }

    #[test]
    fn test_empty_manifest_uses_defaults() {
        let manifest: Manifest = serde_yaml::from_str("{}").unwrap();
        assert_eq!(manifest.info, Info::default());
        assert!(manifest.classes.is_empty());
        assert!(manifest.routes.is_empty());
    }

    #[test]
    fn test_combine_replaces_classes_and_appends_routes() {
        let first: Manifest = serde_yaml::from_str(MANIFEST).unwrap();
        let second: Manifest = serde_yaml::from_str(
            r#"
classes:
  App\Models\User:
    properties:
      email: { type: string }
routes:
  - method: POST
    uri: users
    action: App\Http\Controllers\UserController@store
"#,
        )
        .unwrap();

        let combined = Manifest::combine(vec![first, second]);
        assert_eq!(combined.info.title, "Shop API");
        assert_eq!(combined.config.content_type, "application/vnd.api+json");
        assert_eq!(combined.routes.len(), 2);
        assert_eq!(combined.classes.len(), 1);
        let user = &combined.classes["App\\Models\\User"];
        assert!(user.properties.contains_key("email"));
        assert!(!user.properties.contains_key("id"));
    }
}

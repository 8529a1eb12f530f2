use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::example::{ExampleProvider, NameRegistry};
use crate::reference_cache::ReferenceCache;
use crate::reflection::ClassSource;
use crate::type_normalizer::TypeNormalizer;
use log::debug;

/// State shared by every description made during one generation run.
///
/// The normalizer memo only depends on class metadata and survives
/// [`DescribeContext::reset`]; example caches, sequence cursors and collected
/// references do not.
pub struct DescribeContext<'a> {
    pub classes: &'a dyn ClassSource,
    pub types: TypeNormalizer<'a>,
    pub examples: ExampleProvider,
    pub references: ReferenceCache,
}

impl<'a> DescribeContext<'a> {
    /// Build a context for `classes`.
    ///
    /// Fails when the configured example names conflict with each other or
    /// with the built-in registry.
    pub fn new(classes: &'a dyn ClassSource, config: &GeneratorConfig) -> Result<Self> {
        let names = NameRegistry::build(&config.example_names)?;
        Ok(Self {
            classes,
            types: TypeNormalizer::new(classes, config.resolved_class_aliases()),
            examples: ExampleProvider::new(names),
            references: ReferenceCache::new(config.collect_references),
        })
    }

    /// Discard per-run state before starting an independent run.
    pub fn reset(&mut self) {
        debug!("Resetting describe context");
        self.examples.reset();
        self.references.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::reflection::ClassRegistry;
    use indexmap::IndexMap;
    use serde_json::json;

    #[test]
    fn test_reset_discards_run_state() {
        let registry = ClassRegistry::new();
        let mut ctx = DescribeContext::new(&registry, &GeneratorConfig::default()).unwrap();
        let first = ctx.examples.example(Some("string"), Some("nickname"), None);
        ctx.references
            .set_reference("User", json!({"type": "object"}), &[], &[], &[], true);

        ctx.reset();
        assert!(ctx.references.is_empty());
        let again = ctx.examples.example(Some("string"), Some("nickname"), None);
        assert_eq!(first, again);
    }

    #[test]
    fn test_conflicting_example_names_fail_eagerly() {
        let registry = ClassRegistry::new();
        let mut example_names = IndexMap::new();
        example_names.insert("price".to_string(), "email".to_string());
        let config = GeneratorConfig {
            example_names,
            ..GeneratorConfig::default()
        };
        let result = DescribeContext::new(&registry, &config);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_reference_collection_follows_config() {
        let registry = ClassRegistry::new();
        let config = GeneratorConfig {
            collect_references: false,
            ..GeneratorConfig::default()
        };
        let ctx = DescribeContext::new(&registry, &config).unwrap();
        assert!(!ctx.references.is_enabled());
    }
}

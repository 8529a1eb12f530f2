use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::{json, Value};
use std::collections::HashSet;

/// Prefix of every collected object reference
pub const REFERENCE_PREFIX: &str = "#/components/x-objects/";

/// Class reference cache - expands every (class, modifiers) combination once
/// and hands out `$ref` nodes afterwards
#[derive(Debug, Default)]
pub struct ReferenceCache {
    /// Whether references are collected at all
    enabled: bool,
    /// Collected bodies keyed by their component name
    entries: IndexMap<String, Value>,
    /// Keys whose expansion has started but not finished
    in_progress: HashSet<String>,
}

/// Identity of one class expansion: class name plus modifier lists
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceKey {
    /// Component name under `components.x-objects`
    pub name: String,
}

impl ReferenceKey {
    /// Build the key; modifier list order never affects the result.
    pub fn new(class: &str, with: &[String], except: &[String], only: &[String]) -> Self {
        let mut name = sanitize(class);
        for (marker, list) in [("w", with), ("wo", except), ("o", only)] {
            if list.is_empty() {
                continue;
            }
            let mut sorted: Vec<String> = list.iter().map(|item| sanitize(item)).collect();
            sorted.sort();
            sorted.dedup();
            name.push_str(&format!("__{}_{}", marker, sorted.join("_")));
        }
        Self { name }
    }

    /// Full `$ref` path
    pub fn path(&self) -> String {
        format!("{}{}", REFERENCE_PREFIX, self.name)
    }

    /// `{"$ref": path}` node
    pub fn to_ref(&self) -> Value {
        json!({ "$ref": self.path() })
    }
}

/// Keep only characters that are safe in file names and JSON pointers.
fn sanitize(raw: &str) -> String {
    raw.trim_start_matches('\\')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

impl ReferenceCache {
    /// Create a new ReferenceCache
    pub fn new(enabled: bool) -> Self {
        debug!("Initializing ReferenceCache (enabled: {})", enabled);
        Self {
            enabled,
            entries: IndexMap::new(),
            in_progress: HashSet::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Reference to an already collected expansion, `None` when collection
    /// is disabled or nothing was collected under this exact key.
    pub fn get_reference(&self, class: &str, with: &[String], except: &[String], only: &[String]) -> Option<Value> {
        if !self.enabled {
            return None;
        }
        let key = ReferenceKey::new(class, with, except, only);
        if self.entries.contains_key(&key.name) {
            debug!("Reference hit for {}", key.name);
            return Some(key.to_ref());
        }
        None
    }

    /// Store a fully expanded body.
    ///
    /// Returns the reference when `return_ref` is set and collection is
    /// enabled, otherwise the body itself.
    pub fn set_reference(
        &mut self,
        class: &str,
        body: Value,
        with: &[String],
        except: &[String],
        only: &[String],
        return_ref: bool,
    ) -> Value {
        if !self.enabled {
            return body;
        }
        let key = ReferenceKey::new(class, with, except, only);
        self.in_progress.remove(&key.name);
        debug!("Collecting object reference {}", key.name);
        if return_ref {
            self.entries.insert(key.name.clone(), body);
            key.to_ref()
        } else {
            self.entries.insert(key.name, body.clone());
            body
        }
    }

    /// Mark the expansion of `key` as started.
    ///
    /// Returns `false` when the same expansion is already running further up
    /// the stack, in which case the caller must not recurse.
    pub fn begin(&mut self, key: &ReferenceKey) -> bool {
        if self.in_progress.contains(&key.name) {
            warn!("Circular reference detected for {}", key.name);
            return false;
        }
        self.in_progress.insert(key.name.clone());
        true
    }

    /// Mark the expansion of `key` as finished without storing a body.
    pub fn finish(&mut self, key: &ReferenceKey) {
        self.in_progress.remove(&key.name);
    }

    pub fn is_in_progress(&self, key: &ReferenceKey) -> bool {
        self.in_progress.contains(&key.name)
    }

    /// Collected body behind a `$ref` path or bare component name.
    pub fn body(&self, reference: &str) -> Option<&Value> {
        let name = reference.strip_prefix(REFERENCE_PREFIX).unwrap_or(reference);
        self.entries.get(name)
    }

    /// All collected bodies in collection order.
    pub fn collected(&self) -> &IndexMap<String, Value> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every collected body and in-flight marker.
    pub fn clear(&mut self) {
        debug!("Clearing {} collected references", self.entries.len());
        self.entries.clear();
        self.in_progress.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_key_format() {
        let key = ReferenceKey::new(
            "\\App\\Models\\User",
            &strings(&["posts", "comments"]),
            &strings(&["password"]),
            &[],
        );
        assert_eq!(key.name, "App_Models_User__w_comments_posts__wo_password");
        assert_eq!(
            key.path(),
            "#/components/x-objects/App_Models_User__w_comments_posts__wo_password"
        );
        assert_eq!(ReferenceKey::new("App\\Models\\User", &[], &[], &[]).name, "App_Models_User");
        assert_eq!(
            ReferenceKey::new("User", &[], &[], &strings(&["id"])).name,
            "User__o_id"
        );
    }

    #[test]
    fn test_key_ignores_list_order() {
        let a = ReferenceKey::new("User", &strings(&["a", "b"]), &strings(&["x", "y"]), &[]);
        let b = ReferenceKey::new("User", &strings(&["b", "a"]), &strings(&["y", "x"]), &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_set_then_get_returns_reference() {
        let mut cache = ReferenceCache::new(true);
        assert_eq!(cache.get_reference("User", &[], &[], &[]), None);

        let body = json!({"type": "object", "properties": {}});
        let returned = cache.set_reference("User", body.clone(), &[], &[], &[], true);
        assert_eq!(returned, json!({"$ref": "#/components/x-objects/User"}));
        assert_eq!(cache.get_reference("User", &[], &[], &[]), Some(returned));
        assert_eq!(cache.body("#/components/x-objects/User"), Some(&body));

        let inline = cache.set_reference("Post", body.clone(), &[], &[], &[], false);
        assert_eq!(inline, body);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_disabled_cache_never_collects() {
        let mut cache = ReferenceCache::new(false);
        let body = json!({"type": "object"});
        assert_eq!(cache.set_reference("User", body.clone(), &[], &[], &[], true), body);
        assert_eq!(cache.get_reference("User", &[], &[], &[]), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_in_progress_guard() {
        let mut cache = ReferenceCache::new(true);
        let key = ReferenceKey::new("Node", &[], &[], &[]);
        assert!(cache.begin(&key));
        assert!(cache.is_in_progress(&key));
        assert!(!cache.begin(&key));
        cache.set_reference("Node", json!({"type": "object"}), &[], &[], &[], true);
        assert!(!cache.is_in_progress(&key));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut cache = ReferenceCache::new(true);
        let key = ReferenceKey::new("Pending", &[], &[], &[]);
        cache.begin(&key);
        cache.set_reference("User", json!({"type": "object"}), &[], &[], &[], true);
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.is_in_progress(&key));
        assert_eq!(cache.get_reference("User", &[], &[], &[]), None);
    }
}

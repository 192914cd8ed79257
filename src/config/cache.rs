//! Caching of resolved configurations.
//!
//! The cache is an injectable capability of the resolver rather than
//! global state. [`InMemoryConfigCache`] keeps entries for the process
//! lifetime; entries leave only through explicit invalidation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::resolver::EffectiveConfig;

/// Storage for resolved configurations keyed by organization slug.
pub trait ConfigCache: Send + Sync {
    /// Returns the cached configuration for a slug.
    fn get(&self, slug: &str) -> Option<Arc<EffectiveConfig>>;

    /// Stores a configuration, replacing any previous entry.
    fn insert(&self, slug: &str, config: Arc<EffectiveConfig>);

    /// Removes one entry. Returns true if an entry was present.
    fn invalidate(&self, slug: &str) -> bool;

    /// Removes every entry.
    fn invalidate_all(&self);

    /// Returns the number of cached entries.
    fn len(&self) -> usize;

    /// Returns true if nothing is cached.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An unbounded, process-lifetime cache with no expiry.
#[derive(Debug, Default)]
pub struct InMemoryConfigCache {
    entries: RwLock<HashMap<String, Arc<EffectiveConfig>>>,
}

impl InMemoryConfigCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

// Entries are replaced whole, so a poisoned map is still consistent.
impl ConfigCache for InMemoryConfigCache {
    fn get(&self, slug: &str) -> Option<Arc<EffectiveConfig>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(slug).cloned()
    }

    fn insert(&self, slug: &str, config: Arc<EffectiveConfig>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(slug.to_string(), config);
    }

    fn invalidate(&self, slug: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(slug).is_some()
    }

    fn invalidate_all(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrganizationIdentity;
    use serde_json::json;

    fn config(slug: &str) -> Arc<EffectiveConfig> {
        Arc::new(EffectiveConfig {
            organization: OrganizationIdentity {
                slug: slug.to_string(),
                name: slug.to_uppercase(),
                sector: None,
            },
            values: json!({}),
        })
    }

    #[test]
    fn test_insert_and_get() {
        let cache = InMemoryConfigCache::new();
        assert!(cache.is_empty());

        cache.insert("a", config("a"));

        assert_eq!(cache.get("a").unwrap().organization.slug, "a");
        assert!(cache.get("b").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_single_entry() {
        let cache = InMemoryConfigCache::new();
        cache.insert("a", config("a"));
        cache.insert("b", config("b"));

        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_invalidate_all() {
        let cache = InMemoryConfigCache::new();
        cache.insert("a", config("a"));
        cache.insert("b", config("b"));

        cache.invalidate_all();

        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InMemoryConfigCache>();
    }
}

// Tue Jan 13 2026 - Alex

use crate::introspection::IntrospectionError;
use crate::model::{RawMetadata, TypeId};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CachedTypeInfo {
    pub metadata: RawMetadata,
    pub abstractions: Vec<String>,
}

/// Per-type introspection results keyed by type identity. `None` records that a
/// type carries no discovery metadata. Errors are never cached.
pub struct MetadataCache {
    entries: RwLock<AHashMap<TypeId, Option<Arc<CachedTypeInfo>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(AHashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get_or_load<F>(&self, id: &TypeId, load: F) -> Result<Option<Arc<CachedTypeInfo>>, IntrospectionError>
    where
        F: FnOnce() -> Result<Option<CachedTypeInfo>, IntrospectionError>,
    {
        if let Some(cached) = self.entries.read().get(id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let loaded = load()?.map(Arc::new);
        self.entries.write().insert(id.clone(), loaded.clone());
        Ok(loaded)
    }

    /// Drops every entry belonging to a module, used when the module was rebuilt.
    pub fn forget_module(&self, module_identity: &str) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|id, _| !id.belongs_to(module_identity));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Lifetime;

    #[test]
    fn test_loader_runs_once() {
        let cache = MetadataCache::new();
        let id = TypeId::new("A@1", "Widget");
        let mut calls = 0;

        for _ in 0..3 {
            let info = cache
                .get_or_load(&id, || {
                    calls += 1;
                    Ok(Some(CachedTypeInfo {
                        metadata: RawMetadata::new(Lifetime::Singleton),
                        abstractions: vec!["IWidget".into()],
                    }))
                })
                .unwrap();
            assert!(info.is_some());
        }

        assert_eq!(calls, 1);
        assert_eq!(cache.hits(), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = MetadataCache::new();
        let id = TypeId::new("A@1", "Broken");

        let first = cache.get_or_load(&id, || {
            Err(IntrospectionError::MalformedMetadata {
                type_name: "Broken".into(),
                reason: "bad lifetime".into(),
            })
        });
        assert!(first.is_err());
        assert!(cache.is_empty());

        let second = cache.get_or_load(&id, || Ok(None)).unwrap();
        assert!(second.is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_forget_module() {
        let cache = MetadataCache::new();
        cache.get_or_load(&TypeId::new("A@1", "X"), || Ok(None)).unwrap();
        cache.get_or_load(&TypeId::new("A@1", "Y"), || Ok(None)).unwrap();
        cache.get_or_load(&TypeId::new("B@1", "X"), || Ok(None)).unwrap();

        assert_eq!(cache.forget_module("A@1"), 2);
        assert_eq!(cache.len(), 1);
    }
}

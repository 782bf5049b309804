//! Snapshot Cache - zero-synchronization read path
//!
//! Once the registry is locked, the hot path (resolving core, stable
//! entries) should not touch any shared-mutable structure. The cache is an
//! immutable name -> handler map published through an atomic pointer swap:
//! rebuilt wholesale after each structural mutation, nulled out the instant
//! an entry degrades.

use crate::store::EntryStore;
use arc_swap::ArcSwapOption;
use latt_foundation::Handler;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

type SnapshotMap = HashMap<String, Arc<dyn Handler>>;

/// Atomically swapped read-path cache.
///
/// `None` while the registry is unlocked or any entry is degraded.
pub struct SnapshotCache {
    map: ArcSwapOption<SnapshotMap>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self {
            map: ArcSwapOption::const_empty(),
        }
    }

    /// Fast-path lookup. `None` means "fall through to the store" - either
    /// no snapshot is published or the name is not in it.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.map.load().as_ref().and_then(|m| m.get(name).cloned())
    }

    /// Whether a snapshot is currently published.
    pub fn is_active(&self) -> bool {
        self.map.load().is_some()
    }

    /// Rebuild the whole snapshot from the store.
    ///
    /// Publishes only while the store is locked; before that the cache
    /// stays empty so bootstrap reads always hit the store.
    pub fn rebuild(&self, store: &EntryStore) {
        if !store.is_locked() {
            self.invalidate();
            return;
        }

        let map: SnapshotMap = store.healthy_handlers().into_iter().collect();
        debug!(entries = map.len(), "snapshot cache rebuilt");
        self.map.store(Some(Arc::new(map)));
    }

    /// Cheap degradation response: null the snapshot without rebuilding.
    pub fn invalidate(&self) {
        if self.map.swap(None).is_some() {
            trace!("snapshot cache invalidated");
        }
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use latt_foundation::{Metadata, RegistryConfig, Result};
    use serde_json::Value;

    struct NullHandler;

    #[async_trait]
    impl Handler for NullHandler {
        async fn invoke(&self, _function: &str, args: Value) -> Result<Value> {
            Ok(args)
        }
    }

    fn locked_store_with(names: &[&str]) -> EntryStore {
        let store = EntryStore::new(RegistryConfig::default());
        for name in names {
            store
                .register(name, Arc::new(NullHandler), Metadata::new())
                .unwrap();
        }
        store.lock_core();
        store
    }

    #[test]
    fn test_no_snapshot_before_lock() {
        let store = EntryStore::new(RegistryConfig::default());
        store
            .register("llm", Arc::new(NullHandler), Metadata::new())
            .unwrap();

        let cache = SnapshotCache::new();
        cache.rebuild(&store);

        assert!(!cache.is_active());
        assert!(cache.get("llm").is_none());
    }

    #[test]
    fn test_rebuild_after_lock() {
        let store = locked_store_with(&["llm", "shell"]);
        let cache = SnapshotCache::new();
        cache.rebuild(&store);

        assert!(cache.is_active());
        assert!(cache.get("llm").is_some());
        assert!(cache.get("shell").is_some());
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn test_degraded_entries_are_excluded() {
        let store = locked_store_with(&["llm", "flaky"]);
        store.record_failure("flaky").unwrap();

        let cache = SnapshotCache::new();
        cache.rebuild(&store);

        // A single failure already removes the entry from the fast path.
        assert!(cache.get("llm").is_some());
        assert!(cache.get("flaky").is_none());
    }

    #[test]
    fn test_invalidate_nulls_out() {
        let store = locked_store_with(&["llm"]);
        let cache = SnapshotCache::new();
        cache.rebuild(&store);
        assert!(cache.is_active());

        cache.invalidate();
        assert!(!cache.is_active());
        assert!(cache.get("llm").is_none());

        // A later rebuild brings it back.
        cache.rebuild(&store);
        assert!(cache.is_active());
    }
}

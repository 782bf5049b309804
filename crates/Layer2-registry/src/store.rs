//! Entry Store - concurrent name -> entry map
//!
//! Readable from any thread without synchronization; mutated only through
//! the registry actor, which serializes every write. The sovereignty flag
//! lives here so readers and the actor agree on the current phase.

use crate::backup::RegistryBackup;
use crate::entry::{EntryInfo, RegistryEntry, ResolvedEntry};
use dashmap::DashMap;
use latt_foundation::{handler::implements, Error, Handler, Metadata, RegistryConfig, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Separator a plugin name must contain once the registry is locked.
pub const NAMESPACE_SEPARATOR: char = '.';

// ============================================================================
// EntryStore
// ============================================================================

/// Concurrent entry store with the per-registry sovereignty flag.
pub struct EntryStore {
    /// name -> entry. Lock-free reads, actor-serialized writes.
    entries: DashMap<String, RegistryEntry>,

    /// Sovereignty flag: false during bootstrap, true after `lock_core`.
    locked: AtomicBool,

    /// Behavior knobs (threshold, overwrite, required capability).
    config: RegistryConfig,
}

impl EntryStore {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            entries: DashMap::new(),
            locked: AtomicBool::new(false),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    // ========================================================================
    // Read path
    // ========================================================================

    /// Look up a handler by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Handler>> {
        match self.entries.get(name) {
            None => Err(Error::NotFound(name.to_string())),
            Some(entry) if !entry.handler.is_loaded() => {
                Err(Error::ModuleNotLoaded(name.to_string()))
            }
            Some(entry) => Ok(Arc::clone(&entry.handler)),
        }
    }

    /// Like `resolve`, but refuses entries at or past the failure threshold.
    pub fn resolve_stable(&self, name: &str) -> Result<Arc<dyn Handler>> {
        match self.entries.get(name) {
            None => Err(Error::NotFound(name.to_string())),
            Some(entry) if entry.is_degraded(self.config.max_failures) => {
                Err(Error::Unstable(name.to_string()))
            }
            Some(entry) if !entry.handler.is_loaded() => {
                Err(Error::ModuleNotLoaded(name.to_string()))
            }
            Some(entry) => Ok(Arc::clone(&entry.handler)),
        }
    }

    /// Handler plus registration facts.
    pub fn resolve_entry(&self, name: &str) -> Result<ResolvedEntry> {
        match self.entries.get(name) {
            None => Err(Error::NotFound(name.to_string())),
            Some(entry) if !entry.handler.is_loaded() => {
                Err(Error::ModuleNotLoaded(name.to_string()))
            }
            Some(entry) => Ok(ResolvedEntry {
                name: entry.name.clone(),
                handler: Arc::clone(&entry.handler),
                metadata: entry.metadata.clone(),
            }),
        }
    }

    /// Serializable view of one entry.
    pub fn get_info(&self, name: &str) -> Option<EntryInfo> {
        self.entries.get(name).map(|e| e.info())
    }

    /// Every entry, degraded or not.
    pub fn list_all(&self) -> Vec<EntryInfo> {
        let mut all: Vec<EntryInfo> = self.entries.iter().map(|e| e.info()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Entries below the failure threshold whose handler is loadable and
    /// whose availability probe (if any) passes. A panic inside the probe
    /// counts as unavailable and never propagates.
    pub fn list_available(&self) -> Vec<EntryInfo> {
        let mut available: Vec<EntryInfo> = self
            .entries
            .iter()
            .filter(|e| !e.is_degraded(self.config.max_failures))
            .filter(|e| e.handler.is_loaded())
            .filter(|e| {
                let handler = Arc::clone(&e.handler);
                match catch_unwind(AssertUnwindSafe(move || handler.availability())) {
                    Ok(None) => true,
                    Ok(Some(up)) => up,
                    Err(_) => {
                        warn!(entry = %e.name, "availability probe panicked; treating as unavailable");
                        false
                    }
                }
            })
            .map(|e| e.info())
            .collect();
        available.sort_by(|a, b| a.name.cmp(&b.name));
        available
    }

    /// Zero-failure, loadable handlers - the snapshot cache population.
    pub fn healthy_handlers(&self) -> Vec<(String, Arc<dyn Handler>)> {
        self.entries
            .iter()
            .filter(|e| e.failure_count == 0 && e.handler.is_loaded())
            .map(|e| (e.name.clone(), Arc::clone(&e.handler)))
            .collect()
    }

    // ========================================================================
    // Write path (actor only)
    // ========================================================================

    /// Validate and insert a new entry.
    ///
    /// Checks run in order: sovereignty, namespace convention (post-lock),
    /// no-overwrite, required capability. The first failing check wins and
    /// nothing is committed.
    pub fn register(
        &self,
        name: &str,
        handler: Arc<dyn Handler>,
        metadata: Metadata,
    ) -> Result<()> {
        let locked = self.is_locked();

        let existing_core = self.entries.get(name).map(|e| e.core);
        if locked && existing_core == Some(true) {
            return Err(Error::CoreLocked(name.to_string()));
        }

        if locked && !name.contains(NAMESPACE_SEPARATOR) {
            return Err(Error::PluginNamespaceRequired(name.to_string()));
        }

        if existing_core.is_some() && !self.config.allow_overwrite {
            return Err(Error::AlreadyRegistered(name.to_string()));
        }

        if let Some(required) = &self.config.required_capability {
            if !implements(handler.as_ref(), required) {
                return Err(Error::MissingBehaviour {
                    name: name.to_string(),
                    behaviour: required.clone(),
                });
            }
        }

        self.entries
            .insert(name.to_string(), RegistryEntry::new(name, handler, metadata));
        debug!(entry = name, locked, "registered handler");
        Ok(())
    }

    /// Remove an entry. Core entries are immutable once the registry locks.
    pub fn deregister(&self, name: &str) -> Result<()> {
        let existing_core = self.entries.get(name).map(|e| e.core);
        match existing_core {
            None => Err(Error::NotFound(name.to_string())),
            Some(true) if self.is_locked() => Err(Error::CoreLocked(name.to_string())),
            Some(_) => {
                self.entries.remove(name);
                debug!(entry = name, "deregistered handler");
                Ok(())
            }
        }
    }

    /// Stamp every current entry core and flip the sovereignty flag.
    /// Returns the number of entries stamped.
    pub fn lock_core(&self) -> usize {
        let mut stamped = 0;
        for mut entry in self.entries.iter_mut() {
            entry.core = true;
            stamped += 1;
        }
        self.locked.store(true, Ordering::Release);
        debug!(stamped, "registry locked; core entries frozen");
        stamped
    }

    /// Increment an entry's failure counter, returning the new count.
    pub fn record_failure(&self, name: &str) -> Result<u32> {
        match self.entries.get_mut(name) {
            None => Err(Error::NotFound(name.to_string())),
            Some(mut entry) => Ok(entry.record_failure()),
        }
    }

    /// Reset an entry's failure counter to 0.
    pub fn reset_failures(&self, name: &str) -> Result<()> {
        match self.entries.get_mut(name) {
            None => Err(Error::NotFound(name.to_string())),
            Some(mut entry) => {
                entry.reset_failures();
                Ok(())
            }
        }
    }

    /// Full export for `snapshot()`.
    pub fn export(&self) -> RegistryBackup {
        let entries: Vec<RegistryEntry> = self.entries.iter().map(|e| e.clone()).collect();
        RegistryBackup::new(self.is_locked(), entries)
    }

    /// Replace all contents from a backup. Returns the entry count.
    pub fn import(&self, backup: RegistryBackup) -> usize {
        let (locked, entries) = backup.into_parts();
        self.entries.clear();
        let count = entries.len();
        for entry in entries {
            self.entries.insert(entry.name.clone(), entry);
        }
        self.locked.store(locked, Ordering::Release);
        count
    }

    /// Test-support wipe: drop every entry and unlock.
    pub fn clear(&self) {
        self.entries.clear();
        self.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;

    struct StubHandler {
        loaded: bool,
        available: Option<bool>,
        caps: Vec<&'static str>,
    }

    impl StubHandler {
        fn ok() -> Arc<dyn Handler> {
            Arc::new(Self {
                loaded: true,
                available: None,
                caps: vec![],
            })
        }

        fn unloaded() -> Arc<dyn Handler> {
            Arc::new(Self {
                loaded: false,
                available: None,
                caps: vec![],
            })
        }

        fn down() -> Arc<dyn Handler> {
            Arc::new(Self {
                loaded: true,
                available: Some(false),
                caps: vec![],
            })
        }

        fn with_caps(caps: Vec<&'static str>) -> Arc<dyn Handler> {
            Arc::new(Self {
                loaded: true,
                available: None,
                caps,
            })
        }
    }

    #[async_trait]
    impl Handler for StubHandler {
        async fn invoke(&self, _function: &str, args: Value) -> Result<Value> {
            Ok(args)
        }

        fn is_loaded(&self) -> bool {
            self.loaded
        }

        fn availability(&self) -> Option<bool> {
            self.available
        }

        fn capabilities(&self) -> Vec<&'static str> {
            self.caps.clone()
        }
    }

    struct PanickyProbe;

    #[async_trait]
    impl Handler for PanickyProbe {
        async fn invoke(&self, _function: &str, args: Value) -> Result<Value> {
            Ok(args)
        }

        fn availability(&self) -> Option<bool> {
            panic!("probe blew up");
        }
    }

    fn store() -> EntryStore {
        EntryStore::new(RegistryConfig::default())
    }

    #[test]
    fn test_register_and_resolve() {
        let store = store();
        store
            .register("llm", StubHandler::ok(), Metadata::new())
            .unwrap();

        assert!(store.resolve("llm").is_ok());
        assert!(matches!(
            store.resolve("nope"),
            Err(Error::NotFound(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_module_not_loaded() {
        let store = store();
        store
            .register("ghost", StubHandler::unloaded(), Metadata::new())
            .unwrap();

        assert!(matches!(
            store.resolve("ghost"),
            Err(Error::ModuleNotLoaded(_))
        ));
        assert!(matches!(
            store.resolve_entry("ghost"),
            Err(Error::ModuleNotLoaded(_))
        ));
    }

    #[test]
    fn test_no_overwrite_by_default() {
        let store = store();
        store
            .register("llm", StubHandler::ok(), Metadata::new())
            .unwrap();

        let err = store
            .register("llm", StubHandler::ok(), Metadata::new())
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered(_)));
    }

    #[test]
    fn test_overwrite_when_configured() {
        let store = EntryStore::new(RegistryConfig::default().with_overwrite(true));
        store
            .register("llm", StubHandler::ok(), Metadata::new())
            .unwrap();
        store
            .register("llm", StubHandler::ok(), Metadata::new())
            .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sovereignty_lifecycle() {
        let store = store();
        store
            .register("llm", StubHandler::ok(), Metadata::new())
            .unwrap();

        let stamped = store.lock_core();
        assert_eq!(stamped, 1);
        assert!(store.is_locked());

        // Core entries refuse overwrite regardless of the overwrite setting.
        let err = store
            .register("llm", StubHandler::ok(), Metadata::new())
            .unwrap_err();
        assert!(matches!(err, Error::CoreLocked(_)));

        let err = store.deregister("llm").unwrap_err();
        assert!(matches!(err, Error::CoreLocked(_)));

        // Post-lock flat names are rejected.
        let err = store
            .register("plugin_x", StubHandler::ok(), Metadata::new())
            .unwrap_err();
        assert!(matches!(err, Error::PluginNamespaceRequired(_)));

        // Namespaced plugins are welcome and stay removable.
        store
            .register("my_plugin.x", StubHandler::ok(), Metadata::new())
            .unwrap();
        assert!(!store.get_info("my_plugin.x").unwrap().core);
        store.deregister("my_plugin.x").unwrap();
    }

    #[test]
    fn test_core_locked_beats_overwrite_setting() {
        let store = EntryStore::new(RegistryConfig::default().with_overwrite(true));
        store
            .register("llm", StubHandler::ok(), Metadata::new())
            .unwrap();
        store.lock_core();

        let err = store
            .register("llm", StubHandler::ok(), Metadata::new())
            .unwrap_err();
        assert!(matches!(err, Error::CoreLocked(_)));
    }

    #[test]
    fn test_required_capability() {
        let store =
            EntryStore::new(RegistryConfig::default().with_required_capability("dispatcher"));

        let err = store
            .register("plain", StubHandler::ok(), Metadata::new())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingBehaviour { ref behaviour, .. } if behaviour == "dispatcher"
        ));
        assert!(!store.contains("plain"));

        store
            .register(
                "routed",
                StubHandler::with_caps(vec!["dispatcher"]),
                Metadata::new(),
            )
            .unwrap();
    }

    #[test]
    fn test_circuit_breaker_threshold() {
        let store = store();
        store
            .register("flaky", StubHandler::ok(), Metadata::new())
            .unwrap();

        for expected in 1..=5u32 {
            assert_eq!(store.record_failure("flaky").unwrap(), expected);
        }

        // resolve still works; resolve_stable refuses.
        assert!(store.resolve("flaky").is_ok());
        assert!(matches!(
            store.resolve_stable("flaky"),
            Err(Error::Unstable(_))
        ));

        store.reset_failures("flaky").unwrap();
        assert!(store.resolve_stable("flaky").is_ok());
    }

    #[test]
    fn test_list_available_filters() {
        let store = store();
        store
            .register("good", StubHandler::ok(), Metadata::new())
            .unwrap();
        store
            .register("ghost", StubHandler::unloaded(), Metadata::new())
            .unwrap();
        store
            .register("down", StubHandler::down(), Metadata::new())
            .unwrap();
        store
            .register("probe_bomb", Arc::new(PanickyProbe), Metadata::new())
            .unwrap();
        store
            .register("flaky", StubHandler::ok(), Metadata::new())
            .unwrap();
        for _ in 0..5 {
            store.record_failure("flaky").unwrap();
        }

        let available = store.list_available();
        let names: Vec<&str> = available.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["good"]);

        // list_all still sees everything.
        assert_eq!(store.list_all().len(), 5);
    }

    #[test]
    fn test_export_import_round_trip() {
        let store = store();
        store
            .register("llm", StubHandler::ok(), Metadata::new())
            .unwrap();
        store.record_failure("llm").unwrap();
        store.lock_core();

        let backup = store.export();

        store.clear();
        assert!(store.is_empty());
        assert!(!store.is_locked());

        let restored = store.import(backup);
        assert_eq!(restored, 1);
        assert!(store.is_locked());
        let info = store.get_info("llm").unwrap();
        assert_eq!(info.failure_count, 1);
        assert!(info.core);
    }
}

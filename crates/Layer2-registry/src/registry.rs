//! Registry facade
//!
//! The public surface of one registry instance. Reads are synchronous and
//! lock-free (snapshot cache, then entry store); writes are routed through
//! the actor and awaited. Multiple independent registries coexist; a
//! process-wide default instance is provided for single-registry
//! deployments.

use crate::actor::Command;
use crate::backup::RegistryBackup;
use crate::entry::{EntryInfo, ResolvedEntry};
use crate::event::RegistryEvent;
use crate::supervisor::RegistryInner;
use latt_foundation::{Handler, Metadata, RegistryConfig, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tokio::sync::{broadcast, oneshot};

// ============================================================================
// Registry
// ============================================================================

/// One handler registry instance.
///
/// Cheap to clone; clones share the same store and actor.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Create a registry with default configuration.
    ///
    /// Spawns the actor and caretaker tasks, so this must be called within
    /// a tokio runtime.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with explicit configuration.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            inner: RegistryInner::start(config),
        }
    }

    // ========================================================================
    // Read path - bypasses the actor entirely
    // ========================================================================

    /// Resolve a name to its handler.
    ///
    /// Consults the snapshot cache first; a miss falls through to a direct
    /// store read.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Handler>> {
        if let Some(handler) = self.inner.snapshot.get(name) {
            return Ok(handler);
        }
        self.inner.store.resolve(name)
    }

    /// Resolve, refusing entries at or past the failure threshold.
    pub fn resolve_stable(&self, name: &str) -> Result<Arc<dyn Handler>> {
        self.inner.store.resolve_stable(name)
    }

    /// Resolve a name to its handler plus registration facts.
    pub fn resolve_entry(&self, name: &str) -> Result<ResolvedEntry> {
        self.inner.store.resolve_entry(name)
    }

    /// Every entry, sorted by name.
    pub fn list_all(&self) -> Vec<EntryInfo> {
        self.inner.store.list_all()
    }

    /// Entries currently usable: below the failure threshold, loadable,
    /// and passing their availability probe if they expose one.
    pub fn list_available(&self) -> Vec<EntryInfo> {
        self.inner.store.list_available()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.store.contains(name)
    }

    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    /// Whether the sovereignty lock has been applied.
    pub fn core_locked(&self) -> bool {
        self.inner.store.is_locked()
    }

    /// Point-in-time copy of the full registry state.
    pub fn snapshot(&self) -> RegistryBackup {
        self.inner.store.export()
    }

    /// Aggregate counters for diagnostics.
    pub fn stats(&self) -> RegistryStats {
        let max_failures = self.inner.config.max_failures;
        let mut stats = RegistryStats {
            locked: self.core_locked(),
            ..RegistryStats::default()
        };
        for info in self.inner.store.list_all() {
            stats.total_entries += 1;
            if info.core {
                stats.core_entries += 1;
            } else {
                stats.plugin_entries += 1;
            }
            if info.failure_count >= max_failures {
                stats.degraded_entries += 1;
            }
        }
        stats
    }

    /// Subscribe to registry change events.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.inner.events.subscribe()
    }

    // ========================================================================
    // Write path - serialized by the actor
    // ========================================================================

    /// Register a handler under a unique name.
    pub async fn register(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn Handler>,
        metadata: Metadata,
    ) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner
            .call(
                Command::Register {
                    name: name.into(),
                    handler,
                    metadata,
                    reply: reply_tx,
                },
                reply_rx,
            )
            .await
    }

    /// Register with an empty metadata bag.
    pub async fn register_simple(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> Result<()> {
        self.register(name, handler, Metadata::new()).await
    }

    /// Remove an entry. Locked core entries refuse.
    pub async fn deregister(&self, name: impl Into<String>) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner
            .call(
                Command::Deregister {
                    name: name.into(),
                    reply: reply_tx,
                },
                reply_rx,
            )
            .await
    }

    /// Stamp all current entries core and enter the locked phase.
    /// Returns how many entries were stamped.
    pub async fn lock_core(&self) -> Result<usize> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner
            .call(Command::LockCore { reply: reply_tx }, reply_rx)
            .await
    }

    /// Report a handler failure; returns the new count.
    pub async fn record_failure(&self, name: impl Into<String>) -> Result<u32> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner
            .call(
                Command::RecordFailure {
                    name: name.into(),
                    reply: reply_tx,
                },
                reply_rx,
            )
            .await
    }

    /// Reset a handler's failure count to 0.
    pub async fn reset_failures(&self, name: impl Into<String>) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner
            .call(
                Command::ResetFailures {
                    name: name.into(),
                    reply: reply_tx,
                },
                reply_rx,
            )
            .await
    }

    /// Replace the registry's contents from a backup. Returns the number
    /// of restored entries.
    pub async fn restore(&self, backup: RegistryBackup) -> Result<usize> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner
            .call(
                Command::Restore {
                    backup,
                    reply: reply_tx,
                },
                reply_rx,
            )
            .await
    }

    /// Test-support full wipe: drops every entry and unlocks.
    pub async fn reset(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner
            .call(Command::Reset { reply: reply_tx }, reply_rx)
            .await
    }

    #[cfg(test)]
    pub(crate) async fn crash_actor_for_test(&self) {
        self.inner.crash_actor().await;
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.len())
            .field("locked", &self.core_locked())
            .finish()
    }
}

// ============================================================================
// RegistryStats
// ============================================================================

/// Aggregate registry counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_entries: usize,
    pub core_entries: usize,
    pub plugin_entries: usize,
    pub degraded_entries: usize,
    pub locked: bool,
}

// ============================================================================
// Process-wide default instance
// ============================================================================

static DEFAULT_REGISTRY: OnceLock<Registry> = OnceLock::new();

/// The process-wide default registry, created on first use.
///
/// Convenience for single-registry deployments; anything more involved
/// should construct and inject `Registry` instances explicitly. First call
/// must happen within a tokio runtime.
pub fn default_registry() -> &'static Registry {
    DEFAULT_REGISTRY.get_or_init(Registry::new)
}

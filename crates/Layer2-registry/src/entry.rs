//! Registry entries
//!
//! One `RegistryEntry` per registered name. The entry owns the handler Arc,
//! the opaque metadata bag and the circuit-breaker counter. Entries are
//! mutated only by the registry actor; readers see clones.

use chrono::{DateTime, Utc};
use latt_foundation::{Handler, Metadata};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// RegistryEntry
// ============================================================================

/// A named handler held by the entry store.
#[derive(Clone)]
pub struct RegistryEntry {
    /// Unique key within one registry instance. Immutable once created.
    pub name: String,

    /// Opaque executable reference the registry dispatches to.
    pub handler: Arc<dyn Handler>,

    /// Capability description for callers; never interpreted here.
    pub metadata: Metadata,

    /// Circuit-breaker counter. Only ever incremented or reset to 0.
    pub failure_count: u32,

    /// Stamped true at lock time; never reverses.
    pub core: bool,

    /// When the entry was created.
    pub registered_at: DateTime<Utc>,
}

impl RegistryEntry {
    pub fn new(name: impl Into<String>, handler: Arc<dyn Handler>, metadata: Metadata) -> Self {
        Self {
            name: name.into(),
            handler,
            metadata,
            failure_count: 0,
            core: false,
            registered_at: Utc::now(),
        }
    }

    /// Bump the failure counter, returning the new count.
    pub fn record_failure(&mut self) -> u32 {
        self.failure_count = self.failure_count.saturating_add(1);
        self.failure_count
    }

    /// Reset the failure counter to exactly 0.
    pub fn reset_failures(&mut self) {
        self.failure_count = 0;
    }

    /// True once the counter reaches the configured threshold.
    pub fn is_degraded(&self, max_failures: u32) -> bool {
        self.failure_count >= max_failures
    }

    /// Serializable view of this entry (no handler).
    pub fn info(&self) -> EntryInfo {
        EntryInfo {
            name: self.name.clone(),
            metadata: self.metadata.clone(),
            failure_count: self.failure_count,
            core: self.core,
            registered_at: self.registered_at,
        }
    }
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("name", &self.name)
            .field("failure_count", &self.failure_count)
            .field("core", &self.core)
            .field("registered_at", &self.registered_at)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// EntryInfo
// ============================================================================

/// Handler-free projection of an entry, safe to serialize and ship around.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryInfo {
    pub name: String,
    pub metadata: Metadata,
    pub failure_count: u32,
    pub core: bool,
    pub registered_at: DateTime<Utc>,
}

// ============================================================================
// ResolvedEntry
// ============================================================================

/// What `resolve_entry` hands back: the handler plus its registration facts.
#[derive(Clone)]
pub struct ResolvedEntry {
    pub name: String,
    pub handler: Arc<dyn Handler>,
    pub metadata: Metadata,
}

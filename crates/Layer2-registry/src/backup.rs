//! Registry backups
//!
//! The opaque state handed out by `snapshot()` and accepted by `restore()`.
//! Carries live handler Arcs, so a backup is only meaningful inside the
//! process that produced it; `EntryInfo` views are what cross process
//! boundaries.

use crate::entry::{EntryInfo, RegistryEntry};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Point-in-time copy of a registry's full state.
#[derive(Clone)]
pub struct RegistryBackup {
    id: String,
    created_at: DateTime<Utc>,
    description: Option<String>,
    locked: bool,
    entries: Vec<RegistryEntry>,
}

impl RegistryBackup {
    pub(crate) fn new(locked: bool, entries: Vec<RegistryEntry>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            description: None,
            locked,
            entries,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Sovereignty flag captured at snapshot time.
    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handler-free view of the captured entries.
    pub fn entries(&self) -> Vec<EntryInfo> {
        self.entries.iter().map(|e| e.info()).collect()
    }

    pub(crate) fn into_parts(self) -> (bool, Vec<RegistryEntry>) {
        (self.locked, self.entries)
    }
}

impl std::fmt::Debug for RegistryBackup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryBackup")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("locked", &self.locked)
            .field("entries", &self.entries.len())
            .finish()
    }
}

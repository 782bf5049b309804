//! Registry change events
//!
//! Broadcast after each successful mutation so interested subsystems can
//! react without polling the store.

use serde::{Deserialize, Serialize};

/// Emitted by the registry actor after a mutation commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// A handler was registered
    Registered { name: String },

    /// A handler was removed
    Deregistered { name: String },

    /// The sovereignty lock was applied
    CoreLocked { stamped: usize },

    /// An entry's failure counter moved up
    FailureRecorded { name: String, count: u32 },

    /// An entry's failure counter was reset to 0
    FailuresReset { name: String },

    /// The registry was replaced from a backup
    Restored { entries: usize },

    /// Test-support full wipe
    Cleared,
}

impl RegistryEvent {
    /// The entry this event concerns, if it concerns one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Registered { name } => Some(name),
            Self::Deregistered { name } => Some(name),
            Self::FailureRecorded { name, .. } => Some(name),
            Self::FailuresReset { name } => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_name() {
        let event = RegistryEvent::Registered { name: "llm".into() };
        assert_eq!(event.name(), Some("llm"));

        assert_eq!(RegistryEvent::Cleared.name(), None);
        assert_eq!(RegistryEvent::CoreLocked { stamped: 3 }.name(), None);
    }
}

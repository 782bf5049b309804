//! Trust zones
//!
//! Nodes in a deployment are classified into three tiers. The zone a node
//! sits in decides which registry entries it may see and which nodes it may
//! reach. Zone 0 is the fail-closed default for anything unknown.

use serde::{Deserialize, Serialize};

/// Trust tier of a node.
///
/// Ordering is meaningful: `Core > Worker > Hostile`. A resolver may only
/// see entries owned by zones no more trusted than itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TrustZone {
    /// Untrusted / external node
    Hostile = 0,

    /// Sandboxed worker node
    Worker = 1,

    /// Fully trusted core node
    Core = 2,
}

impl TrustZone {
    /// Numeric tier, as used in configuration files.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// All zones, lowest trust first.
    pub fn all() -> [TrustZone; 3] {
        [TrustZone::Hostile, TrustZone::Worker, TrustZone::Core]
    }
}

impl TryFrom<u8> for TrustZone {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(TrustZone::Hostile),
            1 => Ok(TrustZone::Worker),
            2 => Ok(TrustZone::Core),
            other => Err(format!("invalid trust zone: {}", other)),
        }
    }
}

impl From<TrustZone> for u8 {
    fn from(zone: TrustZone) -> u8 {
        zone.as_u8()
    }
}

impl std::fmt::Display for TrustZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrustZone::Hostile => write!(f, "zone 0"),
            TrustZone::Worker => write!(f, "zone 1"),
            TrustZone::Core => write!(f, "zone 2"),
        }
    }
}

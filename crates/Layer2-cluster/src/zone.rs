//! Zone Directory - node trust classification
//!
//! Maps node identifiers to trust tiers and exposes the two predicates the
//! rest of the system gates on. `can_resolve` governs registry visibility
//! and is enforced by the cluster registry; `can_access` is the general
//! data-flow predicate, exposed as a utility for callers outside this
//! subsystem and enforced nowhere inside it.

use latt_foundation::{Error, Result, TrustZone, ZonesConfig};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

// ============================================================================
// ZoneInfo
// ============================================================================

/// One node's classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneInfo {
    /// Node identifier
    pub node_id: String,

    /// Trust tier
    pub zone: TrustZone,

    /// Diagnostic list of applications expected on the node
    pub apps: Vec<String>,
}

// ============================================================================
// ZoneDirectory
// ============================================================================

/// Per-node trust directory.
///
/// Disabled means single-node/dev operation: every node is fully trusted
/// and no cross-node gating applies.
pub struct ZoneDirectory {
    enabled: bool,
    local_node: String,
    nodes: RwLock<HashMap<String, ZoneInfo>>,
}

impl ZoneDirectory {
    /// Zones off: everyone is zone 2.
    pub fn disabled(local_node: impl Into<String>) -> Self {
        Self {
            enabled: false,
            local_node: local_node.into(),
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Build from static configuration.
    ///
    /// The local node is registered at startup; a local node missing from
    /// the static map gets the fail-closed default (zone 0) and a warning.
    pub fn from_config(local_node: impl Into<String>, config: &ZonesConfig) -> Self {
        let local_node = local_node.into();
        if !config.enabled {
            return Self::disabled(local_node);
        }

        let mut nodes = HashMap::new();
        for (node_id, assignment) in &config.nodes {
            nodes.insert(
                node_id.clone(),
                ZoneInfo {
                    node_id: node_id.clone(),
                    zone: assignment.zone,
                    apps: assignment.apps.clone(),
                },
            );
        }

        if !nodes.contains_key(&local_node) {
            warn!(
                node = %local_node,
                "local node missing from zone configuration; defaulting to zone 0"
            );
            nodes.insert(
                local_node.clone(),
                ZoneInfo {
                    node_id: local_node.clone(),
                    zone: TrustZone::Hostile,
                    apps: Vec::new(),
                },
            );
        }

        Self {
            enabled: true,
            local_node,
            nodes: RwLock::new(nodes),
        }
    }

    pub fn zones_disabled(&self) -> bool {
        !self.enabled
    }

    pub fn local_node(&self) -> &str {
        &self.local_node
    }

    /// Trust tier of a node. Everyone is core with zones disabled; unknown
    /// nodes are hostile with zones enabled.
    pub fn trust_zone(&self, node: &str) -> TrustZone {
        if !self.enabled {
            return TrustZone::Core;
        }
        self.nodes
            .read()
            .get(node)
            .map(|info| info.zone)
            .unwrap_or(TrustZone::Hostile)
    }

    pub fn local_zone(&self) -> TrustZone {
        self.trust_zone(&self.local_node)
    }

    // ========================================================================
    // Predicates
    // ========================================================================

    /// General data-flow gate.
    ///
    /// Equal zones and downward flows are always fine. A zone-0 request
    /// may not target zone 2 directly - it must be mediated by zone 1.
    /// Every other single upward hop is allowed; the caller is expected to
    /// sanitize appropriately for the trust gap.
    pub fn can_access(&self, from: TrustZone, to: TrustZone) -> Result<()> {
        if from >= to {
            return Ok(());
        }
        if from == TrustZone::Hostile && to == TrustZone::Core {
            return Err(Error::ZoneViolation { from, to });
        }
        Ok(())
    }

    /// Registry visibility gate: a resolver only sees entries owned by
    /// zones no more trusted than itself. Stricter than `can_access`.
    pub fn can_resolve(&self, from: TrustZone, entry_zone: TrustZone) -> bool {
        from >= entry_zone
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Record or replace a node's classification.
    pub fn register_node(&self, node: impl Into<String>, zone: TrustZone, apps: Vec<String>) {
        let node = node.into();
        debug!(node = %node, %zone, "node registered in zone directory");
        self.nodes.write().insert(
            node.clone(),
            ZoneInfo {
                node_id: node,
                zone,
                apps,
            },
        );
    }

    /// A node connected. Known nodes keep their assignment; a node never
    /// seen before is auto-registered hostile - the fail-closed default.
    pub fn node_connected(&self, node: &str) {
        if !self.enabled {
            debug!(node, "node connected (zones disabled)");
            return;
        }
        let mut nodes = self.nodes.write();
        if nodes.contains_key(node) {
            debug!(node, "known node connected");
            return;
        }
        warn!(node, "unknown node connected; auto-registering at zone 0");
        nodes.insert(
            node.to_string(),
            ZoneInfo {
                node_id: node.to_string(),
                zone: TrustZone::Hostile,
                apps: Vec::new(),
            },
        );
    }

    /// A node disconnected; drop its entry.
    pub fn node_disconnected(&self, node: &str) {
        if self.nodes.write().remove(node).is_some() {
            info!(node, "node removed from zone directory");
        }
    }

    pub fn list_nodes(&self) -> Vec<ZoneInfo> {
        let mut nodes: Vec<ZoneInfo> = self.nodes.read().values().cloned().collect();
        nodes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        nodes
    }

    pub fn nodes_in_zone(&self, zone: TrustZone) -> Vec<String> {
        let mut nodes: Vec<String> = self
            .nodes
            .read()
            .values()
            .filter(|info| info.zone == zone)
            .map(|info| info.node_id.clone())
            .collect();
        nodes.sort();
        nodes
    }
}

//! Peer discovery - group membership for registries
//!
//! A `PeerDirectory` answers "which registries can I reach right now" and
//! streams join/leave events so the cluster layer can keep the zone
//! directory and the remote cache honest. `StaticPeerGroup` is the
//! in-process implementation used by tests and single-process topologies;
//! real deployments back the trait with their membership substrate.

use crate::transport::PeerTransport;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

const PEER_EVENT_CAPACITY: usize = 64;

// ============================================================================
// PeerInfo / PeerEvent
// ============================================================================

/// A reachable peer registry.
#[derive(Clone)]
pub struct PeerInfo {
    pub node_id: String,
    pub transport: Arc<dyn PeerTransport>,
}

impl PeerInfo {
    pub fn new(node_id: impl Into<String>, transport: Arc<dyn PeerTransport>) -> Self {
        Self {
            node_id: node_id.into(),
            transport,
        }
    }
}

impl std::fmt::Debug for PeerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerInfo")
            .field("node_id", &self.node_id)
            .finish_non_exhaustive()
    }
}

/// Membership change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PeerEvent {
    Joined { node_id: String },
    Left { node_id: String },
}

// ============================================================================
// PeerDirectory
// ============================================================================

/// Group-membership view over peer registries.
#[async_trait]
pub trait PeerDirectory: Send + Sync {
    /// Currently known peers.
    async fn peers(&self) -> Vec<PeerInfo>;

    /// Locate one peer by node id.
    async fn find(&self, node_id: &str) -> Option<PeerInfo> {
        self.peers()
            .await
            .into_iter()
            .find(|peer| peer.node_id == node_id)
    }

    /// Subscribe to join/leave events.
    fn subscribe(&self) -> broadcast::Receiver<PeerEvent>;
}

// ============================================================================
// StaticPeerGroup
// ============================================================================

/// Programmatically managed membership.
pub struct StaticPeerGroup {
    peers: RwLock<HashMap<String, PeerInfo>>,
    events: broadcast::Sender<PeerEvent>,
}

impl StaticPeerGroup {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(PEER_EVENT_CAPACITY);
        Self {
            peers: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Add a peer and announce the join.
    pub fn join(&self, peer: PeerInfo) {
        let node_id = peer.node_id.clone();
        info!(node = %node_id, "peer joined the group");
        self.peers.write().insert(node_id.clone(), peer);
        let _ = self.events.send(PeerEvent::Joined { node_id });
    }

    /// Remove a peer and announce the departure.
    pub fn leave(&self, node_id: &str) {
        if self.peers.write().remove(node_id).is_some() {
            info!(node = node_id, "peer left the group");
            let _ = self.events.send(PeerEvent::Left {
                node_id: node_id.to_string(),
            });
        } else {
            debug!(node = node_id, "leave for unknown peer ignored");
        }
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

impl Default for StaticPeerGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PeerDirectory for StaticPeerGroup {
    async fn peers(&self) -> Vec<PeerInfo> {
        let mut peers: Vec<PeerInfo> = self.peers.read().values().cloned().collect();
        peers.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        peers
    }

    fn subscribe(&self) -> broadcast::Receiver<PeerEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackTransport;
    use latt_registry::Registry;

    fn peer(node_id: &str) -> PeerInfo {
        PeerInfo::new(
            node_id,
            Arc::new(LoopbackTransport::new(node_id, Registry::new())),
        )
    }

    #[tokio::test]
    async fn test_join_find_leave() {
        let group = StaticPeerGroup::new();
        assert!(group.is_empty());

        group.join(peer("node_b"));
        group.join(peer("node_a"));
        assert_eq!(group.len(), 2);

        let listed = group.peers().await;
        let names: Vec<&str> = listed.iter().map(|p| p.node_id.as_str()).collect();
        assert_eq!(names, vec!["node_a", "node_b"]);

        assert!(group.find("node_b").await.is_some());
        group.leave("node_b");
        assert!(group.find("node_b").await.is_none());
    }

    #[tokio::test]
    async fn test_membership_events() {
        let group = StaticPeerGroup::new();
        let mut events = group.subscribe();

        group.join(peer("node_b"));
        group.leave("node_b");
        // Leaves for unknown peers emit nothing.
        group.leave("node_b");

        assert!(matches!(
            events.recv().await.unwrap(),
            PeerEvent::Joined { node_id } if node_id == "node_b"
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            PeerEvent::Left { node_id } if node_id == "node_b"
        ));
        assert!(events.try_recv().is_err());
    }
}

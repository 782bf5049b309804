//! Cluster registry - zone-gated cross-node resolution
//!
//! Wraps one local registry with the zone directory, the peer directory and
//! the remote cache. Local reads stay exactly as cheap as they were; only a
//! local miss with a cross-node target brings the cluster machinery in.

use crate::cache::RemoteCache;
use crate::discovery::{PeerDirectory, PeerEvent};
use crate::transport::RemoteHandler;
use crate::zone::ZoneDirectory;
use latt_foundation::{ClusterConfig, Error, Handler, Result};
use latt_registry::Registry;
use serde_json::Value;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{debug, info};

// ============================================================================
// ResolveTarget / Resolution
// ============================================================================

/// Where a resolution is allowed to look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveTarget {
    /// Local registry only.
    Local,

    /// Local first, then any zone-eligible peer.
    Any,

    /// Local if the id matches, otherwise exactly this peer.
    Node(String),
}

impl ResolveTarget {
    pub fn node(id: impl Into<String>) -> Self {
        Self::Node(id.into())
    }
}

/// A successful resolution, local or remote.
#[derive(Clone)]
pub enum Resolution {
    Local(Arc<dyn Handler>),
    Remote {
        node: String,
        handler: Arc<RemoteHandler>,
    },
}

impl Resolution {
    /// The handler, uniform over where it lives.
    pub fn handler(&self) -> Arc<dyn Handler> {
        match self {
            Self::Local(handler) => Arc::clone(handler),
            Self::Remote { handler, .. } => Arc::clone(handler) as Arc<dyn Handler>,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// Source node for remote resolutions.
    pub fn source_node(&self) -> Option<&str> {
        match self {
            Self::Local(_) => None,
            Self::Remote { node, .. } => Some(node),
        }
    }
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(_) => f.write_str("Resolution::Local"),
            Self::Remote { node, .. } => write!(f, "Resolution::Remote({})", node),
        }
    }
}

// ============================================================================
// ClusterRegistry
// ============================================================================

/// One node's registry plus its view of the deployment.
pub struct ClusterRegistry {
    local: Registry,
    zones: Arc<ZoneDirectory>,
    peers: Arc<dyn PeerDirectory>,
    cache: RemoteCache,
    config: ClusterConfig,
}

impl ClusterRegistry {
    /// Assemble a cluster registry and start its membership watcher.
    pub fn new(
        local: Registry,
        zones: Arc<ZoneDirectory>,
        peers: Arc<dyn PeerDirectory>,
        config: ClusterConfig,
    ) -> Arc<Self> {
        let this = Arc::new(Self {
            cache: RemoteCache::new(config.remote_cache_ttl),
            local,
            zones,
            peers,
            config,
        });
        this.spawn_watcher();
        this
    }

    pub fn local(&self) -> &Registry {
        &self.local
    }

    pub fn zones(&self) -> &ZoneDirectory {
        &self.zones
    }

    pub fn local_node(&self) -> &str {
        &self.config.local_node
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve a name against the requested target.
    pub async fn resolve_from(&self, name: &str, target: ResolveTarget) -> Result<Resolution> {
        match target {
            ResolveTarget::Local => Ok(Resolution::Local(self.local.resolve(name)?)),
            ResolveTarget::Any => self.resolve_any(name).await,
            ResolveTarget::Node(node) => self.resolve_on(name, &node).await,
        }
    }

    async fn resolve_any(&self, name: &str) -> Result<Resolution> {
        match self.local.resolve(name) {
            Ok(handler) => return Ok(Resolution::Local(handler)),
            // Only a definitive "never registered" falls through to peers;
            // a registered-but-unloaded entry is a local answer.
            Err(Error::NotFound(_)) => {}
            Err(err) => return Err(err),
        }

        // Single-node/dev deployments degrade to pure local resolution.
        if self.zones.zones_disabled() {
            return Err(Error::NotFound(name.to_string()));
        }

        if let Some(handler) = self.cache.get(name, None) {
            return Ok(Resolution::Remote {
                node: handler.node().to_string(),
                handler,
            });
        }

        let local_zone = self.zones.local_zone();
        let mut eligible = 0usize;
        let mut answered = 0usize;

        for peer in self.peers.peers().await {
            if peer.node_id == self.config.local_node {
                continue;
            }
            let peer_zone = self.zones.trust_zone(&peer.node_id);
            if !self.zones.can_resolve(local_zone, peer_zone) {
                debug!(
                    peer = %peer.node_id,
                    %local_zone,
                    %peer_zone,
                    "peer skipped by zone gate"
                );
                continue;
            }
            eligible += 1;

            match tokio::time::timeout(
                self.config.peer_resolve_timeout,
                peer.transport.resolve(name),
            )
            .await
            {
                Ok(Ok(true)) => {
                    let handler = Arc::new(RemoteHandler::new(
                        name,
                        &peer.node_id,
                        Arc::clone(&peer.transport),
                    ));
                    self.cache.insert(name, None, Arc::clone(&handler));
                    info!(entry = name, peer = %peer.node_id, "resolved on peer");
                    return Ok(Resolution::Remote {
                        node: peer.node_id.clone(),
                        handler,
                    });
                }
                Ok(Ok(false)) => {
                    answered += 1;
                }
                Ok(Err(err)) => {
                    debug!(peer = %peer.node_id, error = %err, "peer resolution failed");
                }
                Err(_) => {
                    debug!(peer = %peer.node_id, "peer resolution timed out");
                }
            }
        }

        if eligible > 0 && answered == 0 {
            Err(Error::RemoteUnavailable(name.to_string()))
        } else {
            Err(Error::NotFound(name.to_string()))
        }
    }

    async fn resolve_on(&self, name: &str, node: &str) -> Result<Resolution> {
        if node == self.config.local_node {
            return Ok(Resolution::Local(self.local.resolve(name)?));
        }

        let local_zone = self.zones.local_zone();
        let target_zone = self.zones.trust_zone(node);
        if !self.zones.can_resolve(local_zone, target_zone) {
            return Err(Error::ZoneViolation {
                from: local_zone,
                to: target_zone,
            });
        }

        if let Some(handler) = self.cache.get(name, Some(node)) {
            return Ok(Resolution::Remote {
                node: node.to_string(),
                handler,
            });
        }

        let Some(peer) = self.peers.find(node).await else {
            return Err(Error::NodeNotFound(node.to_string()));
        };

        match tokio::time::timeout(
            self.config.peer_resolve_timeout,
            peer.transport.resolve(name),
        )
        .await
        {
            Ok(Ok(true)) => {
                let handler = Arc::new(RemoteHandler::new(name, node, Arc::clone(&peer.transport)));
                self.cache.insert(name, Some(node), Arc::clone(&handler));
                Ok(Resolution::Remote {
                    node: node.to_string(),
                    handler,
                })
            }
            Ok(Ok(false)) => Err(Error::NotFound(name.to_string())),
            Ok(Err(err)) => {
                debug!(peer = node, error = %err, "targeted resolution failed");
                Err(Error::RemoteUnavailable(name.to_string()))
            }
            Err(_) => Err(Error::RemoteUnavailable(name.to_string())),
        }
    }

    // ========================================================================
    // Remote invocation
    // ========================================================================

    /// Resolve `name` on `node` and invoke `function(args)` against it.
    ///
    /// The invocation is timeout-bounded; transport failures and remote
    /// exceptions come back as `RemoteCallFailed`, never as a hang or a
    /// crash of the calling registry.
    pub async fn call_remote(
        &self,
        name: &str,
        node: &str,
        function: &str,
        args: Value,
    ) -> Result<Value> {
        let resolution = self
            .resolve_from(name, ResolveTarget::node(node))
            .await?;
        let handler = resolution.handler();

        match tokio::time::timeout(
            self.config.remote_call_timeout,
            handler.invoke(function, args),
        )
        .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(Error::remote_call_failed(err.to_string())),
            Err(_) => Err(Error::remote_call_failed(format!(
                "timeout after {:?}",
                self.config.remote_call_timeout
            ))),
        }
    }

    // ========================================================================
    // Membership watcher
    // ========================================================================

    /// Keep the zone directory and remote cache in step with the peer
    /// group. Joined unknown nodes land in zone 0; departed nodes lose
    /// their cache entries.
    fn spawn_watcher(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let mut events = self.peers.subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(this) = weak.upgrade() else { break };
                        this.handle_peer_event(event);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "membership watcher lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    fn handle_peer_event(&self, event: PeerEvent) {
        match event {
            PeerEvent::Joined { node_id } => {
                self.zones.node_connected(&node_id);
            }
            PeerEvent::Left { node_id } => {
                self.zones.node_disconnected(&node_id);
                self.cache.purge_node(&node_id);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &RemoteCache {
        &self.cache
    }
}

impl std::fmt::Debug for ClusterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterRegistry")
            .field("local_node", &self.config.local_node)
            .field("zones_disabled", &self.zones.zones_disabled())
            .finish_non_exhaustive()
    }
}

//! Remote cache - TTL-bounded memory of successful remote resolutions
//!
//! Keyed by `(name)` for any-node resolutions and `(name, node)` for
//! targeted ones. Written from whatever task completed the lookup;
//! last-writer-wins per key. Entries die by expiry or when their source
//! node leaves the peer group.

use crate::transport::RemoteHandler;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    name: String,
    node: Option<String>,
}

struct CachedResolution {
    handler: Arc<RemoteHandler>,
    source_node: String,
    expires_at: Instant,
}

/// TTL cache of resolved remote handlers.
pub struct RemoteCache {
    entries: DashMap<CacheKey, CachedResolution>,
    ttl: Duration,
}

impl RemoteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Fetch a live cached resolution; expired entries are dropped on the
    /// way out.
    pub fn get(&self, name: &str, node: Option<&str>) -> Option<Arc<RemoteHandler>> {
        let key = CacheKey {
            name: name.to_string(),
            node: node.map(str::to_string),
        };

        match self.entries.get(&key) {
            None => return None,
            Some(cached) if cached.expires_at > Instant::now() => {
                trace!(name, source = %cached.source_node, "remote cache hit");
                return Some(Arc::clone(&cached.handler));
            }
            Some(_) => {}
        }

        self.entries.remove(&key);
        trace!(name, "remote cache entry expired");
        None
    }

    /// Record a successful resolution. Last writer wins per key.
    pub fn insert(&self, name: &str, node: Option<&str>, handler: Arc<RemoteHandler>) {
        let source_node = handler.node().to_string();
        let key = CacheKey {
            name: name.to_string(),
            node: node.map(str::to_string),
        };
        trace!(name, source = %source_node, "remote resolution cached");
        self.entries.insert(
            key,
            CachedResolution {
                handler,
                source_node,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop everything resolved through `node`; called when the node
    /// leaves the peer group. Returns how many entries went.
    pub fn purge_node(&self, node: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, cached| cached.source_node != node);
        let purged = before - self.entries.len();
        if purged > 0 {
            debug!(node, purged, "purged remote cache entries for departed node");
        }
        purged
    }

    /// Sweep expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, cached| cached.expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{LoopbackTransport, PeerTransport};
    use latt_registry::Registry;

    fn remote_handler(name: &str, node: &str) -> Arc<RemoteHandler> {
        let transport: Arc<dyn PeerTransport> =
            Arc::new(LoopbackTransport::new(node, Registry::new()));
        Arc::new(RemoteHandler::new(name, node, transport))
    }

    #[tokio::test]
    async fn test_keyed_by_name_and_node() {
        let cache = RemoteCache::new(Duration::from_secs(30));
        cache.insert("llm", None, remote_handler("llm", "node_b"));
        cache.insert("llm", Some("node_c"), remote_handler("llm", "node_c"));

        assert_eq!(cache.get("llm", None).unwrap().node(), "node_b");
        assert_eq!(cache.get("llm", Some("node_c")).unwrap().node(), "node_c");
        assert!(cache.get("llm", Some("node_b")).is_none());
        assert!(cache.get("other", None).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let cache = RemoteCache::new(Duration::from_secs(30));
        cache.insert("llm", None, remote_handler("llm", "node_b"));
        assert!(cache.get("llm", None).is_some());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cache.get("llm", None).is_none());
        // Expired entry was dropped, not just hidden.
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_sweep() {
        let cache = RemoteCache::new(Duration::from_secs(30));
        cache.insert("a", None, remote_handler("a", "node_b"));
        tokio::time::advance(Duration::from_secs(20)).await;
        cache.insert("b", None, remote_handler("b", "node_b"));

        tokio::time::advance(Duration::from_secs(15)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.get("b", None).is_some());
    }

    #[tokio::test]
    async fn test_purge_node() {
        let cache = RemoteCache::new(Duration::from_secs(30));
        cache.insert("a", None, remote_handler("a", "node_b"));
        cache.insert("b", Some("node_b"), remote_handler("b", "node_b"));
        cache.insert("c", None, remote_handler("c", "node_c"));

        assert_eq!(cache.purge_node("node_b"), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("c", None).is_some());
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let cache = RemoteCache::new(Duration::from_secs(30));
        cache.insert("llm", None, remote_handler("llm", "node_b"));
        cache.insert("llm", None, remote_handler("llm", "node_c"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("llm", None).unwrap().node(), "node_c");
    }
}

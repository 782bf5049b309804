//! Peer transport - the assumed remote-invocation primitive
//!
//! The registry does not define a wire protocol. It assumes "resolve name
//! on node N" and "invoke function F with args A on a handler resolved on
//! node N" primitives exist; this trait is that seam. Deployments plug in
//! whatever carrier they run on. `LoopbackTransport` wires a peer to an
//! in-process registry, which is also how the cluster tests run multi-node
//! topologies in one process.

use async_trait::async_trait;
use latt_foundation::{Handler, Result};
use latt_registry::Registry;
use serde_json::Value;
use std::sync::Arc;

// ============================================================================
// PeerTransport
// ============================================================================

/// Carrier for registry queries against one peer node.
///
/// Implementations must return errors rather than hang: the cluster layer
/// wraps every call in a timeout and converts failures to typed results.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Node this transport reaches.
    fn node_id(&self) -> &str;

    /// Whether the peer's registry can resolve `name`.
    async fn resolve(&self, name: &str) -> Result<bool>;

    /// Invoke `function(args)` on the handler registered under `name` on
    /// the peer.
    async fn invoke(&self, name: &str, function: &str, args: Value) -> Result<Value>;
}

// ============================================================================
// LoopbackTransport
// ============================================================================

/// Transport to a registry living in the same process.
pub struct LoopbackTransport {
    node_id: String,
    registry: Registry,
}

impl LoopbackTransport {
    pub fn new(node_id: impl Into<String>, registry: Registry) -> Self {
        Self {
            node_id: node_id.into(),
            registry,
        }
    }
}

#[async_trait]
impl PeerTransport for LoopbackTransport {
    fn node_id(&self) -> &str {
        &self.node_id
    }

    async fn resolve(&self, name: &str) -> Result<bool> {
        Ok(self.registry.resolve(name).is_ok())
    }

    async fn invoke(&self, name: &str, function: &str, args: Value) -> Result<Value> {
        let handler = self.registry.resolve(name)?;
        handler.invoke(function, args).await
    }
}

// ============================================================================
// RemoteHandler
// ============================================================================

/// Proxy handler produced by a successful remote resolution.
///
/// Implements `Handler` by delegating every invocation over the peer
/// transport, so local and remote resolutions hand callers the same type.
pub struct RemoteHandler {
    name: String,
    node: String,
    transport: Arc<dyn PeerTransport>,
}

impl RemoteHandler {
    pub fn new(
        name: impl Into<String>,
        node: impl Into<String>,
        transport: Arc<dyn PeerTransport>,
    ) -> Self {
        Self {
            name: name.into(),
            node: node.into(),
            transport,
        }
    }

    /// Entry name on the remote registry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node the entry was resolved on.
    pub fn node(&self) -> &str {
        &self.node
    }
}

#[async_trait]
impl Handler for RemoteHandler {
    async fn invoke(&self, function: &str, args: Value) -> Result<Value> {
        self.transport.invoke(&self.name, function, args).await
    }
}

impl std::fmt::Debug for RemoteHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteHandler")
            .field("name", &self.name)
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latt_foundation::Error;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl Handler for EchoHandler {
        async fn invoke(&self, function: &str, args: Value) -> Result<Value> {
            Ok(json!({ "function": function, "args": args }))
        }
    }

    #[tokio::test]
    async fn test_loopback_resolve() {
        let registry = Registry::new();
        registry
            .register_simple("llm", Arc::new(EchoHandler))
            .await
            .unwrap();

        let transport = LoopbackTransport::new("node_b", registry);
        assert!(transport.resolve("llm").await.unwrap());
        assert!(!transport.resolve("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_loopback_invoke() {
        let registry = Registry::new();
        registry
            .register_simple("llm", Arc::new(EchoHandler))
            .await
            .unwrap();

        let transport = LoopbackTransport::new("node_b", registry);
        let out = transport.invoke("llm", "complete", json!(1)).await.unwrap();
        assert_eq!(out, json!({ "function": "complete", "args": 1 }));

        let err = transport
            .invoke("missing", "complete", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remote_handler_delegates() {
        let registry = Registry::new();
        registry
            .register_simple("llm", Arc::new(EchoHandler))
            .await
            .unwrap();

        let transport: Arc<dyn PeerTransport> =
            Arc::new(LoopbackTransport::new("node_b", registry));
        let remote = RemoteHandler::new("llm", "node_b", transport);

        assert_eq!(remote.node(), "node_b");
        let out = remote.invoke("complete", json!("hi")).await.unwrap();
        assert_eq!(out, json!({ "function": "complete", "args": "hi" }));
    }
}

//! Handler contract
//!
//! A handler is the executable side of a registry entry: an opaque piece of
//! code the registry dispatches to by name. The registry never interprets a
//! handler beyond this trait; action dispatchers, compute backends and write
//! sinks all register through the same surface.

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Open key-value bag attached to an entry at registration time.
///
/// Describes capabilities to callers; the registry itself never reads it.
pub type Metadata = HashMap<String, Value>;

/// Executable code behind a registry entry.
///
/// Implemented by the subsystems that register themselves (Layer3+ in a
/// full deployment); the registry only stores and dispatches.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Invoke a named function on this handler.
    ///
    /// # Arguments
    /// * `function` - function selector within the handler
    /// * `args` - JSON-encoded arguments
    async fn invoke(&self, function: &str, args: Value) -> Result<Value>;

    /// Whether the backing code is currently loadable.
    ///
    /// Entries whose handler reports `false` resolve to `ModuleNotLoaded`
    /// and are excluded from the snapshot cache.
    fn is_loaded(&self) -> bool {
        true
    }

    /// Optional availability probe consulted by `list_available`.
    ///
    /// `None` means the handler exposes no probe and counts as available.
    /// A panic inside the probe is treated as unavailable by the caller,
    /// never propagated.
    fn availability(&self) -> Option<bool> {
        None
    }

    /// Behaviour interfaces this handler implements.
    ///
    /// Checked once at registration when the registry is configured with a
    /// required capability; non-conforming handlers are rejected there
    /// rather than at call time.
    fn capabilities(&self) -> Vec<&'static str> {
        Vec::new()
    }
}

/// True when `handler` satisfies `behaviour`.
pub fn implements(handler: &dyn Handler, behaviour: &str) -> bool {
    handler.capabilities().iter().any(|c| *c == behaviour)
}

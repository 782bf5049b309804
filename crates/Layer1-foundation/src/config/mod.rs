//! Configuration for the registry stack
//!
//! Plain serde structs with defaulting functions; loadable from TOML.
//! One `LatticeConfig` per node covers the local registry, the cluster
//! client and the zone directory.

use crate::error::{Error, Result};
use crate::zone::TrustZone;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// RegistryConfig
// ============================================================================

/// Per-registry behavior knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Failure threshold at which `resolve_stable` reports `Unstable`
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,

    /// Allow re-registering an existing (non-core) name
    #[serde(default)]
    pub allow_overwrite: bool,

    /// Behaviour every registered handler must implement, if set
    #[serde(default)]
    pub required_capability: Option<String>,

    /// Timeout for calls into the registry actor
    #[serde(default = "default_call_timeout")]
    pub call_timeout: Duration,

    /// How long the caretaker holds the entry store after an actor crash
    #[serde(default = "default_caretaker_hold")]
    pub caretaker_hold: Duration,
}

fn default_max_failures() -> u32 {
    5
}

fn default_call_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_caretaker_hold() -> Duration {
    Duration::from_secs(60)
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_failures: default_max_failures(),
            allow_overwrite: false,
            required_capability: None,
            call_timeout: default_call_timeout(),
            caretaker_hold: default_caretaker_hold(),
        }
    }
}

impl RegistryConfig {
    pub fn with_max_failures(mut self, max: u32) -> Self {
        self.max_failures = max;
        self
    }

    pub fn with_overwrite(mut self, allow: bool) -> Self {
        self.allow_overwrite = allow;
        self
    }

    pub fn with_required_capability(mut self, behaviour: impl Into<String>) -> Self {
        self.required_capability = Some(behaviour.into());
        self
    }
}

// ============================================================================
// ClusterConfig
// ============================================================================

/// Cross-node resolution knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Identifier of the local node
    #[serde(default = "default_local_node")]
    pub local_node: String,

    /// TTL for cached remote resolutions
    #[serde(default = "default_remote_cache_ttl")]
    pub remote_cache_ttl: Duration,

    /// Upper bound on a remote invocation
    #[serde(default = "default_remote_call_timeout")]
    pub remote_call_timeout: Duration,

    /// Upper bound on a single peer resolution query
    #[serde(default = "default_peer_resolve_timeout")]
    pub peer_resolve_timeout: Duration,
}

fn default_local_node() -> String {
    "local".to_string()
}

fn default_remote_cache_ttl() -> Duration {
    Duration::from_secs(30)
}

fn default_remote_call_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_peer_resolve_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            local_node: default_local_node(),
            remote_cache_ttl: default_remote_cache_ttl(),
            remote_call_timeout: default_remote_call_timeout(),
            peer_resolve_timeout: default_peer_resolve_timeout(),
        }
    }
}

// ============================================================================
// ZonesConfig
// ============================================================================

/// Static zone assignment for one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeZoneConfig {
    /// Trust tier (0 hostile, 1 worker, 2 core)
    pub zone: TrustZone,

    /// Diagnostic list of applications expected on the node
    #[serde(default)]
    pub apps: Vec<String>,
}

/// Zone directory configuration.
///
/// Disabled means single-node/dev operation: every node is treated as
/// fully trusted and cross-node resolution is not attempted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZonesConfig {
    /// Whether trust zones are enforced
    #[serde(default)]
    pub enabled: bool,

    /// Static node -> zone assignments
    #[serde(default)]
    pub nodes: HashMap<String, NodeZoneConfig>,
}

impl ZonesConfig {
    /// Zones enabled with the given static assignments.
    pub fn enabled_with(nodes: HashMap<String, NodeZoneConfig>) -> Self {
        Self {
            enabled: true,
            nodes,
        }
    }
}

// ============================================================================
// LatticeConfig
// ============================================================================

/// Top-level configuration for one node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatticeConfig {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub cluster: ClusterConfig,

    #[serde(default)]
    pub zones: ZonesConfig,
}

impl LatticeConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a TOML file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.max_failures, 5);
        assert!(!config.allow_overwrite);
        assert_eq!(config.call_timeout, Duration::from_secs(5));
        assert_eq!(config.caretaker_hold, Duration::from_secs(60));
    }

    #[test]
    fn test_cluster_defaults() {
        let config = ClusterConfig::default();
        assert_eq!(config.remote_cache_ttl, Duration::from_secs(30));
        assert_eq!(config.remote_call_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_from_toml() {
        let config = LatticeConfig::from_toml_str(
            r#"
            [registry]
            max_failures = 3
            allow_overwrite = true

            [cluster]
            local_node = "node_a"

            [zones]
            enabled = true

            [zones.nodes.node_b]
            zone = 1
            apps = ["worker"]
            "#,
        )
        .unwrap();

        assert_eq!(config.registry.max_failures, 3);
        assert!(config.registry.allow_overwrite);
        assert_eq!(config.cluster.local_node, "node_a");
        assert!(config.zones.enabled);
        assert_eq!(config.zones.nodes["node_b"].zone, TrustZone::Worker);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = LatticeConfig::from_toml_str("registry = 12").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lattice.toml");
        std::fs::write(&path, "[registry]\nmax_failures = 7\n").unwrap();

        let config = LatticeConfig::load(&path).unwrap();
        assert_eq!(config.registry.max_failures, 7);

        let err = LatticeConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

//! Error types for LatticeCode
//!
//! Every public path in the registry stack returns these as typed results.
//! A caller misusing the registry gets an explicit error, not a crash.

use crate::zone::TrustZone;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// LatticeCode error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ========================================================================
    // Resolution
    // ========================================================================
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Entry '{0}' is registered but its handler is not loaded")]
    ModuleNotLoaded(String),

    #[error("Entry '{0}' exceeded its failure threshold")]
    Unstable(String),

    // ========================================================================
    // Registration / sovereignty
    // ========================================================================
    #[error("Entry already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Entry '{0}' is a locked core entry")]
    CoreLocked(String),

    #[error("Registry is locked; plugin name '{0}' must contain a namespace separator")]
    PluginNamespaceRequired(String),

    #[error("Handler for '{name}' does not implement required behaviour '{behaviour}'")]
    MissingBehaviour { name: String, behaviour: String },

    // ========================================================================
    // Cluster / remote
    // ========================================================================
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("No peer could be reached for '{0}'")]
    RemoteUnavailable(String),

    #[error("Remote call failed: {reason}")]
    RemoteCallFailed { reason: String },

    #[error("Zone violation: {from} may not reach {to} directly")]
    ZoneViolation { from: TrustZone, to: TrustZone },

    // ========================================================================
    // Infrastructure
    // ========================================================================
    #[error("Registry actor unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for errors a caller can retry after the cluster state settles
    /// (transport trouble, actor restart in flight).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::RemoteUnavailable(_)
                | Error::RemoteCallFailed { .. }
                | Error::RegistryUnavailable(_)
        )
    }

    /// Convenience constructor for remote failures carrying a reason.
    pub fn remote_call_failed(reason: impl Into<String>) -> Self {
        Error::RemoteCallFailed {
            reason: reason.into(),
        }
    }
}

//! # LatticeCode Foundation Layer
//!
//! Shared contracts for the handler registry stack. Nothing in this layer
//! runs a task or owns state; it defines what the upper layers agree on.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Layer2-cluster                                             │
//! │  ├── ZoneDirectory / PeerDirectory / PeerTransport          │
//! │  └── ClusterRegistry (cross-node resolve, call_remote)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Layer2-registry                                            │
//! │  ├── EntryStore + SnapshotCache (lock-free reads)           │
//! │  ├── RegistryActor + Caretaker (serialized writes)          │
//! │  └── Registry facade                                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Layer1-foundation (this layer)                             │
//! │  ├── Error taxonomy (typed results, never panics)           │
//! │  ├── Handler trait (invoke, loadedness, availability)       │
//! │  ├── TrustZone (0 hostile / 1 worker / 2 core)              │
//! │  └── Config structs (registry, cluster, zones)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod zone;

pub use config::{ClusterConfig, LatticeConfig, NodeZoneConfig, RegistryConfig, ZonesConfig};
pub use error::{Error, Result};
pub use handler::{Handler, Metadata};
pub use zone::TrustZone;

//! # LatticeCode Cluster Layer
//!
//! Cross-node resolution for the handler registry: trust-zone gating, peer
//! discovery, a TTL-bounded remote cache, and timeout-bounded remote
//! invocation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ClusterRegistry                                            │
//! │  ├── resolve_from(name, Local | Any | Node)                 │
//! │  └── call_remote(name, node, function, args)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ZoneDirectory ── can_resolve gates every peer query        │
//! │  PeerDirectory ── membership + join/leave events            │
//! │  RemoteCache ──── (name) / (name, node) -> handler, TTL     │
//! │  PeerTransport ── the assumed remote-invocation primitive   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A local miss with a cross-node target walks the zone-eligible peers in
//! order, caches the first success, and hands back a `RemoteHandler` that
//! looks exactly like a local one. Every remote path degrades to a typed
//! error rather than blocking or crashing the caller.

mod cache;
mod discovery;
mod node;
mod transport;
mod zone;

pub use cache::RemoteCache;
pub use discovery::{PeerDirectory, PeerEvent, PeerInfo, StaticPeerGroup};
pub use node::{ClusterRegistry, Resolution, ResolveTarget};
pub use transport::{LoopbackTransport, PeerTransport, RemoteHandler};
pub use zone::{ZoneDirectory, ZoneInfo};

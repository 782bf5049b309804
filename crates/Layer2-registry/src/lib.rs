//! # LatticeCode Handler Registry
//!
//! The backbone by which independently-developed subsystems (action
//! dispatchers, compute backends, write sinks) register named handlers and
//! resolve them at call time.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Registry (facade)                                          │
//! │  ├── reads: resolve / list_* ── lock-free ──┐               │
//! │  └── writes: register / lock / failures ──┐ │               │
//! ├───────────────────────────────────────────┼─┼───────────────┤
//! │  RegistryActor (FIFO mutation loop)  <────┘ │               │
//! │  ├── validates sovereignty / namespace /    │               │
//! │  │   overwrite / capability                 │               │
//! │  └── maintains SnapshotCache                │               │
//! ├─────────────────────────────────────────────┼───────────────┤
//! │  SnapshotCache (atomic swap, locked only)  <┤               │
//! │  EntryStore (concurrent map)               <┘               │
//! │  Caretaker (holds the store across actor crashes)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two-phase lifecycle: an unrestricted bootstrap phase where foundational
//! handlers claim flat names, then `lock_core()` freezes them and every
//! later registration must self-namespace (`"my_plugin.thing"`).
//!
//! ## Usage
//!
//! ```ignore
//! use latt_registry::Registry;
//!
//! let registry = Registry::new();
//! registry.register_simple("llm", Arc::new(LlmHandler)).await?;
//! registry.lock_core().await?;
//!
//! let handler = registry.resolve("llm")?;
//! let out = handler.invoke("complete", args).await?;
//! ```

mod actor;
mod backup;
mod caretaker;
mod entry;
mod event;
mod registry;
mod snapshot;
mod store;
mod supervisor;

pub use backup::RegistryBackup;
pub use entry::{EntryInfo, RegistryEntry, ResolvedEntry};
pub use event::RegistryEvent;
pub use registry::{default_registry, Registry, RegistryStats};
pub use store::NAMESPACE_SEPARATOR;

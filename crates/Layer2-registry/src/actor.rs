//! Registry Actor - the single serialization point for mutations
//!
//! One actor task per registry instance drains a command channel in strict
//! FIFO order; no two mutations interleave. Reads never come through here -
//! they hit the store or the snapshot cache directly.

use crate::backup::RegistryBackup;
use crate::caretaker::CaretakerHandle;
use crate::event::RegistryEvent;
use crate::snapshot::SnapshotCache;
use crate::store::EntryStore;
use latt_foundation::{Handler, Metadata, Result};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

/// Mutations accepted by the actor. Every command carries its reply slot.
pub(crate) enum Command {
    Register {
        name: String,
        handler: Arc<dyn Handler>,
        metadata: Metadata,
        reply: oneshot::Sender<Result<()>>,
    },
    Deregister {
        name: String,
        reply: oneshot::Sender<Result<()>>,
    },
    LockCore {
        reply: oneshot::Sender<Result<usize>>,
    },
    RecordFailure {
        name: String,
        reply: oneshot::Sender<Result<u32>>,
    },
    ResetFailures {
        name: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Restore {
        backup: RegistryBackup,
        reply: oneshot::Sender<Result<usize>>,
    },
    Reset {
        reply: oneshot::Sender<Result<()>>,
    },
    /// Test hook: panic inside the actor loop to exercise the handoff path.
    #[cfg(test)]
    Crash,
}

/// Where a (re)starting actor obtains the entry store.
pub(crate) enum StoreSource {
    /// First boot: the supervisor just created the store.
    Fresh(Arc<EntryStore>),

    /// Restart after a crash: reclaim from the caretaker that inherited it.
    Reclaim {
        caretaker: CaretakerHandle,
        fallback: Arc<EntryStore>,
    },
}

pub(crate) struct RegistryActor {
    source: StoreSource,
    snapshot: Arc<SnapshotCache>,
    events: broadcast::Sender<RegistryEvent>,
    rx: mpsc::Receiver<Command>,
}

impl RegistryActor {
    pub(crate) fn new(
        source: StoreSource,
        snapshot: Arc<SnapshotCache>,
        events: broadcast::Sender<RegistryEvent>,
        rx: mpsc::Receiver<Command>,
    ) -> Self {
        Self {
            source,
            snapshot,
            events,
            rx,
        }
    }

    pub(crate) async fn run(mut self) {
        let store = match self.source {
            StoreSource::Fresh(store) => {
                debug!("registry actor started with a fresh entry store");
                store
            }
            StoreSource::Reclaim {
                caretaker,
                fallback,
            } => match caretaker.reclaim().await {
                Some(store) => {
                    info!(
                        entries = store.len(),
                        "registry actor reclaimed entry store from caretaker"
                    );
                    store
                }
                None => {
                    warn!("caretaker had already released the store; using supervisor copy");
                    fallback
                }
            },
        };

        while let Some(cmd) = self.rx.recv().await {
            Self::handle(&store, &self.snapshot, &self.events, cmd);
        }
        debug!("registry actor stopped");
    }

    fn handle(
        store: &EntryStore,
        snapshot: &SnapshotCache,
        events: &broadcast::Sender<RegistryEvent>,
        cmd: Command,
    ) {
        match cmd {
            Command::Register {
                name,
                handler,
                metadata,
                reply,
            } => {
                let result = store.register(&name, handler, metadata);
                if result.is_ok() {
                    if store.is_locked() {
                        snapshot.rebuild(store);
                    }
                    let _ = events.send(RegistryEvent::Registered { name });
                }
                let _ = reply.send(result);
            }

            Command::Deregister { name, reply } => {
                let result = store.deregister(&name);
                if result.is_ok() {
                    if store.is_locked() {
                        snapshot.rebuild(store);
                    }
                    let _ = events.send(RegistryEvent::Deregistered { name });
                }
                let _ = reply.send(result);
            }

            Command::LockCore { reply } => {
                let stamped = store.lock_core();
                snapshot.rebuild(store);
                let _ = events.send(RegistryEvent::CoreLocked { stamped });
                let _ = reply.send(Ok(stamped));
            }

            Command::RecordFailure { name, reply } => {
                let result = store.record_failure(&name);
                if let Ok(count) = result {
                    // A degraded entry must vanish from the fast path at
                    // once; the rebuild waits until the counter returns to 0.
                    snapshot.invalidate();
                    let _ = events.send(RegistryEvent::FailureRecorded { name, count });
                }
                let _ = reply.send(result);
            }

            Command::ResetFailures { name, reply } => {
                let result = store.reset_failures(&name);
                if result.is_ok() {
                    if store.is_locked() {
                        snapshot.rebuild(store);
                    }
                    let _ = events.send(RegistryEvent::FailuresReset { name });
                }
                let _ = reply.send(result);
            }

            Command::Restore { backup, reply } => {
                let count = store.import(backup);
                if store.is_locked() {
                    snapshot.rebuild(store);
                } else {
                    snapshot.invalidate();
                }
                let _ = events.send(RegistryEvent::Restored { entries: count });
                let _ = reply.send(Ok(count));
            }

            Command::Reset { reply } => {
                store.clear();
                snapshot.invalidate();
                let _ = events.send(RegistryEvent::Cleared);
                let _ = reply.send(Ok(()));
            }

            #[cfg(test)]
            Command::Crash => panic!("crash requested by test"),
        }
    }
}

//! Actor supervision and crash-resilient ownership handoff
//!
//! The entry store lives in a supervisor-owned Arc so its lifetime is
//! decoupled from the actor task. A monitor watches each actor instance
//! through its JoinHandle: a panic hands the store to the standing
//! caretaker and respawns the actor, which reclaims the store and
//! designates a fresh caretaker. The live command sender is published
//! through an atomic swap so callers always reach the current instance.

use crate::actor::{Command, RegistryActor, StoreSource};
use crate::caretaker::CaretakerHandle;
use crate::event::RegistryEvent;
use crate::snapshot::SnapshotCache;
use crate::store::EntryStore;
use arc_swap::ArcSwap;
use latt_foundation::{Error, RegistryConfig, Result};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const COMMAND_CHANNEL_CAPACITY: usize = 64;
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Shared state behind a `Registry` facade.
pub(crate) struct RegistryInner {
    pub(crate) store: Arc<EntryStore>,
    pub(crate) snapshot: Arc<SnapshotCache>,
    pub(crate) events: broadcast::Sender<RegistryEvent>,
    pub(crate) config: RegistryConfig,
    sender: ArcSwap<mpsc::Sender<Command>>,
    caretaker: Mutex<Option<CaretakerHandle>>,
}

impl RegistryInner {
    /// Build the shared state and spawn the first actor instance.
    ///
    /// Must be called within a tokio runtime.
    pub(crate) fn start(config: RegistryConfig) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        // Placeholder sender; replaced before `start` returns.
        let (placeholder, _) = mpsc::channel(1);

        let inner = Arc::new(Self {
            store: Arc::new(EntryStore::new(config.clone())),
            snapshot: Arc::new(SnapshotCache::new()),
            events,
            config,
            sender: ArcSwap::from_pointee(placeholder),
            caretaker: Mutex::new(None),
        });

        spawn_actor(&inner);
        inner
    }

    /// Route a command to the current actor instance, bounded by the
    /// configured call timeout so an unresponsive actor cannot hang the
    /// caller.
    pub(crate) async fn call<T>(
        &self,
        cmd: Command,
        reply: oneshot::Receiver<Result<T>>,
    ) -> Result<T> {
        let tx = self.sender.load_full();
        let exchange = async {
            tx.send(cmd)
                .await
                .map_err(|_| Error::RegistryUnavailable("command channel closed".into()))?;
            reply
                .await
                .map_err(|_| Error::RegistryUnavailable("actor dropped the reply".into()))?
        };

        match tokio::time::timeout(self.config.call_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(Error::RegistryUnavailable(format!(
                "no reply within {:?}",
                self.config.call_timeout
            ))),
        }
    }

    #[cfg(test)]
    pub(crate) async fn crash_actor(&self) {
        let _ = self.sender.load_full().send(Command::Crash).await;
    }
}

/// Spawn an actor instance plus its monitor, publishing the new sender.
///
/// If a caretaker is standing (previous instance crashed), the new actor
/// reclaims the store from it; either way a fresh caretaker is designated
/// as successor-on-crash.
fn spawn_actor(inner: &Arc<RegistryInner>) {
    let source = match inner.caretaker.lock().take() {
        Some(caretaker) => StoreSource::Reclaim {
            caretaker,
            fallback: Arc::clone(&inner.store),
        },
        None => StoreSource::Fresh(Arc::clone(&inner.store)),
    };

    *inner.caretaker.lock() = Some(CaretakerHandle::spawn(inner.config.caretaker_hold));

    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    inner.sender.store(Arc::new(tx));

    let actor = RegistryActor::new(
        source,
        Arc::clone(&inner.snapshot),
        inner.events.clone(),
        rx,
    );
    let join = tokio::spawn(actor.run());
    tokio::spawn(monitor(Arc::downgrade(inner), join));
}

/// Watch one actor instance; on panic, transfer the store to the caretaker
/// and respawn.
async fn monitor(weak: Weak<RegistryInner>, join: JoinHandle<()>) {
    match join.await {
        Ok(()) => {
            debug!("registry actor exited cleanly");
        }
        Err(err) if err.is_panic() => {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            warn!("registry actor crashed; transferring entry store to caretaker");
            if let Some(caretaker) = inner.caretaker.lock().as_ref() {
                caretaker.transfer(Arc::clone(&inner.store));
            }
            spawn_actor(&inner);
        }
        Err(_) => {
            debug!("registry actor task aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use latt_foundation::{Handler, Metadata};
    use serde_json::Value;
    use std::time::Duration;

    struct NullHandler;

    #[async_trait]
    impl Handler for NullHandler {
        async fn invoke(&self, _function: &str, args: Value) -> Result<Value> {
            Ok(args)
        }
    }

    async fn register(inner: &Arc<RegistryInner>, name: &str) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        inner
            .call(
                Command::Register {
                    name: name.to_string(),
                    handler: Arc::new(NullHandler),
                    metadata: Metadata::new(),
                    reply: reply_tx,
                },
                reply_rx,
            )
            .await
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_entries_survive_actor_crash() {
        let inner = RegistryInner::start(RegistryConfig::default());
        register(&inner, "llm").await.unwrap();
        register(&inner, "shell").await.unwrap();

        inner.crash_actor().await;

        // The monitor respawns a new instance that reclaims the store.
        // Retry until the fresh actor answers.
        let mut recovered = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if register(&inner, "post_crash").await.is_ok() {
                recovered = true;
                break;
            }
        }
        assert!(recovered, "actor did not come back after crash");

        assert!(inner.store.resolve("llm").is_ok());
        assert!(inner.store.resolve("shell").is_ok());
        assert!(inner.store.resolve("post_crash").is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_repeated_crashes_keep_recovering() {
        let inner = RegistryInner::start(RegistryConfig::default());
        register(&inner, "base").await.unwrap();

        for round in 0..3 {
            inner.crash_actor().await;
            let name = format!("round.{}", round);
            let mut ok = false;
            for _ in 0..50 {
                tokio::time::sleep(Duration::from_millis(10)).await;
                if register(&inner, &name).await.is_ok() {
                    ok = true;
                    break;
                }
            }
            assert!(ok, "actor missing after crash round {}", round);
        }

        assert_eq!(inner.store.len(), 4);
    }
}

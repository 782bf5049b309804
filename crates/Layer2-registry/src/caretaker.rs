//! Caretaker - standby holder of the entry store
//!
//! Spawned alongside every actor instance, the caretaker waits for a
//! possible ownership transfer. If the actor dies, the supervisor hands the
//! store over; the caretaker holds it, bounded by a timeout, until the next
//! actor instance reclaims it. Entries survive any single actor crash -
//! only losing the whole supervising task tree loses them.

use crate::store::EntryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

enum CaretakerMsg {
    /// The actor died; take ownership of its store.
    Transfer(Arc<EntryStore>),

    /// A new actor instance wants the store back.
    Reclaim(oneshot::Sender<Option<Arc<EntryStore>>>),
}

/// Supervisor-side handle to one caretaker task.
pub(crate) struct CaretakerHandle {
    tx: mpsc::Sender<CaretakerMsg>,
}

impl CaretakerHandle {
    /// Spawn a caretaker that will hold a transferred store for at most
    /// `hold` before giving it up.
    pub(crate) fn spawn(hold: Duration) -> Self {
        let (tx, rx) = mpsc::channel(2);
        tokio::spawn(run(rx, hold));
        Self { tx }
    }

    /// Hand the store over after an actor crash.
    pub(crate) fn transfer(&self, store: Arc<EntryStore>) {
        if self.tx.try_send(CaretakerMsg::Transfer(store)).is_err() {
            warn!("caretaker was gone at transfer time");
        }
    }

    /// Ask for the store back. `None` when the caretaker never received a
    /// transfer or its hold timed out.
    pub(crate) async fn reclaim(self) -> Option<Arc<EntryStore>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.try_send(CaretakerMsg::Reclaim(reply_tx)).ok()?;
        reply_rx.await.ok().flatten()
    }
}

async fn run(mut rx: mpsc::Receiver<CaretakerMsg>, hold: Duration) {
    let mut held: Option<Arc<EntryStore>> = None;
    // Parked far in the future until a transfer arms it.
    let hold_timer = tokio::time::sleep(Duration::from_secs(86_400 * 365));
    tokio::pin!(hold_timer);

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(CaretakerMsg::Transfer(store)) => {
                    info!(entries = store.len(), "caretaker took ownership of the entry store");
                    held = Some(store);
                    hold_timer.as_mut().reset(Instant::now() + hold);
                }
                Some(CaretakerMsg::Reclaim(reply)) => {
                    if held.is_some() {
                        info!("entry store reclaimed from caretaker");
                    }
                    let _ = reply.send(held.take());
                    break;
                }
                None => {
                    debug!("caretaker released without a transfer");
                    break;
                }
            },
            _ = &mut hold_timer, if held.is_some() => {
                warn!(hold = ?hold, "caretaker hold expired before reclaim");
                held = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latt_foundation::RegistryConfig;

    fn store() -> Arc<EntryStore> {
        Arc::new(EntryStore::new(RegistryConfig::default()))
    }

    #[tokio::test]
    async fn test_reclaim_without_transfer_is_none() {
        let caretaker = CaretakerHandle::spawn(Duration::from_secs(60));
        assert!(caretaker.reclaim().await.is_none());
    }

    #[tokio::test]
    async fn test_transfer_then_reclaim() {
        let caretaker = CaretakerHandle::spawn(Duration::from_secs(60));
        let original = store();

        caretaker.transfer(Arc::clone(&original));
        let reclaimed = caretaker.reclaim().await.expect("store should be held");
        assert!(Arc::ptr_eq(&original, &reclaimed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_timeout_releases_store() {
        let caretaker = CaretakerHandle::spawn(Duration::from_secs(60));
        caretaker.transfer(store());

        // Let the caretaker process the transfer, then sail past the hold.
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert!(caretaker.reclaim().await.is_none());
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::Mutex;

use crate::models::EventRecord;
use crate::registry::{save_snapshot, SharedRegistry};

/// Keeps the on-disk snapshot in step with the registry. Writes are
/// serialized and each one captures the state at the moment it runs, so a
/// later write never lands older data.
#[derive(Clone)]
pub struct SnapshotWriter {
    registry: SharedRegistry,
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl SnapshotWriter {
    pub fn new(registry: SharedRegistry, path: PathBuf) -> Self {
        Self {
            registry,
            path,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Write the current state now.
    pub async fn persist(&self) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let state = self.registry.snapshot().await;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || save_snapshot(&state, &path))
            .await
            .context("snapshot task panicked")?
    }

    /// Persist after every committed mutation until the event channel closes.
    /// Records already queued behind the one that woke us are folded into a
    /// single write.
    pub async fn run(self, mut rx: broadcast::Receiver<EventRecord>) {
        tracing::info!(path = %self.path.display(), "Snapshot writer started");

        loop {
            match rx.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => {
                    loop {
                        match rx.try_recv() {
                            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                        }
                    }
                    if let Err(e) = self.persist().await {
                        tracing::error!(error = %e, path = %self.path.display(), "Failed to persist registry snapshot");
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }

        tracing::warn!("Event channel closed, snapshot writer stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;
    use crate::registry::tests::{fee, rain_market, t0};
    use crate::registry::{load_snapshot, CreditLedger, ManualClock, Registry, RegistryState};
    use chrono::Duration;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "oracle-registry-writer-{}-{}.json",
            name,
            std::process::id()
        ))
    }

    fn broadcasting_registry() -> (SharedRegistry, broadcast::Sender<EventRecord>) {
        let (tx, _) = broadcast::channel(16);
        let state = RegistryState::new(
            Identity::from_low_u64(0x0a),
            Identity::from_low_u64(0x0b),
            fee(),
        )
        .unwrap();
        let registry = Registry::new(
            state,
            Arc::new(ManualClock::new(t0())),
            Arc::new(tx.clone()),
            Arc::new(CreditLedger::new()),
        );
        (SharedRegistry::new(registry), tx)
    }

    #[tokio::test]
    async fn test_every_mutation_reaches_disk() {
        let (shared, tx) = broadcasting_registry();
        let path = temp_path("mutations");
        let writer = SnapshotWriter::new(shared.clone(), path.clone());
        tokio::spawn(writer.run(tx.subscribe()));

        let creator = Identity::from_low_u64(1);
        let deadline = t0() + Duration::days(1);
        shared.create(rain_market(deadline), &creator).await.unwrap();
        shared.create(rain_market(deadline), &creator).await.unwrap();
        shared.cancel(2, &creator).await.unwrap();

        let mut on_disk = None;
        for _ in 0..100 {
            if let Ok(Some(state)) = load_snapshot(&path) {
                if state.journal.len() == 3 {
                    on_disk = Some(state);
                    break;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        std::fs::remove_file(&path).ok();

        let on_disk = on_disk.expect("snapshot with all three mutations");
        assert_eq!(on_disk, shared.snapshot().await);
        assert!(on_disk.markets[&2].is_cancelled());
    }

    #[tokio::test]
    async fn test_persist_writes_current_state() {
        let (shared, _tx) = broadcasting_registry();
        let path = temp_path("persist");
        shared
            .create(rain_market(t0() + Duration::days(1)), &Identity::from_low_u64(1))
            .await
            .unwrap();

        SnapshotWriter::new(shared.clone(), path.clone())
            .persist()
            .await
            .unwrap();
        let loaded = load_snapshot(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.map(|s| s.market_count), Some(1));
    }
}

//! Background cache writer.
//!
//! [`CacheWriter`] queues snapshot patches on a channel and applies them in
//! order on a long-lived task. The blocking read-modify-write of
//! [`CacheStore::save`] runs on tokio's blocking pool, so callers never
//! touch the disk themselves. Patches that pile up while a write is in
//! flight are folded into one write.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::snapshot::SnapshotPatch;
use crate::store::CacheStore;

enum Command {
    Save(SnapshotPatch),
    /// Answered once every earlier `Save` has been written.
    Flush(oneshot::Sender<()>),
}

/// Handle to the writer task. The task exits when the handle is dropped.
#[derive(Clone)]
pub struct CacheWriter {
    tx: mpsc::UnboundedSender<Command>,
}

impl CacheWriter {
    /// Spawn the writer task for `store`. Must be called inside a tokio
    /// runtime.
    pub fn spawn(store: Arc<CacheStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(store, rx));
        Self { tx }
    }

    /// Queue a patch. Returns immediately; patches are written in the
    /// order they were queued.
    pub fn save(&self, patch: SnapshotPatch) {
        if self.tx.send(Command::Save(patch)).is_err() {
            tracing::warn!("Cache writer has stopped, dropping snapshot patch");
        }
    }

    /// Wait until every patch queued before this call has been written.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Command::Flush(done)).is_err() {
            return;
        }
        let _ = wait.await;
    }
}

async fn run(store: Arc<CacheStore>, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = rx.recv().await {
        let mut patch = match command {
            Command::Save(patch) => patch,
            Command::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        let mut flushed = None;
        while let Ok(next) = rx.try_recv() {
            match next {
                Command::Save(later) => patch = patch.merge(later),
                Command::Flush(done) => {
                    flushed = Some(done);
                    break;
                }
            }
        }

        let store = Arc::clone(&store);
        if let Err(e) = tokio::task::spawn_blocking(move || store.save(patch)).await {
            tracing::error!(error = %e, "Cache write task failed");
        }
        if let Some(done) = flushed {
            let _ = done.send(());
        }
    }
    tracing::debug!("Cache writer closed");
}

#[cfg(test)]
mod tests {
    use imgbench_core::builtin;

    use super::*;
    use crate::storage::MemoryStorage;
    use crate::store::CACHE_KEY;
    use crate::Snapshot;

    #[tokio::test]
    async fn queued_patches_land_in_order() {
        let storage = Arc::new(MemoryStorage::new());
        let writer = CacheWriter::spawn(Arc::new(CacheStore::new(storage.clone())));

        writer.save(SnapshotPatch::datasets(vec![builtin::demo_dataset()]));
        writer.save(SnapshotPatch::algorithms(builtin::baseline_algorithms()));
        writer.save(SnapshotPatch::datasets(Vec::new()));
        writer.flush().await;

        let snapshot: Snapshot = serde_json::from_str(&storage.get(CACHE_KEY).unwrap()).unwrap();
        assert!(snapshot.datasets.is_empty());
        assert_eq!(snapshot.algorithms.len(), builtin::baseline_algorithms().len());
    }

    #[tokio::test]
    async fn flush_with_nothing_queued_returns() {
        let storage = Arc::new(MemoryStorage::new());
        let writer = CacheWriter::spawn(Arc::new(CacheStore::new(storage.clone())));

        writer.flush().await;

        assert!(storage.get(CACHE_KEY).is_none());
    }
}

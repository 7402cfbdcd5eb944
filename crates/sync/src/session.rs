//! A sync session: one backend, one cache, one in-memory mirror.

use std::sync::Arc;

use imgbench_cache::{CacheStore, CacheWriter, Snapshot, SnapshotPatch};
use imgbench_client::Backend;

use crate::catalog::Catalog;
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::runs::RunManager;
use crate::state::{SessionState, Shared};

/// Entry point of the sync layer.
///
/// Created once per process via [`Session::open`]. The catalog reconciler
/// and run manager share the session state and cache.
pub struct Session {
    pub catalog: Catalog,
    pub runs: Arc<RunManager>,
    shared: Arc<Shared>,
}

impl Session {
    /// Seed a session from the persisted cache, if any.
    ///
    /// Baseline algorithms missing from the cache are added and written
    /// back. Does not talk to the backend; call [`resume`](Self::resume) or
    /// [`refresh_all`](Self::refresh_all) for that.
    pub async fn open(
        backend: Arc<dyn Backend>,
        store: Arc<CacheStore>,
        config: SyncConfig,
    ) -> Self {
        let snapshot = load_snapshot(Arc::clone(&store)).await;
        match &snapshot {
            Some(s) => tracing::info!(
                datasets = s.datasets.len(),
                algorithms = s.algorithms.len(),
                presets = s.presets.len(),
                runs = s.runs.len(),
                "Loaded cached snapshot",
            ),
            None => tracing::info!("No usable cache, starting cold"),
        }

        let mut state = SessionState::from_snapshot(snapshot);
        let cache = CacheWriter::spawn(store);
        let added = state.ensure_baselines();
        if added > 0 {
            tracing::debug!(added, "Added missing baseline algorithms");
            cache.save(SnapshotPatch::algorithms(state.algorithms.clone()));
        }
        let shared = Arc::new(Shared::new(backend, cache, state));

        Self {
            catalog: Catalog::new(Arc::clone(&shared), &config),
            runs: RunManager::new(Arc::clone(&shared), &config),
            shared,
        }
    }

    /// Re-fetch runs and re-arm polling for every non-terminal one.
    pub async fn resume(&self) -> SyncResult<()> {
        self.runs.fetch_runs(None).await?;
        Ok(())
    }

    /// Refresh every catalog list, then the runs.
    ///
    /// Stops at the first failure; lists refreshed before it keep their new
    /// contents.
    pub async fn refresh_all(&self) -> SyncResult<()> {
        self.catalog.fetch_datasets(None).await?;
        self.catalog.fetch_algorithms(None).await?;
        self.catalog.fetch_presets(None).await?;
        self.resume().await
    }

    /// Persist the whole in-memory state in one write and wait for it.
    pub async fn flush(&self) {
        let patch = self.shared.state.read().await.to_patch();
        self.shared.cache.save(patch);
        self.wait_for_cache().await;
    }

    /// Wait until every cache write queued so far has reached storage.
    pub async fn wait_for_cache(&self) {
        self.shared.cache.flush().await;
    }

    /// Stop every poll timer and write the state out.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down sync session");
        self.runs.scheduler().shutdown().await;
        self.flush().await;
        tracing::info!("Sync session shut down complete");
    }
}

/// Load the snapshot on the blocking pool; a failed load starts cold.
async fn load_snapshot(store: Arc<CacheStore>) -> Option<Snapshot> {
    match tokio::task::spawn_blocking(move || store.load()).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::error!(error = %e, "Cache load task failed");
            None
        }
    }
}

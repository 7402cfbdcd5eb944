//! Load/save of the persisted snapshot.
//!
//! [`CacheStore`] never returns storage errors: a missing or unreadable
//! cache only means the next session starts cold. Everything is logged.

use std::sync::{Arc, Mutex};

use crate::repair::repair_snapshot;
use crate::snapshot::{Snapshot, SnapshotPatch};
use crate::storage::BlobStorage;

/// Storage key of the snapshot blob.
pub const CACHE_KEY: &str = "imgbench.cache.v2";

/// Best-effort persistence of the session snapshot.
pub struct CacheStore {
    storage: Arc<dyn BlobStorage>,
    key: String,
    /// Last snapshot seen by `load` or written by `save`. Used as the merge
    /// base when the persisted blob cannot be read back.
    last: Mutex<Snapshot>,
}

impl CacheStore {
    pub fn new(storage: Arc<dyn BlobStorage>) -> Self {
        Self::with_key(storage, CACHE_KEY)
    }

    pub fn with_key(storage: Arc<dyn BlobStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            last: Mutex::new(Snapshot::default()),
        }
    }

    /// Read, parse and repair the persisted snapshot.
    ///
    /// Returns `None` if nothing is stored, the storage fails, or the blob
    /// does not parse. A snapshot that needed repair is written back
    /// before it is returned.
    pub fn load(&self) -> Option<Snapshot> {
        let snapshot = self.read_persisted()?;

        let repaired = repair_snapshot(snapshot);
        if repaired.changed {
            tracing::info!(key = %self.key, "Writing back repaired cache snapshot");
            self.write(&repaired.value);
        }

        *self.lock_last() = repaired.value.clone();
        Some(repaired.value)
    }

    /// Merge `patch` over the persisted snapshot and write it back.
    ///
    /// Lists absent from the patch keep their persisted value. Storage
    /// failures are logged and swallowed.
    pub fn save(&self, patch: SnapshotPatch) {
        let mut snapshot = self
            .read_persisted()
            .unwrap_or_else(|| self.lock_last().clone());
        patch.apply_to(&mut snapshot);
        snapshot.saved_at = Some(chrono::Utc::now());

        self.write(&snapshot);
        *self.lock_last() = snapshot;
    }

    // ---- private helpers ----

    fn read_persisted(&self) -> Option<Snapshot> {
        let blob = match self.storage.read(&self.key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to read cache");
                return None;
            }
        };

        match serde_json::from_str::<Snapshot>(&blob) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Discarding unparsable cache");
                None
            }
        }
    }

    fn write(&self, snapshot: &Snapshot) {
        let blob = match serde_json::to_string(snapshot) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "Failed to serialize cache");
                return;
            }
        };
        if let Err(e) = self.storage.write(&self.key, &blob) {
            tracing::warn!(key = %self.key, error = %e, "Failed to write cache");
        }
    }

    fn lock_last(&self) -> std::sync::MutexGuard<'_, Snapshot> {
        self.last.lock().unwrap_or_else(|e| e.into_inner())
    }
}

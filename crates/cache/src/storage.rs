//! Key/value blob storage backing the cache.
//!
//! [`FileStorage`] keeps each key in `<dir>/<key>.json` and replaces it
//! atomically. [`MemoryStorage`] is for tests and throwaway sessions; it
//! can be told to fail so callers' error handling can be exercised.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Errors from a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to replace blob: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// A store of whole string blobs addressed by key.
pub trait BlobStorage: Send + Sync {
    /// Read the blob under `key`, `Ok(None)` if there is none.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the blob under `key`.
    fn write(&self, key: &str, blob: &str) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// FileStorage
// ---------------------------------------------------------------------------

/// One JSON file per key inside a directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Store blobs under `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl BlobStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, blob: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        // Write next to the target and rename so readers never observe a
        // partially written blob.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(blob.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(key))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// In-process storage.
#[derive(Default)]
pub struct MemoryStorage {
    blobs: Mutex<HashMap<String, String>>,
    fail: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read and write fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Seed a blob directly, bypassing the failure switch.
    pub fn insert(&self, key: &str, blob: impl Into<String>) {
        self.lock().insert(key.to_string(), blob.into());
    }

    /// Raw blob under `key`, bypassing the failure switch.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map of strings.
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("memory storage set to fail".into()))
        } else {
            Ok(())
        }
    }
}

impl BlobStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(self.get(key))
    }

    fn write(&self, key: &str, blob: &str) -> Result<(), StorageError> {
        self.check()?;
        self.insert(key, blob);
        Ok(())
    }
}

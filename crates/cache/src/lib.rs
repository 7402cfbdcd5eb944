//! Persisted local cache of catalog entities and runs.
//!
//! The cache is one versioned JSON blob ([`snapshot::Snapshot`]) stored
//! under a fixed key in a [`storage::BlobStorage`]. [`store::CacheStore`]
//! loads it through the [`repair`] pipeline and writes it back with
//! read-modify-write semantics; [`writer::CacheWriter`] runs those writes
//! in order on a background task. The cache is best-effort: storage
//! failures are logged, never returned.

pub mod repair;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod writer;

pub use snapshot::{Snapshot, SnapshotPatch};
pub use storage::{BlobStorage, FileStorage, MemoryStorage};
pub use store::CacheStore;
pub use writer::CacheWriter;

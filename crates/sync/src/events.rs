//! Events emitted while a session synchronizes.
//!
//! Delivered over a [`tokio::sync::broadcast`] channel; subscribe through
//! [`RunManager::subscribe`](crate::runs::RunManager::subscribe). Sending
//! never fails the operation that produced the event.

use imgbench_core::status::Status;
use imgbench_core::types::EntityId;
use serde::Serialize;

/// Broadcast channel capacity for sync events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SyncEvent {
    /// A run observation was committed to the cache.
    RunUpdated { run_id: EntityId, status: Status },

    /// A run reached a terminal status.
    RunFinished { run_id: EntityId, status: Status },

    /// A poll timer was armed for a run.
    PollStarted { run_id: EntityId },

    /// A poll timer was removed (terminal status or explicit stop).
    PollStopped { run_id: EntityId },

    /// A catalog list was replaced from the backend.
    CatalogRefreshed { entity: &'static str, count: usize },
}

//! Client-side synchronization of the imgbench catalog and run records.
//!
//! A [`session::Session`] owns the in-memory mirror of the backend, the
//! persisted cache behind it, the [`catalog::Catalog`] reconciler, and
//! the [`runs::RunManager`] that drives runs to completion through its
//! [`scheduler::PollScheduler`].

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod mapping;
pub mod optimistic;
pub mod runs;
pub mod scheduler;
pub mod session;
pub mod state;

pub use error::SyncError;
pub use session::Session;

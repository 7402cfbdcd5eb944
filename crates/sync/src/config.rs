//! Tunables of a sync session.

use std::time::Duration;

/// Default delay between two polls of the same run.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(800);

/// Default page size for `GET /runs`.
pub const DEFAULT_RUN_LIMIT: usize = 200;

/// Default page size for `GET /datasets`.
pub const DEFAULT_DATASET_LIMIT: usize = 200;

/// Default page size for `GET /algorithms`.
pub const DEFAULT_ALGORITHM_LIMIT: usize = 500;

/// Default page size for `GET /presets`.
pub const DEFAULT_PRESET_LIMIT: usize = 200;

/// Session configuration. All fields have defaults matching the backend's
/// own page sizes.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    pub run_limit: usize,
    pub dataset_limit: usize,
    pub algorithm_limit: usize,
    pub preset_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            run_limit: DEFAULT_RUN_LIMIT,
            dataset_limit: DEFAULT_DATASET_LIMIT,
            algorithm_limit: DEFAULT_ALGORITHM_LIMIT,
            preset_limit: DEFAULT_PRESET_LIMIT,
        }
    }
}

//! The persisted snapshot and the partial update applied on save.

use imgbench_core::models::{Algorithm, Dataset, Preset, Run};
use imgbench_core::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Snapshot schema version written by this client.
///
/// Version 1 blobs predate versioning and carry no `version` field.
pub const SNAPSHOT_VERSION: u32 = 2;

/// Everything the client persists between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default = "legacy_version")]
    pub version: u32,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
    #[serde(default)]
    pub algorithms: Vec<Algorithm>,
    #[serde(default)]
    pub presets: Vec<Preset>,
    #[serde(default)]
    pub runs: Vec<Run>,
    #[serde(default)]
    pub saved_at: Option<Timestamp>,
}

fn legacy_version() -> u32 {
    1
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            datasets: Vec::new(),
            algorithms: Vec::new(),
            presets: Vec::new(),
            runs: Vec::new(),
            saved_at: None,
        }
    }
}

/// A shallow, per-list update. `None` leaves the persisted list as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotPatch {
    pub datasets: Option<Vec<Dataset>>,
    pub algorithms: Option<Vec<Algorithm>>,
    pub presets: Option<Vec<Preset>>,
    pub runs: Option<Vec<Run>>,
}

impl SnapshotPatch {
    pub fn datasets(datasets: Vec<Dataset>) -> Self {
        Self {
            datasets: Some(datasets),
            ..Default::default()
        }
    }

    pub fn algorithms(algorithms: Vec<Algorithm>) -> Self {
        Self {
            algorithms: Some(algorithms),
            ..Default::default()
        }
    }

    pub fn presets(presets: Vec<Preset>) -> Self {
        Self {
            presets: Some(presets),
            ..Default::default()
        }
    }

    pub fn runs(runs: Vec<Run>) -> Self {
        Self {
            runs: Some(runs),
            ..Default::default()
        }
    }

    /// A patch that replaces every list with the snapshot's.
    pub fn full(snapshot: Snapshot) -> Self {
        Self {
            datasets: Some(snapshot.datasets),
            algorithms: Some(snapshot.algorithms),
            presets: Some(snapshot.presets),
            runs: Some(snapshot.runs),
        }
    }

    /// Fold a later patch over this one. Lists present in `later` win.
    pub fn merge(mut self, later: SnapshotPatch) -> Self {
        if later.datasets.is_some() {
            self.datasets = later.datasets;
        }
        if later.algorithms.is_some() {
            self.algorithms = later.algorithms;
        }
        if later.presets.is_some() {
            self.presets = later.presets;
        }
        if later.runs.is_some() {
            self.runs = later.runs;
        }
        self
    }

    /// Replace the lists present in this patch, keep the rest.
    pub fn apply_to(self, snapshot: &mut Snapshot) {
        if let Some(datasets) = self.datasets {
            snapshot.datasets = datasets;
        }
        if let Some(algorithms) = self.algorithms {
            snapshot.algorithms = algorithms;
        }
        if let Some(presets) = self.presets {
            snapshot.presets = presets;
        }
        if let Some(runs) = self.runs {
            snapshot.runs = runs;
        }
    }
}

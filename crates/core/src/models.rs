//! Local shapes of catalog entities and runs.
//!
//! These are what the session keeps in memory and what the persisted
//! snapshot stores. Field names serialize in camelCase to stay readable
//! by caches written by earlier client revisions; every struct tolerates
//! missing fields.

use serde::{Deserialize, Serialize};

use crate::display::PLACEHOLDER;
use crate::status::Status;
use crate::types::EntityId;

/// A benchmark dataset known to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dataset {
    pub id: EntityId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: String,
    pub created_at: String,
    pub raw: serde_json::Value,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            kind: String::new(),
            size: PLACEHOLDER.to_string(),
            created_at: PLACEHOLDER.to_string(),
            raw: serde_json::Value::Null,
        }
    }
}

/// An algorithm registered for one task.
///
/// `task` holds the display label, not the wire type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Algorithm {
    pub id: EntityId,
    pub task: String,
    pub name: String,
    #[serde(rename = "impl")]
    pub implementation: String,
    pub version: String,
    pub created_at: String,
    pub default_params: serde_json::Map<String, serde_json::Value>,
    pub raw: serde_json::Value,
}

impl Default for Algorithm {
    fn default() -> Self {
        Self {
            id: String::new(),
            task: String::new(),
            name: String::new(),
            implementation: String::new(),
            version: String::new(),
            created_at: PLACEHOLDER.to_string(),
            default_params: serde_json::Map::new(),
            raw: serde_json::Value::Null,
        }
    }
}

/// A saved run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preset {
    pub id: EntityId,
    pub name: String,
    pub task_type: String,
    pub task: String,
    pub dataset_id: EntityId,
    pub algorithm_id: EntityId,
    pub metrics: Vec<String>,
    pub params: serde_json::Map<String, serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
    pub raw: serde_json::Value,
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            task_type: String::new(),
            task: String::new(),
            dataset_id: String::new(),
            algorithm_id: String::new(),
            metrics: Vec::new(),
            params: serde_json::Map::new(),
            created_at: PLACEHOLDER.to_string(),
            updated_at: PLACEHOLDER.to_string(),
            raw: serde_json::Value::Null,
        }
    }
}

/// A benchmark run as shown in the run table.
///
/// Metrics are flattened out of the backend's metrics map; `raw` keeps
/// the backend payload for detail views and exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Run {
    pub id: EntityId,
    pub task_type: String,
    pub task: String,
    pub dataset_id: EntityId,
    pub algorithm_id: EntityId,
    pub status: Status,
    pub created_at: String,
    pub psnr: Option<f64>,
    pub ssim: Option<f64>,
    pub niqe: Option<f64>,
    pub elapsed: String,
    pub error: Option<String>,
    pub raw: serde_json::Value,
}

impl Default for Run {
    fn default() -> Self {
        Self {
            id: String::new(),
            task_type: String::new(),
            task: String::new(),
            dataset_id: String::new(),
            algorithm_id: String::new(),
            status: Status::Queued,
            created_at: PLACEHOLDER.to_string(),
            psnr: None,
            ssim: None,
            niqe: None,
            elapsed: PLACEHOLDER.to_string(),
            error: None,
            raw: serde_json::Value::Null,
        }
    }
}

impl Run {
    /// Merge a freshly mapped observation of the same run onto this one.
    ///
    /// Identity and state fields take the incoming values. Metrics only
    /// move forward: an absent incoming metric keeps the cached value.
    /// `raw` objects are merged key by key.
    pub fn merge_from(&mut self, incoming: Run) {
        debug_assert_eq!(self.id, incoming.id);

        self.task_type = incoming.task_type;
        self.task = incoming.task;
        self.dataset_id = incoming.dataset_id;
        self.algorithm_id = incoming.algorithm_id;
        self.status = incoming.status;
        self.created_at = incoming.created_at;
        self.psnr = incoming.psnr.or(self.psnr);
        self.ssim = incoming.ssim.or(self.ssim);
        self.niqe = incoming.niqe.or(self.niqe);
        self.elapsed = incoming.elapsed;
        self.error = incoming.error;

        match (&mut self.raw, incoming.raw) {
            (serde_json::Value::Object(current), serde_json::Value::Object(next)) => {
                current.extend(next);
            }
            (slot, next) => *slot = next,
        }
    }
}

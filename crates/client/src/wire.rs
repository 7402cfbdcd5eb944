//! Request and response bodies of the backend REST contract.
//!
//! Response types keep unknown fields in a flattened `extra` map so the
//! full payload survives into the local `raw` copy.

use base64::Engine as _;
use imgbench_core::error::CoreError;
use imgbench_core::types::{EntityId, UnixSeconds};
use serde::{Deserialize, Serialize};

pub type JsonMap = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// Body of `POST /runs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCreate {
    pub task_type: String,
    pub dataset_id: EntityId,
    pub algorithm_id: EntityId,
    #[serde(default)]
    pub params: JsonMap,
}

/// A run as reported by `POST /runs`, `GET /runs` and `GET /runs/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOut {
    pub run_id: EntityId,
    #[serde(default)]
    pub task_type: String,
    #[serde(default)]
    pub dataset_id: EntityId,
    #[serde(default)]
    pub algorithm_id: EntityId,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<UnixSeconds>,
    #[serde(default)]
    pub metrics: JsonMap,
    #[serde(default)]
    pub elapsed: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub params: JsonMap,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Response of `POST /runs/{id}/cancel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelOut {
    pub status: String,
    #[serde(default)]
    pub run_id: Option<EntityId>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Response of `POST /runs/clear`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearOut {
    #[serde(default)]
    pub deleted: u64,
    #[serde(default)]
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

/// Body of `POST /datasets`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetCreate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<EntityId>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: String,
}

/// Body of `PATCH /datasets/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// A dataset as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetOut {
    pub dataset_id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub created_at: Option<UnixSeconds>,
    #[serde(default)]
    pub meta: JsonMap,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Body of `POST /datasets/{id}/import_zip`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetImportZip {
    pub filename: String,
    pub data_b64: String,
    #[serde(default)]
    pub overwrite: bool,
}

impl DatasetImportZip {
    /// Build an import request from raw archive bytes.
    pub fn from_bytes(
        filename: impl Into<String>,
        bytes: &[u8],
        overwrite: bool,
    ) -> Result<Self, CoreError> {
        let filename = filename.into();
        if filename.trim().is_empty() {
            return Err(CoreError::Validation(
                "Archive filename must not be empty".into(),
            ));
        }
        Ok(Self {
            filename,
            data_b64: base64::engine::general_purpose::STANDARD.encode(bytes),
            overwrite,
        })
    }
}

// ---------------------------------------------------------------------------
// Algorithms
// ---------------------------------------------------------------------------

/// Body of `POST /algorithms`. `task` is the wire task type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmCreate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm_id: Option<EntityId>,
    pub task: String,
    pub name: String,
    #[serde(rename = "impl")]
    pub implementation: String,
    pub version: String,
    #[serde(default)]
    pub default_params: JsonMap,
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub param_presets: JsonMap,
}

/// Body of `PATCH /algorithms/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "impl", skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_params: Option<JsonMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param_presets: Option<JsonMap>,
}

/// An algorithm as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmOut {
    pub algorithm_id: EntityId,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "impl", default)]
    pub implementation: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub created_at: Option<UnixSeconds>,
    #[serde(default)]
    pub default_params: JsonMap,
    #[serde(default)]
    pub param_presets: JsonMap,
    #[serde(flatten)]
    pub extra: JsonMap,
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Body of `POST /presets`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetCreate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<EntityId>,
    pub name: String,
    pub task_type: String,
    pub dataset_id: EntityId,
    pub algorithm_id: EntityId,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub params: JsonMap,
}

/// Body of `PATCH /presets/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<JsonMap>,
}

/// A preset as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetOut {
    pub preset_id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub task_type: String,
    #[serde(default)]
    pub dataset_id: EntityId,
    #[serde(default)]
    pub algorithm_id: EntityId,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub params: JsonMap,
    #[serde(default)]
    pub created_at: Option<UnixSeconds>,
    #[serde(default)]
    pub updated_at: Option<UnixSeconds>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

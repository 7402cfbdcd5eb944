//! The backend contract as a trait.
//!
//! [`BackendApi`](crate::api::BackendApi) is the production
//! implementation. The sync layer only depends on this trait.

use async_trait::async_trait;

use crate::api::ApiError;
use crate::wire::{
    AlgorithmCreate, AlgorithmOut, AlgorithmPatch, CancelOut, ClearOut, DatasetCreate,
    DatasetImportZip, DatasetOut, DatasetPatch, PresetCreate, PresetOut, PresetPatch, RunCreate,
    RunOut,
};

#[async_trait]
pub trait Backend: Send + Sync {
    // ---- runs ----

    async fn create_run(&self, req: &RunCreate) -> Result<RunOut, ApiError>;

    async fn get_run(&self, run_id: &str) -> Result<RunOut, ApiError>;

    /// Newest first.
    async fn list_runs(&self, limit: usize) -> Result<Vec<RunOut>, ApiError>;

    async fn cancel_run(&self, run_id: &str) -> Result<CancelOut, ApiError>;

    /// Delete run records server-side. `status` of `None` uses the
    /// backend default (finished runs only); `"all"` clears everything.
    async fn clear_runs(&self, status: Option<&str>) -> Result<ClearOut, ApiError>;

    // ---- datasets ----

    async fn list_datasets(&self, limit: usize) -> Result<Vec<DatasetOut>, ApiError>;

    async fn create_dataset(&self, req: &DatasetCreate) -> Result<DatasetOut, ApiError>;

    async fn patch_dataset(
        &self,
        dataset_id: &str,
        patch: &DatasetPatch,
    ) -> Result<DatasetOut, ApiError>;

    async fn delete_dataset(&self, dataset_id: &str) -> Result<(), ApiError>;

    async fn scan_dataset(&self, dataset_id: &str) -> Result<DatasetOut, ApiError>;

    async fn import_dataset_zip(
        &self,
        dataset_id: &str,
        req: &DatasetImportZip,
    ) -> Result<DatasetOut, ApiError>;

    // ---- algorithms ----

    async fn list_algorithms(&self, limit: usize) -> Result<Vec<AlgorithmOut>, ApiError>;

    async fn create_algorithm(&self, req: &AlgorithmCreate) -> Result<AlgorithmOut, ApiError>;

    async fn patch_algorithm(
        &self,
        algorithm_id: &str,
        patch: &AlgorithmPatch,
    ) -> Result<AlgorithmOut, ApiError>;

    async fn delete_algorithm(&self, algorithm_id: &str) -> Result<(), ApiError>;

    // ---- presets ----

    async fn list_presets(&self, limit: usize) -> Result<Vec<PresetOut>, ApiError>;

    async fn get_preset(&self, preset_id: &str) -> Result<PresetOut, ApiError>;

    async fn create_preset(&self, req: &PresetCreate) -> Result<PresetOut, ApiError>;

    async fn patch_preset(
        &self,
        preset_id: &str,
        patch: &PresetPatch,
    ) -> Result<PresetOut, ApiError>;

    async fn delete_preset(&self, preset_id: &str) -> Result<(), ApiError>;
}

//! Catalog reconciler for datasets, algorithms and presets.
//!
//! Every mutation goes to the backend first. Only a successful response
//! touches the in-memory lists, and every change is followed by a cache
//! write of the affected list. A failed call leaves both untouched.

use std::sync::Arc;

use imgbench_cache::SnapshotPatch;
use imgbench_client::wire::{
    AlgorithmCreate, AlgorithmPatch, DatasetCreate, DatasetImportZip, DatasetPatch, PresetCreate,
    PresetPatch,
};
use imgbench_core::builtin;
use imgbench_core::models::{Algorithm, Dataset, Preset};
use imgbench_core::task_type;

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::events::SyncEvent;
use crate::mapping::{map_algorithm, map_dataset, map_preset};
use crate::state::{upsert_by_id, SessionState, Shared};

pub struct Catalog {
    shared: Arc<Shared>,
    dataset_limit: usize,
    algorithm_limit: usize,
    preset_limit: usize,
}

impl Catalog {
    pub fn new(shared: Arc<Shared>, config: &SyncConfig) -> Self {
        Self {
            shared,
            dataset_limit: config.dataset_limit,
            algorithm_limit: config.algorithm_limit,
            preset_limit: config.preset_limit,
        }
    }

    pub async fn datasets(&self) -> Vec<Dataset> {
        self.shared.state.read().await.datasets.clone()
    }

    pub async fn algorithms(&self) -> Vec<Algorithm> {
        self.shared.state.read().await.algorithms.clone()
    }

    pub async fn presets(&self) -> Vec<Preset> {
        self.shared.state.read().await.presets.clone()
    }

    // ---- datasets ----

    /// Replace the dataset list with the backend's.
    pub async fn fetch_datasets(&self, limit: Option<usize>) -> SyncResult<Vec<Dataset>> {
        let limit = limit.unwrap_or(self.dataset_limit);
        let listed = self.shared.backend.list_datasets(limit).await?;
        let datasets: Vec<Dataset> = listed.into_iter().map(map_dataset).collect();

        let mut state = self.shared.state.write().await;
        state.datasets = datasets.clone();
        persist_datasets(&self.shared, &state);
        drop(state);

        self.refreshed("datasets", datasets.len());
        Ok(datasets)
    }

    pub async fn create_dataset(&self, req: &DatasetCreate) -> SyncResult<Dataset> {
        let dataset = map_dataset(self.shared.backend.create_dataset(req).await?);
        tracing::info!(dataset_id = %dataset.id, name = %dataset.name, "Dataset created");
        self.put_dataset(dataset.clone()).await;
        Ok(dataset)
    }

    pub async fn update_dataset(&self, dataset_id: &str, patch: &DatasetPatch) -> SyncResult<Dataset> {
        let dataset = map_dataset(self.shared.backend.patch_dataset(dataset_id, patch).await?);
        self.put_dataset(dataset.clone()).await;
        Ok(dataset)
    }

    pub async fn remove_dataset(&self, dataset_id: &str) -> SyncResult<()> {
        self.shared.backend.delete_dataset(dataset_id).await?;
        tracing::info!(dataset_id, "Dataset deleted");

        let mut state = self.shared.state.write().await;
        state.datasets.retain(|d| d.id != dataset_id);
        persist_datasets(&self.shared, &state);
        Ok(())
    }

    /// Ask the backend to rescan a dataset's files.
    pub async fn scan_dataset(&self, dataset_id: &str) -> SyncResult<Dataset> {
        let dataset = map_dataset(self.shared.backend.scan_dataset(dataset_id).await?);
        tracing::info!(dataset_id, size = %dataset.size, "Dataset scanned");
        self.put_dataset(dataset.clone()).await;
        Ok(dataset)
    }

    /// Upload an archive into a dataset.
    pub async fn import_dataset_archive(
        &self,
        dataset_id: &str,
        archive: &DatasetImportZip,
    ) -> SyncResult<Dataset> {
        let out = self
            .shared
            .backend
            .import_dataset_zip(dataset_id, archive)
            .await?;
        let dataset = map_dataset(out);
        tracing::info!(
            dataset_id,
            filename = %archive.filename,
            overwrite = archive.overwrite,
            "Dataset archive imported",
        );
        self.put_dataset(dataset.clone()).await;
        Ok(dataset)
    }

    // ---- algorithms ----

    /// Replace the algorithm list with the backend's, keeping baselines.
    pub async fn fetch_algorithms(&self, limit: Option<usize>) -> SyncResult<Vec<Algorithm>> {
        let limit = limit.unwrap_or(self.algorithm_limit);
        let listed = self.shared.backend.list_algorithms(limit).await?;
        let mut algorithms: Vec<Algorithm> = listed.into_iter().map(map_algorithm).collect();
        let restored = builtin::ensure_baseline_algorithms(&mut algorithms);
        if restored > 0 {
            tracing::debug!(restored, "Baseline algorithms missing from backend listing");
        }

        let mut state = self.shared.state.write().await;
        state.algorithms = algorithms.clone();
        persist_algorithms(&self.shared, &state);
        drop(state);

        self.refreshed("algorithms", algorithms.len());
        Ok(algorithms)
    }

    /// Create an algorithm. `req.task` may be a display label.
    pub async fn create_algorithm(&self, req: &AlgorithmCreate) -> SyncResult<Algorithm> {
        let req = AlgorithmCreate {
            task: task_type::to_type(&req.task),
            ..req.clone()
        };
        let algorithm = map_algorithm(self.shared.backend.create_algorithm(&req).await?);
        tracing::info!(algorithm_id = %algorithm.id, name = %algorithm.name, "Algorithm created");
        self.put_algorithm(algorithm.clone()).await;
        Ok(algorithm)
    }

    pub async fn update_algorithm(
        &self,
        algorithm_id: &str,
        patch: &AlgorithmPatch,
    ) -> SyncResult<Algorithm> {
        let patch = AlgorithmPatch {
            task: patch.task.as_deref().map(task_type::to_type),
            ..patch.clone()
        };
        let out = self
            .shared
            .backend
            .patch_algorithm(algorithm_id, &patch)
            .await?;
        let algorithm = map_algorithm(out);
        self.put_algorithm(algorithm.clone()).await;
        Ok(algorithm)
    }

    /// Delete an algorithm. A deleted baseline reappears in the local list.
    pub async fn remove_algorithm(&self, algorithm_id: &str) -> SyncResult<()> {
        self.shared.backend.delete_algorithm(algorithm_id).await?;
        tracing::info!(algorithm_id, "Algorithm deleted");

        let mut state = self.shared.state.write().await;
        state.algorithms.retain(|a| a.id != algorithm_id);
        builtin::ensure_baseline_algorithms(&mut state.algorithms);
        persist_algorithms(&self.shared, &state);
        Ok(())
    }

    // ---- presets ----

    pub async fn fetch_presets(&self, limit: Option<usize>) -> SyncResult<Vec<Preset>> {
        let limit = limit.unwrap_or(self.preset_limit);
        let listed = self.shared.backend.list_presets(limit).await?;
        let presets: Vec<Preset> = listed.into_iter().map(map_preset).collect();

        let mut state = self.shared.state.write().await;
        state.presets = presets.clone();
        persist_presets(&self.shared, &state);
        drop(state);

        self.refreshed("presets", presets.len());
        Ok(presets)
    }

    pub async fn create_preset(&self, req: &PresetCreate) -> SyncResult<Preset> {
        let req = PresetCreate {
            task_type: task_type::to_type(&req.task_type),
            ..req.clone()
        };
        let preset = map_preset(self.shared.backend.create_preset(&req).await?);
        tracing::info!(preset_id = %preset.id, name = %preset.name, "Preset created");
        self.put_preset(preset.clone()).await;
        Ok(preset)
    }

    pub async fn update_preset(&self, preset_id: &str, patch: &PresetPatch) -> SyncResult<Preset> {
        let patch = PresetPatch {
            task_type: patch.task_type.as_deref().map(task_type::to_type),
            ..patch.clone()
        };
        let preset = map_preset(self.shared.backend.patch_preset(preset_id, &patch).await?);
        self.put_preset(preset.clone()).await;
        Ok(preset)
    }

    pub async fn remove_preset(&self, preset_id: &str) -> SyncResult<()> {
        self.shared.backend.delete_preset(preset_id).await?;
        tracing::info!(preset_id, "Preset deleted");

        let mut state = self.shared.state.write().await;
        state.presets.retain(|p| p.id != preset_id);
        persist_presets(&self.shared, &state);
        Ok(())
    }

    // ---- private helpers ----

    async fn put_dataset(&self, dataset: Dataset) {
        let mut state = self.shared.state.write().await;
        upsert_by_id(&mut state.datasets, dataset, |d| &d.id);
        persist_datasets(&self.shared, &state);
    }

    async fn put_algorithm(&self, algorithm: Algorithm) {
        let mut state = self.shared.state.write().await;
        upsert_by_id(&mut state.algorithms, algorithm, |a| &a.id);
        builtin::ensure_baseline_algorithms(&mut state.algorithms);
        persist_algorithms(&self.shared, &state);
    }

    async fn put_preset(&self, preset: Preset) {
        let mut state = self.shared.state.write().await;
        upsert_by_id(&mut state.presets, preset, |p| &p.id);
        persist_presets(&self.shared, &state);
    }

    fn refreshed(&self, entity: &'static str, count: usize) {
        tracing::info!(entity, count, "Catalog refreshed");
        self.shared.emit(SyncEvent::CatalogRefreshed { entity, count });
    }
}

fn persist_datasets(shared: &Shared, state: &SessionState) {
    shared.cache.save(SnapshotPatch::datasets(state.datasets.clone()));
}

fn persist_algorithms(shared: &Shared, state: &SessionState) {
    shared.cache.save(SnapshotPatch::algorithms(state.algorithms.clone()));
}

fn persist_presets(shared: &Shared, state: &SessionState) {
    shared.cache.save(SnapshotPatch::presets(state.presets.clone()));
}

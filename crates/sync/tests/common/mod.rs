//! Shared fixtures for sync integration tests: an in-memory backend with
//! failure injection, and a harness wiring it to a session.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use imgbench_cache::store::CACHE_KEY;
use imgbench_cache::{CacheStore, MemoryStorage, Snapshot};
use imgbench_client::wire::{
    AlgorithmCreate, AlgorithmOut, AlgorithmPatch, CancelOut, ClearOut, DatasetCreate,
    DatasetImportZip, DatasetOut, DatasetPatch, PresetCreate, PresetOut, PresetPatch, RunCreate,
    RunOut,
};
use imgbench_client::{ApiError, Backend};
use imgbench_core::status::{STATUS_CANCELED, STATUS_CANCELING, STATUS_QUEUED};
use imgbench_sync::config::SyncConfig;
use imgbench_sync::Session;

// ---------------------------------------------------------------------------
// Fake backend
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    /// Newest first, like `GET /runs`.
    runs: Vec<RunOut>,
    datasets: Vec<DatasetOut>,
    algorithms: Vec<AlgorithmOut>,
    presets: Vec<PresetOut>,
    next_id: u64,
    /// Runs whose cancel was acknowledged as `canceling`; the next
    /// `get_run` reports them `canceled`.
    cancel_pending: HashSet<String>,
    failing: HashSet<&'static str>,
    calls: HashMap<&'static str, usize>,
    last_run_create: Option<RunCreate>,
}

/// In-memory backend mirroring the REST contract.
#[derive(Default)]
pub struct FakeBackend {
    inner: Mutex<Inner>,
    /// When set, the next `get_run` snapshots the run, then waits here
    /// before answering.
    get_run_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every call to `op` fail with a 500.
    pub fn fail(&self, op: &'static str) {
        self.lock().failing.insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.lock().failing.remove(op);
    }

    pub fn calls(&self, op: &'static str) -> usize {
        self.lock().calls.get(op).copied().unwrap_or(0)
    }

    pub fn last_run_create(&self) -> Option<RunCreate> {
        self.lock().last_run_create.clone()
    }

    pub fn seed_run(&self, run_id: &str, status: &str) {
        let run = run_out(run_id, status);
        self.lock().runs.insert(0, run);
    }

    pub fn set_run_status(&self, run_id: &str, status: &str) {
        let mut inner = self.lock();
        if let Some(run) = inner.runs.iter_mut().find(|r| r.run_id == run_id) {
            run.status = status.to_string();
            if status == "done" {
                run.metrics = json!({"PSNR": 31.2, "ssim": 0.91})
                    .as_object()
                    .cloned()
                    .unwrap_or_default();
                run.elapsed = Some(2.5);
            }
        }
    }

    pub fn seed_preset(&self, preset_id: &str) {
        let preset: PresetOut = serde_json::from_value(json!({
            "preset_id": preset_id,
            "name": "Quick denoise",
            "task_type": "denoise",
            "dataset_id": "ds1",
            "algorithm_id": "alg_dn_cnn",
            "metrics": ["PSNR", "SSIM"],
            "params": {"sigma": 25},
            "created_at": 1700000000.0
        }))
        .unwrap();
        self.lock().presets.insert(0, preset);
    }

    /// Delete a dataset without going through the API.
    pub fn forget_dataset(&self, dataset_id: &str) {
        self.lock().datasets.retain(|d| d.dataset_id != dataset_id);
    }

    /// Delete every run without going through the API.
    pub fn forget_runs(&self) {
        self.lock().runs.clear();
    }

    /// Arm a gate for the next `get_run` and return it.
    pub fn gate_next_get_run(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.get_run_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Count the call and fail it if `op` is marked failing.
    fn enter(&self, op: &'static str, path: String) -> Result<(), ApiError> {
        let mut inner = self.lock();
        *inner.calls.entry(op).or_insert(0) += 1;
        if inner.failing.contains(op) {
            return Err(injected_failure(path));
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut inner = self.lock();
        inner.next_id += 1;
        format!("{prefix}-{}", inner.next_id)
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn create_run(&self, req: &RunCreate) -> Result<RunOut, ApiError> {
        self.enter("create_run", "/runs".into())?;
        let run_id = self.next_id("run");
        let mut run = run_out(&run_id, STATUS_QUEUED);
        run.task_type = req.task_type.clone();
        run.dataset_id = req.dataset_id.clone();
        run.algorithm_id = req.algorithm_id.clone();
        run.params = req.params.clone();

        let mut inner = self.lock();
        inner.last_run_create = Some(req.clone());
        inner.runs.insert(0, run.clone());
        Ok(run)
    }

    async fn get_run(&self, run_id: &str) -> Result<RunOut, ApiError> {
        let path = format!("/runs/{run_id}");
        self.enter("get_run", path.clone())?;

        let observed = {
            let mut inner = self.lock();
            if inner.cancel_pending.remove(run_id) {
                if let Some(run) = inner.runs.iter_mut().find(|r| r.run_id == run_id) {
                    run.status = STATUS_CANCELED.to_string();
                }
            }
            inner.runs.iter().find(|r| r.run_id == run_id).cloned()
        };

        let gate = self.get_run_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        observed.ok_or_else(|| not_found(path))
    }

    async fn list_runs(&self, limit: usize) -> Result<Vec<RunOut>, ApiError> {
        self.enter("list_runs", "/runs".into())?;
        Ok(self.lock().runs.iter().take(limit).cloned().collect())
    }

    async fn cancel_run(&self, run_id: &str) -> Result<CancelOut, ApiError> {
        let path = format!("/runs/{run_id}/cancel");
        self.enter("cancel_run", path.clone())?;

        let mut inner = self.lock();
        let Some(run) = inner.runs.iter_mut().find(|r| r.run_id == run_id) else {
            return Err(not_found(path));
        };
        let status = if run.status == STATUS_QUEUED {
            run.status = STATUS_CANCELED.to_string();
            STATUS_CANCELED
        } else {
            run.status = STATUS_CANCELING.to_string();
            STATUS_CANCELING
        };
        if status == STATUS_CANCELING {
            inner.cancel_pending.insert(run_id.to_string());
        }
        Ok(CancelOut {
            status: status.to_string(),
            run_id: Some(run_id.to_string()),
            extra: Default::default(),
        })
    }

    async fn clear_runs(&self, status: Option<&str>) -> Result<ClearOut, ApiError> {
        self.enter("clear_runs", "/runs/clear".into())?;
        let filter = status.unwrap_or("done").to_string();
        let mut inner = self.lock();
        let before = inner.runs.len();
        inner.runs.retain(|r| filter != "all" && r.status != filter);
        Ok(ClearOut {
            deleted: (before - inner.runs.len()) as u64,
            status: Some(filter),
        })
    }

    async fn list_datasets(&self, limit: usize) -> Result<Vec<DatasetOut>, ApiError> {
        self.enter("list_datasets", "/datasets".into())?;
        Ok(self.lock().datasets.iter().take(limit).cloned().collect())
    }

    async fn create_dataset(&self, req: &DatasetCreate) -> Result<DatasetOut, ApiError> {
        self.enter("create_dataset", "/datasets".into())?;
        let id = req
            .dataset_id
            .clone()
            .unwrap_or_else(|| self.next_id("ds"));
        let out = dataset_out(&id, &req.name, &req.size);
        self.lock().datasets.insert(0, out.clone());
        Ok(out)
    }

    async fn patch_dataset(
        &self,
        dataset_id: &str,
        patch: &DatasetPatch,
    ) -> Result<DatasetOut, ApiError> {
        let path = format!("/datasets/{dataset_id}");
        self.enter("patch_dataset", path.clone())?;
        let mut inner = self.lock();
        let ds = inner
            .datasets
            .iter_mut()
            .find(|d| d.dataset_id == dataset_id)
            .ok_or_else(|| not_found(path))?;
        if let Some(name) = &patch.name {
            ds.name = name.clone();
        }
        if let Some(size) = &patch.size {
            ds.size = size.clone();
        }
        Ok(ds.clone())
    }

    async fn delete_dataset(&self, dataset_id: &str) -> Result<(), ApiError> {
        self.enter("delete_dataset", format!("/datasets/{dataset_id}"))?;
        self.lock().datasets.retain(|d| d.dataset_id != dataset_id);
        Ok(())
    }

    async fn scan_dataset(&self, dataset_id: &str) -> Result<DatasetOut, ApiError> {
        let path = format!("/datasets/{dataset_id}/scan");
        self.enter("scan_dataset", path.clone())?;
        let mut inner = self.lock();
        let ds = inner
            .datasets
            .iter_mut()
            .find(|d| d.dataset_id == dataset_id)
            .ok_or_else(|| not_found(path))?;
        ds.size = "24 images".into();
        Ok(ds.clone())
    }

    async fn import_dataset_zip(
        &self,
        dataset_id: &str,
        req: &DatasetImportZip,
    ) -> Result<DatasetOut, ApiError> {
        let path = format!("/datasets/{dataset_id}/import_zip");
        self.enter("import_dataset_zip", path.clone())?;
        let mut inner = self.lock();
        let ds = inner
            .datasets
            .iter_mut()
            .find(|d| d.dataset_id == dataset_id)
            .ok_or_else(|| not_found(path))?;
        ds.size = format!("{} bytes", req.data_b64.len());
        Ok(ds.clone())
    }

    async fn list_algorithms(&self, limit: usize) -> Result<Vec<AlgorithmOut>, ApiError> {
        self.enter("list_algorithms", "/algorithms".into())?;
        Ok(self.lock().algorithms.iter().take(limit).cloned().collect())
    }

    async fn create_algorithm(&self, req: &AlgorithmCreate) -> Result<AlgorithmOut, ApiError> {
        self.enter("create_algorithm", "/algorithms".into())?;
        let id = req
            .algorithm_id
            .clone()
            .unwrap_or_else(|| self.next_id("alg"));
        let out: AlgorithmOut = serde_json::from_value(json!({
            "algorithm_id": id,
            "task": req.task,
            "name": req.name,
            "impl": req.implementation,
            "version": req.version,
            "created_at": 1700000000.0,
            "default_params": req.default_params,
        }))
        .unwrap();
        self.lock().algorithms.insert(0, out.clone());
        Ok(out)
    }

    async fn patch_algorithm(
        &self,
        algorithm_id: &str,
        patch: &AlgorithmPatch,
    ) -> Result<AlgorithmOut, ApiError> {
        let path = format!("/algorithms/{algorithm_id}");
        self.enter("patch_algorithm", path.clone())?;
        let mut inner = self.lock();
        let alg = inner
            .algorithms
            .iter_mut()
            .find(|a| a.algorithm_id == algorithm_id)
            .ok_or_else(|| not_found(path))?;
        if let Some(task) = &patch.task {
            alg.task = task.clone();
        }
        if let Some(name) = &patch.name {
            alg.name = name.clone();
        }
        Ok(alg.clone())
    }

    async fn delete_algorithm(&self, algorithm_id: &str) -> Result<(), ApiError> {
        self.enter("delete_algorithm", format!("/algorithms/{algorithm_id}"))?;
        self.lock()
            .algorithms
            .retain(|a| a.algorithm_id != algorithm_id);
        Ok(())
    }

    async fn list_presets(&self, limit: usize) -> Result<Vec<PresetOut>, ApiError> {
        self.enter("list_presets", "/presets".into())?;
        Ok(self.lock().presets.iter().take(limit).cloned().collect())
    }

    async fn get_preset(&self, preset_id: &str) -> Result<PresetOut, ApiError> {
        let path = format!("/presets/{preset_id}");
        self.enter("get_preset", path.clone())?;
        self.lock()
            .presets
            .iter()
            .find(|p| p.preset_id == preset_id)
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    async fn create_preset(&self, req: &PresetCreate) -> Result<PresetOut, ApiError> {
        self.enter("create_preset", "/presets".into())?;
        let id = req.preset_id.clone().unwrap_or_else(|| self.next_id("preset"));
        let out: PresetOut = serde_json::from_value(json!({
            "preset_id": id,
            "name": req.name,
            "task_type": req.task_type,
            "dataset_id": req.dataset_id,
            "algorithm_id": req.algorithm_id,
            "metrics": req.metrics,
            "params": req.params,
            "created_at": 1700000000.0,
            "updated_at": 1700000000.0
        }))
        .unwrap();
        self.lock().presets.insert(0, out.clone());
        Ok(out)
    }

    async fn patch_preset(
        &self,
        preset_id: &str,
        patch: &PresetPatch,
    ) -> Result<PresetOut, ApiError> {
        let path = format!("/presets/{preset_id}");
        self.enter("patch_preset", path.clone())?;
        let mut inner = self.lock();
        let preset = inner
            .presets
            .iter_mut()
            .find(|p| p.preset_id == preset_id)
            .ok_or_else(|| not_found(path))?;
        if let Some(name) = &patch.name {
            preset.name = name.clone();
        }
        Ok(preset.clone())
    }

    async fn delete_preset(&self, preset_id: &str) -> Result<(), ApiError> {
        self.enter("delete_preset", format!("/presets/{preset_id}"))?;
        self.lock().presets.retain(|p| p.preset_id != preset_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn run_out(run_id: &str, status: &str) -> RunOut {
    serde_json::from_value(json!({
        "run_id": run_id,
        "task_type": "denoise",
        "dataset_id": "ds1",
        "algorithm_id": "alg_dn_cnn",
        "status": status,
        "created_at": 1700000000.0,
        "params": {"metrics": ["PSNR"]}
    }))
    .unwrap()
}

pub fn dataset_out(dataset_id: &str, name: &str, size: &str) -> DatasetOut {
    serde_json::from_value(json!({
        "dataset_id": dataset_id,
        "name": name,
        "type": "image",
        "size": size,
        "created_at": 1700000000.0
    }))
    .unwrap()
}

fn injected_failure(path: String) -> ApiError {
    ApiError::Status {
        status: 500,
        method: "FAKE".into(),
        path,
        detail: Some(json!("injected failure")),
        body: String::new(),
    }
}

fn not_found(path: String) -> ApiError {
    ApiError::Status {
        status: 404,
        method: "FAKE".into(),
        path,
        detail: Some(json!("not_found")),
        body: String::new(),
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub storage: Arc<MemoryStorage>,
    pub session: Session,
}

impl Harness {
    /// The snapshot in storage once queued writes have landed, parsed
    /// without repair.
    pub async fn persisted(&self) -> Snapshot {
        let blob = self.persisted_blob().await.expect("cache was never written");
        serde_json::from_str(&blob).unwrap()
    }

    pub async fn persisted_blob(&self) -> Option<String> {
        self.session.wait_for_cache().await;
        self.storage.get(CACHE_KEY)
    }
}

/// A session over an empty backend and an empty cache.
pub async fn harness() -> Harness {
    harness_with_storage(Arc::new(MemoryStorage::new())).await
}

/// A session over an empty backend and the given storage.
pub async fn harness_with_storage(storage: Arc<MemoryStorage>) -> Harness {
    let backend = FakeBackend::new();
    let store = Arc::new(CacheStore::new(storage.clone()));
    let session = Session::open(backend.clone(), store, SyncConfig::default()).await;
    Harness {
        backend,
        storage,
        session,
    }
}

//! Run lifecycle: create, observe, cancel and clear runs.
//!
//! [`RunManager`] submits runs to the backend, folds every observation into
//! the session state through the freshness guard, persists the run list,
//! and keeps a poll timer armed for each run until it reaches a terminal
//! status.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use imgbench_cache::SnapshotPatch;
use imgbench_client::wire::{JsonMap, RunCreate};
use imgbench_core::error::CoreError;
use imgbench_core::metric_names::DEFAULT_METRICS;
use imgbench_core::models::{Preset, Run};
use imgbench_core::status::{normalize_status, Status, STATUS_DONE};
use imgbench_core::task_type;
use imgbench_core::types::EntityId;
use tokio::sync::broadcast;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::events::SyncEvent;
use crate::mapping::{map_preset, map_run};
use crate::optimistic::Optimistic;
use crate::scheduler::{PollScheduler, RunPoller};
use crate::state::{upsert_by_id, SessionState, Shared, Ticket};

/// Filter value for [`RunManager::clear_runs`] that matches every run.
pub const CLEAR_ALL: &str = "all";

/// Parameters of a new run, with the task given as a display label.
#[derive(Debug, Clone, Default)]
pub struct NewRun {
    pub task: String,
    pub dataset_id: EntityId,
    pub algorithm_id: EntityId,
    pub metrics: Vec<String>,
    pub extra_params: JsonMap,
}

pub struct RunManager {
    shared: Arc<Shared>,
    scheduler: PollScheduler,
    run_limit: usize,
    /// Handed to poll timers so they never keep the manager alive.
    me: Weak<RunManager>,
}

impl RunManager {
    pub fn new(shared: Arc<Shared>, config: &SyncConfig) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            scheduler: PollScheduler::new(config.poll_interval, shared.events.clone()),
            shared,
            run_limit: config.run_limit,
            me: me.clone(),
        })
    }

    /// Subscribe to run and poll lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.shared.events.subscribe()
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    /// Cached runs, newest first.
    pub async fn runs(&self) -> Vec<Run> {
        self.shared.state.read().await.runs.clone()
    }

    pub async fn run(&self, run_id: &str) -> Option<Run> {
        self.shared.state.read().await.run(run_id).cloned()
    }

    /// Submit a new run and start polling it. Returns as soon as the
    /// backend has accepted the run.
    pub async fn create_run(&self, new: NewRun) -> SyncResult<EntityId> {
        if new.dataset_id.trim().is_empty() {
            return Err(CoreError::Validation("dataset_id is required".into()).into());
        }
        if new.algorithm_id.trim().is_empty() {
            return Err(CoreError::Validation("algorithm_id is required".into()).into());
        }

        let metrics = if new.metrics.is_empty() {
            DEFAULT_METRICS.iter().map(|m| m.to_string()).collect()
        } else {
            new.metrics
        };
        let mut params = new.extra_params;
        params.insert("metrics".into(), serde_json::json!(metrics));

        let wire_type = task_type::to_type(&new.task);
        if !task_type::is_known_type(&wire_type) {
            tracing::warn!(task = %new.task, "Unknown task, sending it to the backend as is");
        }

        self.submit(RunCreate {
            task_type: wire_type,
            dataset_id: new.dataset_id,
            algorithm_id: new.algorithm_id,
            params,
        })
        .await
    }

    /// Submit a run configured from a preset.
    ///
    /// A preset missing from the cache is fetched from the backend and
    /// cached first.
    pub async fn create_run_from_preset(&self, preset_id: &str) -> SyncResult<EntityId> {
        let cached = self
            .shared
            .state
            .read()
            .await
            .presets
            .iter()
            .find(|p| p.id == preset_id)
            .cloned();
        let preset = match cached {
            Some(preset) => preset,
            None => self.fetch_preset(preset_id).await?,
        };

        let mut params = preset.params;
        params.insert("metrics".into(), serde_json::json!(preset.metrics));

        tracing::debug!(preset_id, task_type = %preset.task_type, "Creating run from preset");
        self.submit(RunCreate {
            task_type: preset.task_type,
            dataset_id: preset.dataset_id,
            algorithm_id: preset.algorithm_id,
            params,
        })
        .await
    }

    /// Replace the run list from the backend and re-arm polling for every
    /// non-terminal run in it.
    pub async fn fetch_runs(&self, limit: Option<usize>) -> SyncResult<Vec<Run>> {
        let limit = limit.unwrap_or(self.run_limit);
        let ticket = self.shared.ticket();
        let listed = self.shared.backend.list_runs(limit).await?;
        let listed: Vec<Run> = listed.into_iter().map(map_run).collect();

        let (runs, dropped) = {
            let mut state = self.shared.state.write().await;
            let dropped = state.replace_runs(listed, ticket);
            persist_runs(&self.shared, &state);
            (state.runs.clone(), dropped)
        };

        for run_id in &dropped {
            self.scheduler.stop(run_id).await;
        }

        let pending: Vec<&Run> = runs.iter().filter(|r| !r.status.is_terminal()).collect();
        tracing::info!(
            count = runs.len(),
            pending = pending.len(),
            dropped = dropped.len(),
            "Fetched runs",
        );
        for run in pending {
            self.arm(&run.id).await;
        }

        Ok(runs)
    }

    /// Fetch one run and merge it onto the cached entry.
    ///
    /// Returns the cached entry after the merge. If a fresher observation
    /// was already cached, that entry is returned unchanged. If the run was
    /// removed from the cache while the request was in flight, it stays
    /// removed and `NotFound` is returned.
    pub async fn fetch_run(&self, run_id: &str) -> SyncResult<Run> {
        let ticket = self.shared.ticket();
        let out = self.shared.backend.get_run(run_id).await?;
        self.commit(map_run(out), ticket)
            .await
            .ok_or_else(|| removed(run_id))
    }

    /// Ask the backend to cancel a run.
    ///
    /// The cached status flips to `canceling` right away. On success the
    /// acknowledged status is adopted; polling stops on `canceled` and
    /// continues otherwise so the run cannot stay at `canceling`. On failure
    /// the previous status is restored and the error returned.
    pub async fn cancel_run(&self, run_id: &str) -> SyncResult<Status> {
        let issued = self.shared.ticket();

        let update = {
            let mut state = self.shared.state.write().await;
            match state.run_mut(run_id) {
                Some(run) if run.status.is_terminal() => {
                    tracing::debug!(run_id, status = %run.status, "Run already finished, not canceling");
                    return Ok(run.status.clone());
                }
                Some(run) => {
                    let update = Optimistic::begin(&mut run.status, Status::Canceling);
                    state.bump_ticket(run_id, issued);
                    persist_runs(&self.shared, &state);
                    Some(update)
                }
                None => None,
            }
        };
        if let Some(update) = &update {
            self.shared.emit(SyncEvent::RunUpdated {
                run_id: run_id.to_string(),
                status: update.tentative().clone(),
            });
        }

        let ack = match self.shared.backend.cancel_run(run_id).await {
            Ok(ack) => ack,
            Err(e) => {
                tracing::warn!(run_id, error = %e, "Cancel rejected, rolling back");
                if let Some(update) = update {
                    self.roll_back(run_id, update).await;
                }
                return Err(e.into());
            }
        };

        if let Some(update) = update {
            let prior = update.commit();
            tracing::debug!(run_id, %prior, "Cancel accepted by backend");
        }

        let acked = normalize_status(&ack.status);
        let ticket = self.shared.ticket();
        let effective = {
            let mut state = self.shared.state.write().await;
            let effective = state.apply_status(run_id, acked.clone(), ticket);
            if effective.is_some() {
                persist_runs(&self.shared, &state);
            }
            effective.unwrap_or(acked)
        };
        tracing::info!(run_id, status = %effective, "Cancel acknowledged");
        self.announce(run_id, &effective);

        if effective.is_terminal() {
            self.scheduler.stop(run_id).await;
        } else {
            self.arm(run_id).await;
        }
        Ok(effective)
    }

    /// Delete runs on the backend and drop them from the cache.
    ///
    /// `None` clears finished runs; [`CLEAR_ALL`] clears everything; any
    /// other value is a status filter. Returns the backend's deleted count.
    pub async fn clear_runs(&self, status: Option<&str>) -> SyncResult<u64> {
        let ticket = self.shared.ticket();
        let out = self.shared.backend.clear_runs(status).await?;

        let filter = status.unwrap_or(STATUS_DONE);
        let matches = |run: &Run| {
            filter.eq_ignore_ascii_case(CLEAR_ALL) || run.status == normalize_status(filter)
        };

        let removed: Vec<EntityId> = {
            let mut state = self.shared.state.write().await;
            let gone = state.remove_runs(ticket, matches);
            persist_runs(&self.shared, &state);
            gone.into_iter().map(|r| r.id).collect()
        };

        for run_id in &removed {
            self.scheduler.stop(run_id).await;
        }
        tracing::info!(filter, deleted = out.deleted, removed = removed.len(), "Cleared runs");
        Ok(out.deleted)
    }

    pub async fn stop_polling(&self, run_id: &str) -> bool {
        self.scheduler.stop(run_id).await
    }

    pub async fn stop_all_polling(&self) {
        self.scheduler.stop_all().await;
    }

    // ---- private helpers ----

    async fn submit(&self, req: RunCreate) -> SyncResult<EntityId> {
        let ticket = self.shared.ticket();
        let out = self.shared.backend.create_run(&req).await?;
        let run_id = out.run_id.clone();
        let run = self
            .commit(map_run(out), ticket)
            .await
            .ok_or_else(|| removed(&run_id))?;

        tracing::info!(
            run_id = %run.id,
            task_type = %run.task_type,
            dataset_id = %run.dataset_id,
            algorithm_id = %run.algorithm_id,
            "Run submitted",
        );

        if !run.status.is_terminal() {
            self.arm(&run.id).await;
        }
        Ok(run.id)
    }

    /// Fold an observation into the cache, persist, and announce it.
    /// Returns the effective cached entry, or `None` if the run was removed
    /// after the observation was issued.
    async fn commit(&self, run: Run, ticket: Ticket) -> Option<Run> {
        let run_id = run.id.clone();
        let mut state = self.shared.state.write().await;
        let outcome = state.upsert_run(run, ticket);
        if outcome.committed() {
            persist_runs(&self.shared, &state);
        }
        let effective = state.run(&run_id).cloned()?;
        drop(state);

        if outcome.committed() {
            self.announce(&run_id, &effective.status);
        }
        Some(effective)
    }

    async fn fetch_preset(&self, preset_id: &str) -> SyncResult<Preset> {
        let preset = map_preset(self.shared.backend.get_preset(preset_id).await?);
        tracing::debug!(preset_id, "Preset not cached, fetched from backend");

        let mut state = self.shared.state.write().await;
        upsert_by_id(&mut state.presets, preset.clone(), |p| &p.id);
        self.shared
            .cache
            .save(SnapshotPatch::presets(state.presets.clone()));
        Ok(preset)
    }

    async fn roll_back(&self, run_id: &str, update: Optimistic<Status>) {
        let mut state = self.shared.state.write().await;
        let Some(run) = state.run_mut(run_id) else {
            return;
        };
        let prior = update.prior().clone();
        if !update.rollback(&mut run.status) {
            tracing::debug!(run_id, status = %run.status, "Status moved on, not rolling back");
            return;
        }
        tracing::debug!(run_id, %prior, "Rolled back to prior status");
        let restored = run.status.clone();
        persist_runs(&self.shared, &state);
        drop(state);
        self.announce(run_id, &restored);
    }

    fn announce(&self, run_id: &str, status: &Status) {
        self.shared.emit(SyncEvent::RunUpdated {
            run_id: run_id.to_string(),
            status: status.clone(),
        });
        if status.is_terminal() {
            self.shared.emit(SyncEvent::RunFinished {
                run_id: run_id.to_string(),
                status: status.clone(),
            });
        }
    }

    async fn arm(&self, run_id: &str) {
        let poller: Weak<dyn RunPoller> = self.me.clone();
        self.scheduler.start(run_id, poller).await;
    }
}

#[async_trait]
impl RunPoller for RunManager {
    async fn poll_run(&self, run_id: &str) -> Result<Status, SyncError> {
        self.fetch_run(run_id).await.map(|run| run.status)
    }
}

fn removed(run_id: &str) -> SyncError {
    CoreError::NotFound {
        entity: "run",
        id: run_id.to_string(),
    }
    .into()
}

fn persist_runs(shared: &Shared, state: &SessionState) {
    shared.cache.save(SnapshotPatch::runs(state.runs.clone()));
}

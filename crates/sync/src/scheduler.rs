//! Per-run poll timers.
//!
//! [`PollScheduler`] keeps at most one timer task per run id. Each task
//! ticks on a fixed interval, asks its [`RunPoller`] for the run's
//! current status, and removes itself once the status is terminal.
//!
//! Timers hold only a weak reference to the poller and never keep it
//! alive. Dropping the scheduler cancels every timer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use imgbench_core::status::Status;
use imgbench_core::types::EntityId;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::SyncError;
use crate::events::SyncEvent;

/// How long `stop_all` waits for each timer task to exit.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Something that can refresh a run and report its effective status.
#[async_trait]
pub trait RunPoller: Send + Sync {
    async fn poll_run(&self, run_id: &str) -> Result<Status, SyncError>;
}

type TimerMap = Arc<RwLock<HashMap<EntityId, PollTimer>>>;

/// Bookkeeping for a single armed timer.
struct PollTimer {
    /// Distinguishes this timer from a later one for the same run.
    generation: u64,
    /// Per-timer token (child of the scheduler's master token).
    cancel: CancellationToken,
    task_handle: tokio::task::JoinHandle<()>,
}

pub struct PollScheduler {
    timers: TimerMap,
    interval: Duration,
    events: broadcast::Sender<SyncEvent>,
    generation: AtomicU64,
    /// Master cancellation token -- cancelled during shutdown.
    cancel: CancellationToken,
}

impl PollScheduler {
    pub fn new(interval: Duration, events: broadcast::Sender<SyncEvent>) -> Self {
        Self {
            timers: Arc::new(RwLock::new(HashMap::new())),
            interval,
            events,
            generation: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        }
    }

    /// Arm a timer for `run_id`.
    ///
    /// Idempotent: returns `false` without doing anything if a live timer
    /// already exists for the run or the scheduler was shut down.
    pub async fn start(&self, run_id: &str, poller: Weak<dyn RunPoller>) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }

        let mut timers = self.timers.write().await;
        if let Some(existing) = timers.get(run_id) {
            if !existing.task_handle.is_finished() {
                return false;
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let cancel = self.cancel.child_token();
        let task = TimerTask {
            run_id: run_id.to_string(),
            generation,
            interval: self.interval,
            poller,
            cancel: cancel.clone(),
            timers: Arc::clone(&self.timers),
            events: self.events.clone(),
        };
        let task_handle = tokio::spawn(task.run());

        timers.insert(
            run_id.to_string(),
            PollTimer {
                generation,
                cancel,
                task_handle,
            },
        );
        drop(timers);

        tracing::debug!(run_id, generation, "Armed poll timer");
        let _ = self.events.send(SyncEvent::PollStarted {
            run_id: run_id.to_string(),
        });
        true
    }

    /// Disarm the timer for `run_id`. Returns `false` if none was armed.
    ///
    /// Does not wait for the task; an in-flight poll is abandoned.
    pub async fn stop(&self, run_id: &str) -> bool {
        let Some(timer) = self.timers.write().await.remove(run_id) else {
            return false;
        };
        timer.cancel.cancel();

        tracing::debug!(run_id, generation = timer.generation, "Disarmed poll timer");
        let _ = self.events.send(SyncEvent::PollStopped {
            run_id: run_id.to_string(),
        });
        true
    }

    /// Disarm every timer and wait for the tasks to exit.
    pub async fn stop_all(&self) {
        let drained: Vec<(EntityId, PollTimer)> = self.timers.write().await.drain().collect();
        if drained.is_empty() {
            return;
        }

        tracing::debug!(count = drained.len(), "Stopping all poll timers");
        for (_, timer) in &drained {
            timer.cancel.cancel();
        }
        for (run_id, timer) in drained {
            let _ = tokio::time::timeout(STOP_TIMEOUT, timer.task_handle).await;
            let _ = self.events.send(SyncEvent::PollStopped { run_id });
        }
    }

    /// Stop every timer and refuse new ones.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.stop_all().await;
    }

    pub async fn is_polling(&self, run_id: &str) -> bool {
        self.timers
            .read()
            .await
            .get(run_id)
            .is_some_and(|t| !t.task_handle.is_finished())
    }

    /// Number of live timers.
    pub async fn active_count(&self) -> usize {
        self.timers
            .read()
            .await
            .values()
            .filter(|t| !t.task_handle.is_finished())
            .count()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Everything a timer task needs, moved into the spawned future.
struct TimerTask {
    run_id: EntityId,
    generation: u64,
    interval: Duration,
    poller: Weak<dyn RunPoller>,
    cancel: CancellationToken,
    timers: TimerMap,
    events: broadcast::Sender<SyncEvent>,
}

impl TimerTask {
    async fn run(self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            let Some(poller) = self.poller.upgrade() else {
                tracing::debug!(run_id = %self.run_id, "Poller dropped, ending timer");
                break;
            };

            let result = tokio::select! {
                _ = self.cancel.cancelled() => return,
                result = poller.poll_run(&self.run_id) => result,
            };
            drop(poller);

            match result {
                Ok(status) if status.is_terminal() => {
                    tracing::debug!(run_id = %self.run_id, %status, "Run finished, ending timer");
                    break;
                }
                Ok(_) => {}
                // The next tick retries.
                Err(e) => {
                    tracing::debug!(run_id = %self.run_id, error = %e, "Poll failed");
                }
            }
        }

        self.remove_self().await;
    }

    /// Drop our map entry unless a newer timer for the run replaced it or
    /// someone already stopped us.
    async fn remove_self(&self) {
        let mut timers = self.timers.write().await;
        let ours = timers
            .get(&self.run_id)
            .is_some_and(|t| t.generation == self.generation);
        if !ours || self.cancel.is_cancelled() {
            return;
        }
        timers.remove(&self.run_id);
        drop(timers);

        let _ = self.events.send(SyncEvent::PollStopped {
            run_id: self.run_id.clone(),
        });
    }
}

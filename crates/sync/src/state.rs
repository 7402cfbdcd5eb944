//! In-memory session state and the freshness guard for run upserts.
//!
//! Run observations arrive in completion order, not issue order. Every
//! backend interaction draws a ticket from a monotonic counter; the cache
//! remembers the ticket of the observation each run entry came from and
//! refuses older ones.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use imgbench_cache::{CacheWriter, Snapshot, SnapshotPatch};
use imgbench_client::Backend;
use imgbench_core::builtin;
use imgbench_core::models::{Algorithm, Dataset, Preset, Run};
use imgbench_core::status::Status;
use imgbench_core::types::EntityId;
use tokio::sync::{broadcast, RwLock};

use crate::events::{SyncEvent, EVENT_CHANNEL_CAPACITY};

/// Monotonic sequence number attached to a run observation.
pub type Ticket = u64;

/// What the cache did with an incoming run observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Merged,
    /// A fresher observation was already committed; nothing changed.
    Stale,
}

impl UpsertOutcome {
    pub fn committed(self) -> bool {
        !matches!(self, UpsertOutcome::Stale)
    }
}

/// Decide whether an observation may replace the cached one.
///
/// Terminal statuses are sinks: a non-terminal observation never replaces
/// a terminal one, and a terminal observation always replaces a
/// non-terminal one. Otherwise the newer ticket wins.
pub fn is_fresher(
    cached_status: &Status,
    cached_ticket: Ticket,
    incoming_status: &Status,
    incoming_ticket: Ticket,
) -> bool {
    match (cached_status.is_terminal(), incoming_status.is_terminal()) {
        (true, false) => false,
        (false, true) => true,
        _ => incoming_ticket >= cached_ticket,
    }
}

/// The session's mirror of the backend.
#[derive(Debug, Default)]
pub struct SessionState {
    pub datasets: Vec<Dataset>,
    pub algorithms: Vec<Algorithm>,
    pub presets: Vec<Preset>,
    pub runs: Vec<Run>,
    /// Ticket of the observation each cached run was last taken from.
    /// Never persisted: tickets restart with every session.
    tickets: HashMap<EntityId, Ticket>,
    /// Ticket of the listing or clear that dropped a run. Observations
    /// issued before it must not bring the run back.
    removed: HashMap<EntityId, Ticket>,
}

impl SessionState {
    /// Seed state from a loaded snapshot, or start cold.
    pub fn from_snapshot(snapshot: Option<Snapshot>) -> Self {
        let snapshot = snapshot.unwrap_or_default();
        Self {
            datasets: snapshot.datasets,
            algorithms: snapshot.algorithms,
            presets: snapshot.presets,
            runs: snapshot.runs,
            tickets: HashMap::new(),
            removed: HashMap::new(),
        }
    }

    /// Fill in missing baseline algorithms. Returns how many were added.
    pub fn ensure_baselines(&mut self) -> usize {
        builtin::ensure_baseline_algorithms(&mut self.algorithms)
    }

    pub fn run(&self, run_id: &str) -> Option<&Run> {
        self.runs.iter().find(|r| r.id == run_id)
    }

    pub fn run_mut(&mut self, run_id: &str) -> Option<&mut Run> {
        self.runs.iter_mut().find(|r| r.id == run_id)
    }

    /// Ticket of the cached entry for `run_id` (0 if never observed).
    pub fn ticket_of(&self, run_id: &str) -> Ticket {
        self.tickets.get(run_id).copied().unwrap_or(0)
    }

    /// Record that the entry for `run_id` now reflects `ticket`.
    pub fn bump_ticket(&mut self, run_id: &str, ticket: Ticket) {
        let entry = self.tickets.entry(run_id.to_string()).or_insert(0);
        *entry = (*entry).max(ticket);
    }

    /// Whether an observation taken at `ticket` predates the removal of
    /// `run_id` from the cache.
    pub fn removed_after(&self, run_id: &str, ticket: Ticket) -> bool {
        self.removed.get(run_id).is_some_and(|&floor| ticket < floor)
    }

    /// Drop runs matching `pred`, remembering `ticket` as their removal
    /// floor. Returns the removed runs.
    pub fn remove_runs(&mut self, ticket: Ticket, pred: impl Fn(&Run) -> bool) -> Vec<Run> {
        let (gone, kept): (Vec<Run>, Vec<Run>) =
            std::mem::take(&mut self.runs).into_iter().partition(|r| pred(r));
        self.runs = kept;
        for run in &gone {
            self.forget(&run.id, ticket);
        }
        gone
    }

    /// Insert a new run at the front, or merge onto the cached entry if
    /// the observation is fresh enough.
    ///
    /// An unknown run is only inserted if the observation is newer than
    /// the listing or clear that removed it.
    pub fn upsert_run(&mut self, incoming: Run, ticket: Ticket) -> UpsertOutcome {
        let cached_ticket = self.ticket_of(&incoming.id);
        let Some(idx) = self.runs.iter().position(|r| r.id == incoming.id) else {
            if self.removed_after(&incoming.id, ticket) {
                tracing::debug!(run_id = %incoming.id, "Dropping observation of a removed run");
                return UpsertOutcome::Stale;
            }
            self.removed.remove(&incoming.id);
            self.bump_ticket(&incoming.id, ticket);
            self.runs.insert(0, incoming);
            return UpsertOutcome::Inserted;
        };

        let cached = &mut self.runs[idx];
        if !is_fresher(&cached.status, cached_ticket, &incoming.status, ticket) {
            tracing::debug!(
                run_id = %incoming.id,
                cached = %cached.status,
                incoming = %incoming.status,
                "Dropping stale run observation",
            );
            return UpsertOutcome::Stale;
        }

        let run_id = incoming.id.clone();
        cached.merge_from(incoming);
        self.bump_ticket(&run_id, ticket);
        UpsertOutcome::Merged
    }

    /// Apply a bare status observation (e.g. a cancel acknowledgement) to
    /// a cached run, subject to the same freshness rule as
    /// [`upsert_run`](Self::upsert_run).
    ///
    /// Returns the run's effective status afterwards, or `None` if the run
    /// is not cached.
    pub fn apply_status(&mut self, run_id: &str, status: Status, ticket: Ticket) -> Option<Status> {
        let cached_ticket = self.ticket_of(run_id);
        let run = self.run_mut(run_id)?;
        if !is_fresher(&run.status, cached_ticket, &status, ticket) {
            return Some(run.status.clone());
        }
        run.status = status.clone();
        self.bump_ticket(run_id, ticket);
        Some(status)
    }

    /// Replace the run list with a backend listing.
    ///
    /// Membership follows the listing. A listed run whose cached entry is
    /// fresher than the listing keeps the cached entry; a listed run
    /// removed after the listing was issued stays removed. An unlisted run
    /// observed after the listing was issued is kept at the front. Returns
    /// the ids of cached runs the listing dropped.
    pub fn replace_runs(&mut self, listed: Vec<Run>, ticket: Ticket) -> Vec<EntityId> {
        let mut previous: HashMap<EntityId, Run> = std::mem::take(&mut self.runs)
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();
        let previous_tickets = std::mem::take(&mut self.tickets);

        for incoming in listed {
            if !previous.contains_key(&incoming.id) && self.removed_after(&incoming.id, ticket) {
                continue;
            }
            self.removed.remove(&incoming.id);
            let cached_ticket = previous_tickets.get(&incoming.id).copied().unwrap_or(0);
            let run = match previous.remove(&incoming.id) {
                Some(cached)
                    if !is_fresher(&cached.status, cached_ticket, &incoming.status, ticket) =>
                {
                    self.tickets.insert(cached.id.clone(), cached_ticket);
                    cached
                }
                _ => {
                    self.tickets.insert(incoming.id.clone(), ticket);
                    incoming
                }
            };
            self.runs.push(run);
        }

        let mut newer = Vec::new();
        let mut dropped = Vec::new();
        for (run_id, run) in previous {
            match previous_tickets.get(&run_id).copied() {
                Some(cached_ticket) if cached_ticket > ticket => {
                    self.tickets.insert(run_id, cached_ticket);
                    newer.push((cached_ticket, run));
                }
                _ => dropped.push(run_id),
            }
        }
        newer.sort_by(|a, b| b.0.cmp(&a.0));
        let mut runs: Vec<Run> = newer.into_iter().map(|(_, run)| run).collect();
        runs.append(&mut self.runs);
        self.runs = runs;

        for run_id in &dropped {
            self.forget(run_id, ticket);
        }
        dropped
    }

    fn forget(&mut self, run_id: &str, ticket: Ticket) {
        self.tickets.remove(run_id);
        let floor = self.removed.entry(run_id.to_string()).or_insert(0);
        *floor = (*floor).max(ticket);
    }

    /// Snapshot of every list, for a full cache write.
    pub fn to_patch(&self) -> SnapshotPatch {
        SnapshotPatch {
            datasets: Some(self.datasets.clone()),
            algorithms: Some(self.algorithms.clone()),
            presets: Some(self.presets.clone()),
            runs: Some(self.runs.clone()),
        }
    }
}

/// State shared by the catalog reconciler and the run manager.
pub struct Shared {
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) cache: CacheWriter,
    pub(crate) state: RwLock<SessionState>,
    pub(crate) events: broadcast::Sender<SyncEvent>,
    sequence: AtomicU64,
}

impl Shared {
    pub fn new(backend: Arc<dyn Backend>, cache: CacheWriter, state: SessionState) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            backend,
            cache,
            state: RwLock::new(state),
            events,
            sequence: AtomicU64::new(0),
        }
    }

    /// Draw the next freshness ticket.
    pub fn ticket(&self) -> Ticket {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish an event; having no subscribers is fine.
    pub fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }
}

/// Insert or replace an entry by id. New entries go to the front.
pub(crate) fn upsert_by_id<T>(list: &mut Vec<T>, item: T, id_of: impl Fn(&T) -> &str) {
    let id = id_of(&item).to_string();
    match list.iter().position(|existing| id_of(existing) == id) {
        Some(idx) => list[idx] = item,
        None => list.insert(0, item),
    }
}

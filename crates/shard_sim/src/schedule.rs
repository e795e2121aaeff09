//! The scheduled-event table.
//!
//! Every in-flight travel and construction owns a [`Completion`] stored here
//! under the entity's id, and every producing mine owns a repeating timer.
//! Entities themselves carry no task handles: cancelling is a lookup in this
//! table.
//!
//! A completion resolves twice over. Two seconds before it is due, its
//! "almost done" marker flips; readers that find the marker set stop waiting
//! and accept the pre-completion state. At the due instant the finish
//! handler runs and the outcome resolves.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use shard_model::{BuildingId, UnitId};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::clock::{Clock, before};
use crate::timer::TimerHandle;

/// Lead time of the "almost done" marker.
pub const ALMOST_DONE_LEAD: Duration = Duration::from_secs(2);

/// Resolution of a scheduled completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Completed,
    Cancelled,
}

/// One scheduled state-machine completion.
#[derive(Debug)]
pub struct Completion {
    due: DateTime<Utc>,
    almost: watch::Sender<bool>,
    outcome: watch::Sender<Outcome>,
    task: Mutex<Option<AbortHandle>>,
}

impl Completion {
    fn new(due: DateTime<Utc>) -> Self {
        Self {
            due,
            almost: watch::Sender::new(false),
            outcome: watch::Sender::new(Outcome::Pending),
            task: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn due(&self) -> DateTime<Utc> {
        self.due
    }

    /// Returns `true` once the almost-done marker has fired.
    #[must_use]
    pub fn is_almost_done(&self) -> bool {
        *self.almost.borrow()
    }

    #[must_use]
    pub fn outcome(&self) -> Outcome {
        *self.outcome.borrow()
    }

    /// Suspend until the completion resolves.
    pub async fn wait(&self) -> Outcome {
        let mut rx = self.outcome.subscribe();
        match rx.wait_for(|o| *o != Outcome::Pending).await {
            Ok(outcome) => *outcome,
            Err(_) => Outcome::Cancelled,
        }
    }

    /// Resolve once. Later calls are ignored.
    fn resolve(&self, outcome: Outcome) -> bool {
        self.outcome.send_if_modified(|current| {
            if *current == Outcome::Pending {
                *current = outcome;
                true
            } else {
                false
            }
        })
    }

    fn cancel(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.resolve(Outcome::Cancelled);
    }
}

/// Per-entity table of scheduled work.
#[derive(Debug, Default)]
pub struct Schedule {
    travels: DashMap<UnitId, Arc<Completion>>,
    constructions: DashMap<BuildingId, Arc<Completion>>,
    extractions: DashMap<BuildingId, TimerHandle>,
}

impl Schedule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Travel ──────────────────────────────────────────────────────────────

    /// Schedule the arrival of `unit`, `duration` from now, at `due`.
    ///
    /// `arrive` runs at the due instant; its result resolves the completion.
    pub fn schedule_travel<F>(
        self: &Arc<Self>,
        clock: Arc<dyn Clock>,
        unit: UnitId,
        due: DateTime<Utc>,
        duration: Duration,
        arrive: F,
    ) -> Arc<Completion>
    where
        F: FnOnce() -> Outcome + Send + 'static,
    {
        let completion = Arc::new(Completion::new(due));
        if let Some(previous) = self.travels.insert(unit.clone(), completion.clone()) {
            previous.cancel();
        }
        let schedule = Arc::clone(self);
        start_completion(&completion, clock, duration, arrive, move |done| {
            schedule.travels.remove_if(&unit, |_, c| Arc::ptr_eq(c, done));
        });
        completion
    }

    /// The pending arrival of `unit`, if it is travelling.
    #[must_use]
    pub fn travel(&self, unit: &UnitId) -> Option<Arc<Completion>> {
        self.travels.get(unit).map(|c| c.value().clone())
    }

    /// Cancel the pending arrival of `unit`. Returns `true` if one existed.
    pub fn cancel_travel(&self, unit: &UnitId) -> bool {
        match self.travels.remove(unit) {
            Some((_, completion)) => {
                completion.cancel();
                debug!(unit_id = %unit, "travel cancelled");
                true
            }
            None => false,
        }
    }

    // ── Construction ────────────────────────────────────────────────────────

    /// Schedule the completion of `building`, `duration` from now, at `due`.
    pub fn schedule_construction<F>(
        self: &Arc<Self>,
        clock: Arc<dyn Clock>,
        building: BuildingId,
        due: DateTime<Utc>,
        duration: Duration,
        finish: F,
    ) -> Arc<Completion>
    where
        F: FnOnce() -> Outcome + Send + 'static,
    {
        let completion = Arc::new(Completion::new(due));
        if let Some(previous) = self.constructions.insert(building.clone(), completion.clone()) {
            previous.cancel();
        }
        let schedule = Arc::clone(self);
        start_completion(&completion, clock, duration, finish, move |done| {
            schedule.constructions.remove_if(&building, |_, c| Arc::ptr_eq(c, done));
        });
        completion
    }

    /// The pending completion of `building`, if it is being built.
    #[must_use]
    pub fn construction(&self, building: &BuildingId) -> Option<Arc<Completion>> {
        self.constructions.get(building).map(|c| c.value().clone())
    }

    /// Cancel the pending completion of `building`. Returns `true` if one
    /// existed.
    pub fn cancel_construction(&self, building: &BuildingId) -> bool {
        match self.constructions.remove(building) {
            Some((_, completion)) => {
                completion.cancel();
                debug!(building_id = %building, "construction cancelled");
                true
            }
            None => false,
        }
    }

    // ── Extraction ──────────────────────────────────────────────────────────

    /// Keep `timer` running for `mine`, replacing any previous timer.
    pub fn track_extraction(&self, mine: BuildingId, timer: TimerHandle) {
        self.extractions.insert(mine, timer);
    }

    /// Returns `true` while `mine` has a live extraction timer.
    #[must_use]
    pub fn is_extracting(&self, mine: &BuildingId) -> bool {
        self.extractions
            .get(mine)
            .is_some_and(|timer| !timer.is_finished())
    }

    /// Stop extraction for `mine`. Returns `true` if a timer existed.
    pub fn stop_extraction(&self, mine: &BuildingId) -> bool {
        self.extractions.remove(mine).is_some()
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Number of pending travels, constructions and extraction timers.
    #[must_use]
    pub fn pending(&self) -> (usize, usize, usize) {
        (self.travels.len(), self.constructions.len(), self.extractions.len())
    }

    /// Cancel every pending completion and stop every timer.
    pub fn clear(&self) {
        let units: Vec<UnitId> = self.travels.iter().map(|e| e.key().clone()).collect();
        for unit in units {
            self.cancel_travel(&unit);
        }
        let buildings: Vec<BuildingId> =
            self.constructions.iter().map(|e| e.key().clone()).collect();
        for building in buildings {
            self.cancel_construction(&building);
        }
        self.extractions.clear();
    }
}

/// Drive `completion` to its due instant on a background task.
///
/// The caller must already have stored `completion` in its table.
fn start_completion<F, R>(
    completion: &Arc<Completion>,
    clock: Arc<dyn Clock>,
    duration: Duration,
    finish: F,
    release: R,
) where
    F: FnOnce() -> Outcome + Send + 'static,
    R: FnOnce(&Arc<Completion>) + Send + 'static,
{
    let due = completion.due;
    let task_completion = Arc::clone(completion);
    let task = tokio::spawn(async move {
        if duration > ALMOST_DONE_LEAD {
            clock.delay_until(before(due, ALMOST_DONE_LEAD)).await;
            task_completion.almost.send_replace(true);
        }
        clock.delay_until(due).await;
        // Cancelled before the abort handle was stored.
        if task_completion.outcome() != Outcome::Pending {
            return;
        }
        let outcome = finish();
        release(&task_completion);
        task_completion.resolve(outcome);
    });
    *completion.task.lock() = Some(task.abort_handle());
}

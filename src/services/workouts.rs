// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout collection store.
//!
//! Keeps a local copy of the user's workouts and the dashboard summary in
//! step with the server. Nothing is applied until the server confirms it.
//! Once a delete is confirmed it wins over any response still in flight for
//! the same id.
//!
//! Each confirmed delete gets a sequence number. An operation remembers the
//! sequence number current when it started and only honors tombstones newer
//! than that. A tombstone is dropped once every operation that started
//! before it has finished.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::error::{AppError, Result};
use crate::models::{WorkoutDraft, WorkoutId, WorkoutRecord, WorkoutSummary};
use crate::services::http::ApiClient;
use crate::time_utils;

/// Snapshot of the workout cache.
#[derive(Debug, Clone, Default)]
pub struct WorkoutState {
    pub records: Vec<WorkoutRecord>,
    pub summary: Option<WorkoutSummary>,
    pub is_loading: bool,
    pub last_error: Option<AppError>,
    /// When the list was last replaced from the server
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Confirmed deletions, keyed by id, valued by delete sequence number
    deleted: HashMap<WorkoutId, u64>,
    delete_seq: u64,
    /// Bumped by `clear()` so responses from before it are dropped
    epoch: u64,
    /// Running operations, counted by the delete sequence they started at
    active: BTreeMap<u64, usize>,
}

impl WorkoutState {
    pub fn get(&self, id: WorkoutId) -> Option<&WorkoutRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: WorkoutId) -> bool {
        self.get(id).is_some()
    }

    fn upsert(&mut self, record: WorkoutRecord) {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    /// True if `id` was deleted after an operation that started at `since`.
    fn deleted_since(&self, id: WorkoutId, since: u64) -> bool {
        self.deleted.get(&id).is_some_and(|&seq| seq > since)
    }

    fn record_delete(&mut self, id: WorkoutId) {
        self.delete_seq += 1;
        self.deleted.insert(id, self.delete_seq);
        self.records.retain(|r| r.id != id);
    }

    /// Drop tombstones no running operation can still trip over.
    fn prune_tombstones(&mut self) {
        match self.active.keys().next().copied() {
            Some(oldest) => self.deleted.retain(|_, seq| *seq > oldest),
            None => self.deleted.clear(),
        }
    }
}

/// Workout list and summary exposed to the UI layer.
pub struct WorkoutStore {
    api: ApiClient,
    state: watch::Sender<WorkoutState>,
}

/// Keeps `is_loading` set while an operation is running.
struct InFlight<'a> {
    state: &'a watch::Sender<WorkoutState>,
    epoch: u64,
    /// Delete sequence at start
    seq: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| {
            if let Some(count) = s.active.get_mut(&self.seq) {
                *count -= 1;
                if *count == 0 {
                    s.active.remove(&self.seq);
                }
            }
            s.is_loading = !s.active.is_empty();
            s.prune_tombstones();
        });
    }
}

impl WorkoutStore {
    pub fn new(api: ApiClient) -> Self {
        let (state, _) = watch::channel(WorkoutState::default());
        Self { api, state }
    }

    pub fn snapshot(&self) -> WorkoutState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkoutState> {
        self.state.subscribe()
    }

    /// Drop everything cached (on sign-out).
    pub fn clear(&self) {
        self.state.send_modify(|s| {
            s.records.clear();
            s.summary = None;
            s.last_error = None;
            s.last_synced_at = None;
            s.deleted.clear();
            s.epoch += 1;
        });
        tracing::debug!("Workout cache cleared");
    }

    fn start(&self) -> InFlight<'_> {
        let (mut epoch, mut seq) = (0, 0);
        self.state.send_modify(|s| {
            *s.active.entry(s.delete_seq).or_default() += 1;
            s.is_loading = true;
            epoch = s.epoch;
            seq = s.delete_seq;
        });
        InFlight {
            state: &self.state,
            epoch,
            seq,
        }
    }

    /// Apply `f` unless the cache was cleared since `op` started.
    fn apply<T>(
        &self,
        op: &InFlight<'_>,
        f: impl FnOnce(&mut WorkoutState) -> Option<T>,
    ) -> Option<T> {
        let mut out = None;
        self.state.send_if_modified(|s| {
            if s.epoch != op.epoch {
                return false;
            }
            out = f(s);
            out.is_some()
        });
        out
    }

    fn fail(&self, op: &InFlight<'_>, error: AppError) -> AppError {
        self.apply(op, |s| {
            s.last_error = Some(error.clone());
            Some(())
        });
        error
    }

    fn cleared() -> AppError {
        AppError::Stale("workout cache was cleared while the request was in flight".to_string())
    }

    /// Replace the cache with the server's list.
    pub async fn fetch_all(&self) -> Result<Vec<WorkoutRecord>> {
        let op = self.start();

        let fetched = match self.api.list_workouts().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch workouts");
                return Err(self.fail(&op, e));
            }
        };

        let records = self
            .apply(&op, |s| {
                let mut seen = HashSet::new();
                let records: Vec<WorkoutRecord> = fetched
                    .into_iter()
                    .filter(|r| !s.deleted_since(r.id, op.seq) && seen.insert(r.id))
                    .collect();
                s.records = records.clone();
                s.last_error = None;
                s.last_synced_at = Some(Utc::now());
                Some(records)
            })
            .ok_or_else(Self::cleared)?;

        tracing::debug!(count = records.len(), "Fetched workouts");
        Ok(records)
    }

    /// Fetch one workout and upsert it into the cache.
    pub async fn fetch_one(&self, id: WorkoutId) -> Result<WorkoutRecord> {
        let op = self.start();

        let record = match self.api.get_workout(id).await {
            Ok(record) => record,
            Err(e) => return Err(self.fail(&op, e)),
        };

        self.apply(&op, |s| {
            if s.deleted_since(record.id, op.seq) {
                return None;
            }
            s.upsert(record.clone());
            Some(())
        })
        .ok_or_else(|| AppError::Stale(format!("workout {} was deleted", id)))?;

        Ok(record)
    }

    /// Validate and create a workout.
    pub async fn create(&self, draft: &WorkoutDraft) -> Result<WorkoutRecord> {
        draft.check()?;
        let op = self.start();

        let record = match self.api.create_workout(draft).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to create workout");
                return Err(self.fail(&op, e));
            }
        };

        self.apply(&op, |s| {
            s.upsert(record.clone());
            s.last_error = None;
            Some(())
        })
        .ok_or_else(Self::cleared)?;

        tracing::info!(id = record.id, workout_type = %record.workout_type, "Workout created");
        self.refresh_summary(&op).await;
        Ok(record)
    }

    /// Validate and replace a workout, upserting the server's copy.
    ///
    /// If a delete of the same id was confirmed while the request was in
    /// flight, the response is dropped and `Stale` is returned.
    pub async fn update(&self, id: WorkoutId, draft: &WorkoutDraft) -> Result<WorkoutRecord> {
        draft.check()?;
        let op = self.start();

        let record = match self.api.update_workout(id, draft).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(id, error = %e, "Failed to update workout");
                return Err(self.fail(&op, e));
            }
        };

        let mut deleted = false;
        let applied = self.apply(&op, |s| {
            if s.deleted_since(id, op.seq) {
                deleted = true;
                return None;
            }
            s.upsert(record.clone());
            s.last_error = None;
            Some(())
        });
        if deleted {
            tracing::warn!(id, "Discarding update response for a deleted workout");
            return Err(AppError::Stale(format!("workout {} was deleted", id)));
        }
        if applied.is_none() {
            return Err(Self::cleared());
        }

        tracing::info!(id, "Workout updated");
        self.refresh_summary(&op).await;
        Ok(record)
    }

    /// Delete a workout. The cache changes only after the server confirms.
    pub async fn remove(&self, id: WorkoutId) -> Result<()> {
        let op = self.start();

        if let Err(e) = self.api.delete_workout(id).await {
            tracing::warn!(id, error = %e, "Failed to delete workout");
            return Err(self.fail(&op, e));
        }

        self.apply(&op, |s| {
            s.record_delete(id);
            s.last_error = None;
            Some(())
        })
        .ok_or_else(Self::cleared)?;

        tracing::info!(id, "Workout deleted");
        self.refresh_summary(&op).await;
        Ok(())
    }

    /// Replace the summary with the server's.
    pub async fn fetch_summary(&self) -> Result<WorkoutSummary> {
        let op = self.start();

        let summary = match self.api.get_summary().await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch workout summary");
                return Err(self.fail(&op, e));
            }
        };

        self.apply(&op, |s| {
            s.summary = Some(summary.clone());
            s.last_error = None;
            Some(())
        })
        .ok_or_else(Self::cleared)?;

        Ok(summary)
    }

    /// Summary refresh after a mutation. Falls back to deriving it from the
    /// cache; never fails the mutation.
    async fn refresh_summary(&self, op: &InFlight<'_>) {
        match self.api.get_summary().await {
            Ok(summary) => {
                self.apply(op, |s| {
                    s.summary = Some(summary);
                    Some(())
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Summary refresh failed, deriving from cache");
                let today = time_utils::today();
                self.apply(op, |s| {
                    s.summary = Some(WorkoutSummary::from_records(&s.records, today));
                    Some(())
                });
            }
        }
    }
}

//! Progress reconciliation against the ledger store.
//!
//! The reconciler owns today's in-memory progress and the injected store.
//! A write is two-phase: the clamped target is applied locally first, then
//! committed to the store. A failed commit is reported in the outcome but the
//! local value is kept; the next [`ProgressReconciler::refresh`] is the
//! recovery path.
//!
//! Duplicate rows for a day are collapsed on the next write that touches it:
//! the first row returned by the store is kept and updated, the rest are
//! deleted. The target is computed from the in-memory count, so the deleted
//! rows' counts are discarded rather than folded in.

use crate::store::LedgerStore;
use crate::{DailyProgress, EntryId, Error, ExerciseKind, Result};
use chrono::NaiveDate;

/// What the commit phase did with the store
#[derive(Debug)]
pub enum SyncStatus {
    /// Target equalled the current count; the store was not contacted
    Unchanged,
    /// No row existed for the day and one was created
    Inserted(EntryId),
    /// The canonical row was updated; `merged` lists deleted duplicates
    Updated { id: EntryId, merged: Vec<EntryId> },
    /// A store call failed. The optimistic count is still in effect.
    Failed(Error),
}

/// Result of [`ProgressReconciler::apply_delta`]
#[derive(Debug)]
pub struct DeltaOutcome {
    pub exercise: ExerciseKind,
    pub requested: i64,
    pub previous: u32,
    pub count: u32,
    pub status: SyncStatus,
}

impl DeltaOutcome {
    /// The applied change differs from the requested one
    pub fn clamped(&self) -> bool {
        i64::from(self.count) - i64::from(self.previous) != self.requested
    }

    pub fn is_synced(&self) -> bool {
        !matches!(self.status, SyncStatus::Failed(_))
    }

    /// New count, or the commit failure
    pub fn into_result(self) -> Result<u32> {
        match self.status {
            SyncStatus::Failed(e) => Err(e),
            _ => Ok(self.count),
        }
    }
}

/// Clamp `current + delta` into `[0, goal]`
pub fn clamp_target(current: u32, delta: i64, goal: u32) -> u32 {
    let raw = i64::from(current).saturating_add(delta);
    raw.clamp(0, i64::from(goal)) as u32
}

/// Keeps one day's progress in step with the ledger store
pub struct ProgressReconciler<S: LedgerStore> {
    store: S,
    progress: DailyProgress,
}

impl<S: LedgerStore> ProgressReconciler<S> {
    /// Start from zero-state for `date` without reading the store
    pub fn new(store: S, date: NaiveDate) -> Self {
        Self {
            store,
            progress: DailyProgress::empty(date),
        }
    }

    /// Start from the store's current totals for `date`
    pub fn load(store: S, date: NaiveDate) -> Result<Self> {
        let mut reconciler = Self::new(store, date);
        reconciler.refresh()?;
        Ok(reconciler)
    }

    /// Recompute the held day from the store.
    ///
    /// Totals are sums over every row, duplicates included, and are not
    /// clamped. On failure the last known progress is left in place.
    pub fn refresh(&mut self) -> Result<()> {
        self.progress = self.read_day(self.progress.date)?;
        tracing::debug!("Loaded progress for {}", self.progress.date);
        Ok(())
    }

    /// Switch to another day and load it.
    ///
    /// If the read fails the reconciler stays on the previous day.
    pub fn roll_to(&mut self, date: NaiveDate) -> Result<()> {
        if date == self.progress.date {
            return Ok(());
        }
        self.progress = self.read_day(date)?;
        tracing::debug!("Rolled over to {}", date);
        Ok(())
    }

    fn read_day(&self, date: NaiveDate) -> Result<DailyProgress> {
        let mut fresh = DailyProgress::empty(date);

        for kind in ExerciseKind::ALL {
            let rows = self
                .store
                .fetch_entries(kind, date)
                .map_err(|e| Error::read(Some(kind), e))?;
            if rows.len() > 1 {
                tracing::debug!("{} duplicate {} rows on {}", rows.len(), kind, date);
            }
            for row in rows {
                fresh.accumulate(kind, row.count);
            }
        }

        Ok(fresh)
    }

    pub fn date(&self) -> NaiveDate {
        self.progress.date
    }

    pub fn current_count(&self, exercise: ExerciseKind) -> u32 {
        self.progress.count(exercise)
    }

    pub fn progress(&self) -> &DailyProgress {
        &self.progress
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn increment(&mut self, exercise: ExerciseKind, amount: u32) -> DeltaOutcome {
        self.apply_delta(exercise, i64::from(amount))
    }

    pub fn decrement(&mut self, exercise: ExerciseKind, amount: u32) -> DeltaOutcome {
        self.apply_delta(exercise, -i64::from(amount))
    }

    /// Apply a bounded change and commit it to the store.
    ///
    /// The returned count is always within `[0, goal]`. Taking `&mut self`
    /// means one commit sequence at a time per reconciler.
    pub fn apply_delta(&mut self, exercise: ExerciseKind, delta: i64) -> DeltaOutcome {
        let previous = self.current_count(exercise);
        let target = clamp_target(previous, delta, exercise.goal());

        let mut outcome = DeltaOutcome {
            exercise,
            requested: delta,
            previous,
            count: target,
            status: SyncStatus::Unchanged,
        };

        if target == previous {
            return outcome;
        }

        self.progress.set(exercise, target);

        outcome.status = match self.commit(exercise, target) {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(
                    "Could not sync {} = {} for {}: {}",
                    exercise,
                    target,
                    self.progress.date,
                    e
                );
                SyncStatus::Failed(e)
            }
        };
        outcome
    }

    fn commit(&mut self, exercise: ExerciseKind, target: u32) -> Result<SyncStatus> {
        let date = self.progress.date;
        let rows = self
            .store
            .fetch_entries(exercise, date)
            .map_err(|e| Error::read(Some(exercise), e))?;

        let Some((canonical, duplicates)) = rows.split_first() else {
            let entry = self
                .store
                .insert_entry(exercise, target, date)
                .map_err(|e| Error::write("insert", e))?;
            tracing::info!("Recorded {} = {} for {}", exercise, target, date);
            return Ok(SyncStatus::Inserted(entry.id));
        };

        self.store
            .update_entry(canonical.id, target)
            .map_err(|e| Error::write("update", e))?;

        let merged: Vec<EntryId> = duplicates.iter().map(|e| e.id).collect();
        if !merged.is_empty() {
            let discarded: u64 = duplicates.iter().map(|e| u64::from(e.count)).sum();
            // Duplicate counts are dropped, not summed into the target
            tracing::warn!(
                "Collapsing {} duplicate {} rows for {} (discarding {} from them)",
                merged.len(),
                exercise,
                date,
                discarded
            );
            self.store
                .delete_entries(&merged)
                .map_err(|e| Error::write("delete", e))?;
        }

        tracing::info!("Updated {} = {} for {}", exercise, target, date);
        Ok(SyncStatus::Updated {
            id: canonical.id,
            merged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLedgerStore;
    use crate::LedgerEntry;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 14).unwrap()
    }

    fn entry(exercise: ExerciseKind, count: u32, date: NaiveDate) -> LedgerEntry {
        LedgerEntry {
            id: EntryId::new(),
            exercise,
            count,
            date,
        }
    }

    fn rows_for(store: &MemoryLedgerStore, exercise: ExerciseKind) -> Vec<LedgerEntry> {
        store.fetch_entries(exercise, today()).unwrap()
    }

    /// Store whose calls can be made to fail one kind at a time
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryLedgerStore,
        fail_fetch: bool,
        fail_insert: bool,
        fail_update: bool,
        fail_delete: bool,
        calls: usize,
    }

    fn offline() -> Error {
        Error::Other("store offline".into())
    }

    impl LedgerStore for FlakyStore {
        fn fetch_entries(&self, exercise: ExerciseKind, date: NaiveDate) -> Result<Vec<LedgerEntry>> {
            if self.fail_fetch {
                return Err(offline());
            }
            self.inner.fetch_entries(exercise, date)
        }

        fn fetch_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<LedgerEntry>> {
            self.inner.fetch_range(from, to)
        }

        fn insert_entry(&mut self, exercise: ExerciseKind, count: u32, date: NaiveDate) -> Result<LedgerEntry> {
            self.calls += 1;
            if self.fail_insert {
                return Err(offline());
            }
            self.inner.insert_entry(exercise, count, date)
        }

        fn update_entry(&mut self, id: EntryId, count: u32) -> Result<()> {
            self.calls += 1;
            if self.fail_update {
                return Err(offline());
            }
            self.inner.update_entry(id, count)
        }

        fn delete_entries(&mut self, ids: &[EntryId]) -> Result<()> {
            self.calls += 1;
            if self.fail_delete {
                return Err(offline());
            }
            self.inner.delete_entries(ids)
        }
    }

    #[test]
    fn test_clamp_target_bounds() {
        assert_eq!(clamp_target(95, 10, 100), 100);
        assert_eq!(clamp_target(3, -10, 100), 0);
        assert_eq!(clamp_target(50, 0, 100), 50);
        assert_eq!(clamp_target(0, i64::MAX, 10), 10);
        assert_eq!(clamp_target(u32::MAX, i64::MIN, 10), 0);
    }

    #[test]
    fn test_result_always_within_goal() {
        let mut reconciler = ProgressReconciler::new(MemoryLedgerStore::new(), today());
        let deltas = [0, 1, -1, 10, -10, 55, 200, -500, 99, 3, -2];

        for kind in ExerciseKind::ALL {
            for &d in &deltas {
                let outcome = reconciler.apply_delta(kind, d);
                assert!(outcome.count <= kind.goal());
                assert_eq!(reconciler.current_count(kind), outcome.count);
            }
        }
    }

    #[test]
    fn test_zero_delta_touches_nothing() {
        let store = FlakyStore {
            inner: MemoryLedgerStore::with_entries(vec![entry(ExerciseKind::Pushups, 40, today())]),
            ..Default::default()
        };
        let mut reconciler = ProgressReconciler::load(store, today()).unwrap();

        let outcome = reconciler.apply_delta(ExerciseKind::Pushups, 0);
        assert!(matches!(outcome.status, SyncStatus::Unchanged));
        assert_eq!(outcome.count, 40);
        assert_eq!(reconciler.current_count(ExerciseKind::Pushups), 40);
        assert_eq!(reconciler.store().calls, 0);
        assert_eq!(reconciler.store().inner.entries()[0].count, 40);
    }

    #[test]
    fn test_clamped_at_goal_is_noop_when_already_there() {
        let mut reconciler = ProgressReconciler::new(MemoryLedgerStore::new(), today());
        reconciler.apply_delta(ExerciseKind::Running, 10);

        let outcome = reconciler.apply_delta(ExerciseKind::Running, 5);
        assert_eq!(outcome.count, 10);
        assert!(outcome.clamped());
        assert!(matches!(outcome.status, SyncStatus::Unchanged));
    }

    #[test]
    fn test_increment_clamps_to_goal() {
        let store = MemoryLedgerStore::with_entries(vec![entry(ExerciseKind::Pushups, 95, today())]);
        let mut reconciler = ProgressReconciler::load(store, today()).unwrap();

        let outcome = reconciler.apply_delta(ExerciseKind::Pushups, 10);
        assert_eq!(outcome.count, 100);
        assert!(outcome.clamped());
        assert_eq!(rows_for(reconciler.store(), ExerciseKind::Pushups)[0].count, 100);
    }

    #[test]
    fn test_decrement_clamps_to_zero() {
        let store = MemoryLedgerStore::with_entries(vec![entry(ExerciseKind::Situps, 3, today())]);
        let mut reconciler = ProgressReconciler::load(store, today()).unwrap();

        let outcome = reconciler.decrement(ExerciseKind::Situps, 10);
        assert_eq!(outcome.count, 0);
        assert!(outcome.clamped());
        assert_eq!(rows_for(reconciler.store(), ExerciseKind::Situps)[0].count, 0);
    }

    #[test]
    fn test_insert_then_update_same_row() {
        let mut reconciler = ProgressReconciler::load(MemoryLedgerStore::new(), today()).unwrap();

        let first = reconciler.apply_delta(ExerciseKind::Pushups, 10);
        let SyncStatus::Inserted(id) = first.status else {
            panic!("expected insert, got {:?}", first.status);
        };
        assert_eq!(first.count, 10);

        let second = reconciler.apply_delta(ExerciseKind::Pushups, 5);
        assert_eq!(second.count, 15);
        assert!(!second.clamped());
        match second.status {
            SyncStatus::Updated { id: updated, ref merged } => {
                assert_eq!(updated, id);
                assert!(merged.is_empty());
            }
            ref other => panic!("expected update, got {:?}", other),
        }

        let rows = rows_for(reconciler.store(), ExerciseKind::Pushups);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].count, 15);
    }

    #[test]
    fn test_duplicates_collapse_to_target_from_memory() {
        crate::logging::init_test();
        let first = entry(ExerciseKind::Squats, 40, today());
        let second = entry(ExerciseKind::Squats, 20, today());
        let store = MemoryLedgerStore::with_entries(vec![first.clone(), second.clone()]);
        // In-memory count has not been loaded from the store
        let mut reconciler = ProgressReconciler::new(store, today());

        let outcome = reconciler.apply_delta(ExerciseKind::Squats, 5);
        assert_eq!(outcome.count, 5);
        match outcome.status {
            SyncStatus::Updated { id, ref merged } => {
                assert_eq!(id, first.id);
                assert_eq!(merged, &vec![second.id]);
            }
            ref other => panic!("expected update, got {:?}", other),
        }

        let rows = rows_for(reconciler.store(), ExerciseKind::Squats);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, first.id);
        assert_eq!(rows[0].count, 5);
    }

    #[test]
    fn test_many_duplicates_leave_exactly_one_row() {
        let mut seeded: Vec<_> = (1..=5).map(|c| entry(ExerciseKind::Pushups, c * 10, today())).collect();
        let other_day = entry(ExerciseKind::Pushups, 7, today().pred_opt().unwrap());
        seeded.push(other_day.clone());
        let mut reconciler =
            ProgressReconciler::load(MemoryLedgerStore::with_entries(seeded), today()).unwrap();
        assert_eq!(reconciler.current_count(ExerciseKind::Pushups), 150);

        let outcome = reconciler.decrement(ExerciseKind::Pushups, 1);
        // 150 loaded, minus one, clamped to the goal
        assert_eq!(outcome.count, 100);

        let rows = rows_for(reconciler.store(), ExerciseKind::Pushups);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].count, 100);
        assert!(reconciler.store().entries().contains(&other_day));
    }

    #[test]
    fn test_load_sums_duplicates_unclamped() {
        let store = MemoryLedgerStore::with_entries(vec![
            entry(ExerciseKind::Pushups, 30, today()),
            entry(ExerciseKind::Pushups, 20, today()),
            entry(ExerciseKind::Running, 12, today()),
            entry(ExerciseKind::Squats, 99, today().succ_opt().unwrap()),
        ]);
        let reconciler = ProgressReconciler::load(store, today()).unwrap();

        assert_eq!(reconciler.current_count(ExerciseKind::Pushups), 50);
        assert_eq!(reconciler.current_count(ExerciseKind::Running), 12);
        assert_eq!(reconciler.current_count(ExerciseKind::Squats), 0);
    }

    #[test]
    fn test_load_failure_is_remote_read() {
        let store = FlakyStore {
            fail_fetch: true,
            ..Default::default()
        };
        let result = ProgressReconciler::load(store, today());
        assert!(matches!(result, Err(Error::RemoteRead { .. })));
    }

    #[test]
    fn test_refresh_failure_keeps_last_known() {
        let store = FlakyStore {
            inner: MemoryLedgerStore::with_entries(vec![entry(ExerciseKind::Situps, 33, today())]),
            ..Default::default()
        };
        let mut reconciler = ProgressReconciler::load(store, today()).unwrap();

        reconciler.store_mut().fail_fetch = true;
        assert!(matches!(reconciler.refresh(), Err(Error::RemoteRead { .. })));
        assert_eq!(reconciler.current_count(ExerciseKind::Situps), 33);
    }

    #[test]
    fn test_write_failure_keeps_optimistic_value() {
        let store = FlakyStore {
            fail_insert: true,
            ..Default::default()
        };
        let mut reconciler = ProgressReconciler::load(store, today()).unwrap();

        let outcome = reconciler.apply_delta(ExerciseKind::Squats, 12);
        assert_eq!(outcome.count, 12);
        assert!(!outcome.is_synced());
        assert!(matches!(
            outcome.status,
            SyncStatus::Failed(Error::RemoteWrite { op: "insert", .. })
        ));
        assert_eq!(reconciler.current_count(ExerciseKind::Squats), 12);
        assert!(reconciler.store().inner.entries().is_empty());
    }

    #[test]
    fn test_commit_read_failure_keeps_optimistic_value() {
        let mut reconciler = ProgressReconciler::new(
            FlakyStore {
                fail_fetch: true,
                ..Default::default()
            },
            today(),
        );

        let outcome = reconciler.increment(ExerciseKind::Pushups, 4);
        assert!(matches!(outcome.into_result(), Err(Error::RemoteRead { .. })));
        assert_eq!(reconciler.current_count(ExerciseKind::Pushups), 4);
    }

    #[test]
    fn test_failed_delete_still_updates_canonical_row() {
        let first = entry(ExerciseKind::Squats, 40, today());
        let second = entry(ExerciseKind::Squats, 20, today());
        let store = FlakyStore {
            inner: MemoryLedgerStore::with_entries(vec![first.clone(), second]),
            fail_delete: true,
            ..Default::default()
        };
        let mut reconciler = ProgressReconciler::new(store, today());

        let outcome = reconciler.apply_delta(ExerciseKind::Squats, 5);
        assert!(matches!(
            outcome.status,
            SyncStatus::Failed(Error::RemoteWrite { op: "delete", .. })
        ));

        let rows = reconciler.store().inner.entries().to_vec();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, first.id);
        assert_eq!(rows[0].count, 5);
    }

    #[test]
    fn test_recovery_after_failed_write() {
        let mut reconciler = ProgressReconciler::new(
            FlakyStore {
                fail_update: true,
                inner: MemoryLedgerStore::with_entries(vec![entry(ExerciseKind::Pushups, 10, today())]),
                ..Default::default()
            },
            today(),
        );
        reconciler.refresh().unwrap();

        let outcome = reconciler.increment(ExerciseKind::Pushups, 5);
        assert!(!outcome.is_synced());
        assert_eq!(reconciler.current_count(ExerciseKind::Pushups), 15);

        // Reload restores the store's view
        reconciler.refresh().unwrap();
        assert_eq!(reconciler.current_count(ExerciseKind::Pushups), 10);
    }

    #[test]
    fn test_roll_to_new_day_starts_from_store() {
        let tomorrow = today().succ_opt().unwrap();
        let store = MemoryLedgerStore::with_entries(vec![entry(ExerciseKind::Running, 3, tomorrow)]);
        let mut reconciler = ProgressReconciler::new(store, today());
        reconciler.apply_delta(ExerciseKind::Pushups, 20);

        reconciler.roll_to(tomorrow).unwrap();
        assert_eq!(reconciler.date(), tomorrow);
        assert_eq!(reconciler.current_count(ExerciseKind::Pushups), 0);
        assert_eq!(reconciler.current_count(ExerciseKind::Running), 3);
    }

    #[test]
    fn test_failed_roll_to_stays_on_previous_day() {
        let tomorrow = today().succ_opt().unwrap();
        let store = FlakyStore {
            inner: MemoryLedgerStore::with_entries(vec![
                entry(ExerciseKind::Pushups, 40, today()),
                entry(ExerciseKind::Running, 3, tomorrow),
            ]),
            ..Default::default()
        };
        let mut reconciler = ProgressReconciler::load(store, today()).unwrap();

        reconciler.store_mut().fail_fetch = true;
        assert!(matches!(reconciler.roll_to(tomorrow), Err(Error::RemoteRead { .. })));
        assert_eq!(reconciler.date(), today());
        assert_eq!(reconciler.current_count(ExerciseKind::Pushups), 40);

        reconciler.store_mut().fail_fetch = false;
        reconciler.roll_to(tomorrow).unwrap();
        assert_eq!(reconciler.date(), tomorrow);
        assert_eq!(reconciler.current_count(ExerciseKind::Pushups), 0);
        assert_eq!(reconciler.current_count(ExerciseKind::Running), 3);
    }
}

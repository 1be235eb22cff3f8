//! Multi-day progress view.
//!
//! Rows are grouped by calendar date and summed per exercise. Duplicate rows
//! that have not been collapsed yet inflate the sums; that window closes the
//! next time the reconciler writes to the affected day.

use crate::store::LedgerStore;
use crate::{DailyProgress, Error, ExerciseKind, LedgerEntry, Result};
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};

/// Group entries by date and sum counts per exercise, newest date first
pub fn aggregate_by_date(entries: &[LedgerEntry]) -> Vec<DailyProgress> {
    let mut by_date: BTreeMap<NaiveDate, DailyProgress> = BTreeMap::new();

    for entry in entries {
        by_date
            .entry(entry.date)
            .or_insert_with(|| DailyProgress::empty(entry.date))
            .accumulate(entry.exercise, entry.count);
    }

    by_date.into_values().rev().collect()
}

/// First day of a `days`-long window ending on `today`
pub fn window_start(today: NaiveDate, days: u32) -> Result<NaiveDate> {
    let span = Duration::days(i64::from(days.max(1)) - 1);
    today.checked_sub_signed(span).ok_or_else(|| {
        Error::Config(format!("a {} day window before {} is out of range", days, today))
    })
}

/// Load the last `days` days (today included) from the store.
///
/// Only days with at least one row appear.
pub fn load_recent_progress<S: LedgerStore>(
    store: &S,
    today: NaiveDate,
    days: u32,
) -> Result<Vec<DailyProgress>> {
    let from = window_start(today, days)?;
    let entries = store
        .fetch_range(from, today)
        .map_err(|e| Error::read(None, e))?;

    let progress = aggregate_by_date(&entries);
    tracing::info!(
        "Loaded {} rows over {} days from the last {}",
        entries.len(),
        progress.len(),
        days
    );
    Ok(progress)
}

/// Totals over a window of days
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeeklySummary {
    pub days_tracked: usize,
    pub days_all_goals_met: usize,
    pub totals: HashMap<ExerciseKind, u64>,
}

impl WeeklySummary {
    pub fn total(&self, kind: ExerciseKind) -> u64 {
        self.totals.get(&kind).copied().unwrap_or(0)
    }
}

pub fn summarize(days: &[DailyProgress]) -> WeeklySummary {
    let mut totals = HashMap::new();
    for day in days {
        for kind in ExerciseKind::ALL {
            *totals.entry(kind).or_insert(0u64) += u64::from(day.count(kind));
        }
    }

    WeeklySummary {
        days_tracked: days.len(),
        days_all_goals_met: days.iter().filter(|d| d.all_goals_met()).count(),
        totals,
    }
}

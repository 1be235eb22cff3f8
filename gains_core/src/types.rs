//! Core domain types for the Gains progress ledger.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercise kinds and their fixed daily goals
//! - Ledger entries (one persisted row per exercise per day)
//! - Derived daily progress

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Exercise Types
// ============================================================================

/// Type of tracked exercise
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    Pushups,
    Situps,
    Squats,
    Running,
}

impl ExerciseKind {
    /// Every exercise, in display order
    pub const ALL: [ExerciseKind; 4] = [
        ExerciseKind::Pushups,
        ExerciseKind::Situps,
        ExerciseKind::Squats,
        ExerciseKind::Running,
    ];

    /// Fixed daily goal. Running is measured in kilometres.
    pub fn goal(self) -> u32 {
        match self {
            ExerciseKind::Pushups => 100,
            ExerciseKind::Situps => 100,
            ExerciseKind::Squats => 100,
            ExerciseKind::Running => 10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExerciseKind::Pushups => "pushups",
            ExerciseKind::Situps => "situps",
            ExerciseKind::Squats => "squats",
            ExerciseKind::Running => "running",
        }
    }

    /// Unit label used when printing counts
    pub fn unit(self) -> &'static str {
        match self {
            ExerciseKind::Running => "km",
            _ => "reps",
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ExerciseKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pushups" => Ok(ExerciseKind::Pushups),
            "situps" => Ok(ExerciseKind::Situps),
            "squats" => Ok(ExerciseKind::Squats),
            "running" => Ok(ExerciseKind::Running),
            other => Err(crate::Error::UnknownExercise(other.to_string())),
        }
    }
}

// ============================================================================
// Ledger Types
// ============================================================================

/// Store-assigned identifier of a ledger row
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct EntryId(pub Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One persisted row: an exercise's count for a calendar day.
///
/// At most one entry per (exercise, date) is the intended state, but the
/// store does not enforce it. Duplicates are collapsed by the reconciler the
/// next time that day is written.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub exercise: ExerciseKind,
    pub count: u32,
    pub date: NaiveDate,
}

// ============================================================================
// Derived Progress
// ============================================================================

/// Per-exercise totals for one day.
///
/// Totals derived from reads are plain sums of every matching entry and are
/// never clamped, so a day can show more than its goal.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyProgress {
    pub date: NaiveDate,
    pub counts: BTreeMap<ExerciseKind, u32>,
}

impl DailyProgress {
    /// Zero-state for a day
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            counts: ExerciseKind::ALL.iter().map(|&k| (k, 0)).collect(),
        }
    }

    pub fn count(&self, kind: ExerciseKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn set(&mut self, kind: ExerciseKind, count: u32) {
        self.counts.insert(kind, count);
    }

    /// Add an entry's count into the running total for its exercise
    pub fn accumulate(&mut self, kind: ExerciseKind, count: u32) {
        let total = self.counts.entry(kind).or_insert(0);
        *total = total.saturating_add(count);
    }

    pub fn goal_met(&self, kind: ExerciseKind) -> bool {
        self.count(kind) >= kind.goal()
    }

    pub fn all_goals_met(&self) -> bool {
        ExerciseKind::ALL.iter().all(|&k| self.goal_met(k))
    }
}

//! Ledger store adapter.
//!
//! The reconciler talks to the row store only through [`LedgerStore`], so the
//! backing implementation can be the on-disk ledger used by the CLI or an
//! in-memory fake in tests. No ordering or atomicity is assumed across calls.

use crate::{EntryId, Error, ExerciseKind, LedgerEntry, Result};
use chrono::NaiveDate;

/// Point reads, writes and deletes of individually addressable ledger rows
pub trait LedgerStore {
    /// Rows for one exercise on one day, in stable store order.
    ///
    /// May return more than one row when duplicates were inserted.
    fn fetch_entries(&self, exercise: ExerciseKind, date: NaiveDate) -> Result<Vec<LedgerEntry>>;

    /// Every row dated within `[from, to]`
    fn fetch_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<LedgerEntry>>;

    /// Append a row; the store assigns its id
    fn insert_entry(&mut self, exercise: ExerciseKind, count: u32, date: NaiveDate) -> Result<LedgerEntry>;

    /// Overwrite the count of an existing row
    fn update_entry(&mut self, id: EntryId, count: u32) -> Result<()>;

    /// Remove rows by id. Unknown ids are ignored.
    fn delete_entries(&mut self, ids: &[EntryId]) -> Result<()>;
}

// Row operations shared by the Vec-backed stores
pub(crate) fn select(rows: &[LedgerEntry], exercise: ExerciseKind, date: NaiveDate) -> Vec<LedgerEntry> {
    rows.iter()
        .filter(|e| e.exercise == exercise && e.date == date)
        .cloned()
        .collect()
}

pub(crate) fn select_range(rows: &[LedgerEntry], from: NaiveDate, to: NaiveDate) -> Vec<LedgerEntry> {
    rows.iter()
        .filter(|e| e.date >= from && e.date <= to)
        .cloned()
        .collect()
}

pub(crate) fn overwrite(rows: &mut [LedgerEntry], id: EntryId, count: u32) -> Result<()> {
    let row = rows
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or(Error::EntryMissing(id))?;
    row.count = count;
    Ok(())
}

pub(crate) fn remove(rows: &mut Vec<LedgerEntry>, ids: &[EntryId]) -> usize {
    let before = rows.len();
    rows.retain(|e| !ids.contains(&e.id));
    before - rows.len()
}

/// In-process ledger, insertion ordered
#[derive(Clone, Debug, Default)]
pub struct MemoryLedgerStore {
    rows: Vec<LedgerEntry>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with arbitrary rows, duplicates included
    pub fn with_entries(rows: Vec<LedgerEntry>) -> Self {
        Self { rows }
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.rows
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn fetch_entries(&self, exercise: ExerciseKind, date: NaiveDate) -> Result<Vec<LedgerEntry>> {
        Ok(select(&self.rows, exercise, date))
    }

    fn fetch_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<LedgerEntry>> {
        Ok(select_range(&self.rows, from, to))
    }

    fn insert_entry(&mut self, exercise: ExerciseKind, count: u32, date: NaiveDate) -> Result<LedgerEntry> {
        let entry = LedgerEntry {
            id: EntryId::new(),
            exercise,
            count,
            date,
        };
        self.rows.push(entry.clone());
        Ok(entry)
    }

    fn update_entry(&mut self, id: EntryId, count: u32) -> Result<()> {
        overwrite(&mut self.rows, id, count)
    }

    fn delete_entries(&mut self, ids: &[EntryId]) -> Result<()> {
        remove(&mut self.rows, ids);
        Ok(())
    }
}

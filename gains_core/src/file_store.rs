//! On-disk ledger with file locking.
//!
//! The ledger is a single JSON document of rows. Reads take a shared lock on a
//! sidecar lock file; every mutation takes an exclusive lock, re-reads the
//! document, applies the change and atomically replaces the file, so
//! concurrent CLI processes never lose each other's rows.

use crate::store::{self, LedgerStore};
use crate::{EntryId, Error, ExerciseKind, LedgerEntry, Result};
use chrono::NaiveDate;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
    #[serde(default)]
    entries: Vec<LedgerEntry>,
}

/// JSON-file ledger store
pub struct JsonLedgerStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonLedgerStore {
    /// Create a store for the given ledger path. Nothing is touched until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = path.with_extension("lock");
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    fn open_lock(&self) -> Result<File> {
        self.ensure_parent_dir()?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        Ok(file)
    }

    /// Read the document without taking a lock. Callers hold one.
    ///
    /// A missing file is an empty ledger. A corrupt file is an error: the
    /// ledger is the source of truth and must not be replaced by defaults.
    fn read_unlocked(&self) -> Result<LedgerDocument> {
        if !self.path.exists() {
            return Ok(LedgerDocument::default());
        }

        let mut contents = String::new();
        File::open(&self.path)?.read_to_string(&mut contents)?;
        if contents.trim().is_empty() {
            return Ok(LedgerDocument::default());
        }

        Ok(serde_json::from_str(&contents)?)
    }

    fn write_unlocked(&self, doc: &LedgerDocument) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "ledger path missing parent",
            ))
        })?;
        let temp = NamedTempFile::new_in(parent)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, doc)?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&[LedgerEntry]) -> T) -> Result<T> {
        let lock = self.open_lock()?;
        lock.lock_shared()?;
        let doc = self.read_unlocked();
        lock.unlock()?;
        Ok(f(&doc?.entries))
    }

    /// Load, modify and save the document under an exclusive lock
    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<LedgerEntry>) -> Result<T>) -> Result<T> {
        let lock = self.open_lock()?;
        lock.lock_exclusive()?;

        let result = self.read_unlocked().and_then(|mut doc| {
            let value = f(&mut doc.entries)?;
            self.write_unlocked(&doc)?;
            Ok(value)
        });

        lock.unlock()?;
        result
    }

    /// Every row in store order
    pub fn all_entries(&self) -> Result<Vec<LedgerEntry>> {
        self.read(|rows| rows.to_vec())
    }
}

impl LedgerStore for JsonLedgerStore {
    fn fetch_entries(&self, exercise: ExerciseKind, date: NaiveDate) -> Result<Vec<LedgerEntry>> {
        let rows = self.read(|rows| store::select(rows, exercise, date))?;
        tracing::debug!("Fetched {} {} rows for {}", rows.len(), exercise, date);
        Ok(rows)
    }

    fn fetch_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<LedgerEntry>> {
        self.read(|rows| store::select_range(rows, from, to))
    }

    fn insert_entry(&mut self, exercise: ExerciseKind, count: u32, date: NaiveDate) -> Result<LedgerEntry> {
        let entry = LedgerEntry {
            id: EntryId::new(),
            exercise,
            count,
            date,
        };
        self.mutate(|rows| {
            rows.push(entry.clone());
            Ok(())
        })?;
        tracing::debug!("Inserted ledger row {} ({} = {})", entry.id, exercise, count);
        Ok(entry)
    }

    fn update_entry(&mut self, id: EntryId, count: u32) -> Result<()> {
        self.mutate(|rows| store::overwrite(rows, id, count))?;
        tracing::debug!("Updated ledger row {} to {}", id, count);
        Ok(())
    }

    fn delete_entries(&mut self, ids: &[EntryId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let removed = self.mutate(|rows| Ok(store::remove(rows, ids)))?;
        tracing::debug!("Deleted {} ledger rows", removed);
        Ok(())
    }
}

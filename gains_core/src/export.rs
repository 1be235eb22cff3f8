//! CSV export of the multi-day progress view.
//!
//! Rows are appended so repeated exports build up an archive; headers are
//! written only when the file is new or empty.

use crate::{DailyProgress, ExerciseKind, Result};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    date: String,
    pushups: u32,
    situps: u32,
    squats: u32,
    running: u32,
    all_goals_met: bool,
}

impl From<&DailyProgress> for CsvRow {
    fn from(day: &DailyProgress) -> Self {
        CsvRow {
            date: day.date.format("%Y-%m-%d").to_string(),
            pushups: day.count(ExerciseKind::Pushups),
            situps: day.count(ExerciseKind::Situps),
            squats: day.count(ExerciseKind::Squats),
            running: day.count(ExerciseKind::Running),
            all_goals_met: day.all_goals_met(),
        }
    }
}

/// Append one CSV row per day and sync the file to disk.
///
/// Returns the number of rows written.
pub fn export_progress_csv(days: &[DailyProgress], csv_path: &Path) -> Result<usize> {
    if days.is_empty() {
        tracing::info!("No progress to export");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let needs_headers = file.metadata()?.len() == 0;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for day in days {
        writer.serialize(CsvRow::from(day))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Exported {} days to {:?}", days.len(), csv_path);
    Ok(days.len())
}

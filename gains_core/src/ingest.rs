//! Ingestion of externally recorded runs.
//!
//! A third-party service notifies us when an activity is created. For each
//! such notification the activity detail is fetched and one `running` row is
//! appended for the ingestion day. This path never reads or reconciles, so it
//! can create duplicate rows; the reconciler collapses them on its next write.

use crate::store::LedgerStore;
use crate::{Error, ExerciseKind, LedgerEntry, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Notification payload sent by the activity service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub object_type: String,
    pub aspect_type: String,
    pub object_id: u64,
    #[serde(default)]
    pub owner_id: Option<u64>,
}

impl ActivityEvent {
    /// Only newly created activities are ingested
    pub fn is_activity_created(&self) -> bool {
        self.object_type == "activity" && self.aspect_type == "create"
    }
}

/// Fetched activity detail
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityDetail {
    /// Distance in metres
    pub distance: f64,
}

impl ActivityDetail {
    /// Whole kilometres, rounded to nearest
    pub fn distance_km(&self) -> u32 {
        if !self.distance.is_finite() || self.distance <= 0.0 {
            return 0;
        }
        (self.distance / 1000.0).round().min(f64::from(u32::MAX)) as u32
    }
}

/// Where activity details come from
pub trait ActivitySource {
    fn fetch_activity(&self, id: u64) -> Result<ActivityDetail>;
}

/// Reads `<dir>/<id>.json` activity documents
pub struct DirActivitySource {
    dir: PathBuf,
}

impl DirActivitySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ActivitySource for DirActivitySource {
    fn fetch_activity(&self, id: u64) -> Result<ActivityDetail> {
        let path = self.dir.join(format!("{}.json", id));
        let contents = std::fs::read_to_string(&path)?;
        let detail = serde_json::from_str(&contents)?;
        tracing::debug!("Fetched activity {} from {:?}", id, path);
        Ok(detail)
    }
}

/// Parse a notification payload from a file
pub fn read_event(path: &Path) -> Result<ActivityEvent> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Append a `running` row for a created activity.
///
/// Returns `None` for notifications that are not activity creations.
pub fn ingest_event<A, S>(
    event: &ActivityEvent,
    source: &A,
    store: &mut S,
    day: NaiveDate,
) -> Result<Option<LedgerEntry>>
where
    A: ActivitySource,
    S: LedgerStore,
{
    if !event.is_activity_created() {
        tracing::debug!(
            "Ignoring {} {} notification",
            event.object_type,
            event.aspect_type
        );
        return Ok(None);
    }

    let detail = source.fetch_activity(event.object_id)?;
    let km = detail.distance_km();
    let entry = store
        .insert_entry(ExerciseKind::Running, km, day)
        .map_err(|e| Error::write("insert", e))?;

    tracing::info!(
        "Ingested activity {} as {} km on {}",
        event.object_id,
        km,
        day
    );
    Ok(Some(entry))
}

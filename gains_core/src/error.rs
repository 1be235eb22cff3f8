//! Error types for the gains_core library.

use crate::{EntryId, ExerciseKind};
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for gains_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Exercise name not in the closed set
    #[error("Unknown exercise: {0}")]
    UnknownExercise(String),

    /// Store was asked to update a row it does not hold
    #[error("Ledger entry {0} not found")]
    EntryMissing(EntryId),

    /// Fetching rows from the ledger store failed
    #[error("Remote read failed{}: {source}", for_exercise(.exercise))]
    RemoteRead {
        exercise: Option<ExerciseKind>,
        #[source]
        source: Box<Error>,
    },

    /// Insert, update or delete against the ledger store failed
    #[error("Remote {op} failed: {source}")]
    RemoteWrite {
        op: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

fn for_exercise(exercise: &Option<ExerciseKind>) -> String {
    exercise.map(|e| format!(" for {}", e)).unwrap_or_default()
}

impl Error {
    pub(crate) fn read(exercise: Option<ExerciseKind>, source: Error) -> Self {
        Error::RemoteRead {
            exercise,
            source: Box::new(source),
        }
    }

    pub(crate) fn write(op: &'static str, source: Error) -> Self {
        Error::RemoteWrite {
            op,
            source: Box::new(source),
        }
    }

    /// Whether this is a transient store failure that a later reload can recover from
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::RemoteRead { .. } | Error::RemoteWrite { .. })
    }
}

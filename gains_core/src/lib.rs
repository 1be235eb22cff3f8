#![forbid(unsafe_code)]

//! Core domain model and business logic for the Gains progress ledger.
//!
//! This crate provides:
//! - Domain types (exercises, ledger entries, daily progress)
//! - The ledger store adapter and its in-memory and on-disk implementations
//! - The progress reconciler
//! - Multi-day analysis, run ingestion and CSV export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod store;
pub mod file_store;
pub mod reconciler;
pub mod analysis;
pub mod ingest;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use store::{LedgerStore, MemoryLedgerStore};
pub use file_store::JsonLedgerStore;
pub use reconciler::{DeltaOutcome, ProgressReconciler, SyncStatus};
pub use analysis::{aggregate_by_date, load_recent_progress, summarize, WeeklySummary};
pub use ingest::{ingest_event, ActivityDetail, ActivityEvent, ActivitySource, DirActivitySource};
pub use export::export_progress_csv;

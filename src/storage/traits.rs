//! Storage traits and error types
//!
//! This module defines the trait interface for snapshot backends and
//! associated error types.

use crate::record::BrokenLinkRecord;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid snapshot table name: {0}")]
    InvalidTableName(String),

    #[error("Invalid row in {table}: {message}")]
    InvalidRow { table: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Describes a snapshot that was just written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHandle {
    pub date: NaiveDate,
    pub table_name: String,
    pub record_count: usize,
    /// Snapshot dates removed by the retention sweep that followed the write
    pub dropped: Vec<NaiveDate>,
}

/// Trait for snapshot backend implementations
///
/// A snapshot is the set of broken links for one calendar day. Snapshots are
/// replaced wholesale, never appended to, and expire after the retention
/// window.
pub trait SnapshotStore {
    /// Writes the snapshot for `date`, replacing any existing one
    ///
    /// Rows sharing a `(region, url)` identity are merged first. The
    /// retention sweep runs after every write, relative to `date`.
    fn write_snapshot(
        &mut self,
        date: NaiveDate,
        records: &[BrokenLinkRecord],
    ) -> StorageResult<SnapshotHandle>;

    /// Reads the snapshot for `date`
    ///
    /// Returns `Ok(None)` when no snapshot exists for that day.
    fn read_snapshot(&self, date: NaiveDate) -> StorageResult<Option<Vec<BrokenLinkRecord>>>;

    /// Deletes every snapshot at least `window_days` old relative to `today`
    ///
    /// Returns the dates that were removed.
    fn enforce_retention(
        &mut self,
        today: NaiveDate,
        window_days: u32,
    ) -> StorageResult<Vec<NaiveDate>>;

    /// Lists the dates that currently have a snapshot, oldest first
    fn list_snapshot_dates(&self) -> StorageResult<Vec<NaiveDate>>;
}

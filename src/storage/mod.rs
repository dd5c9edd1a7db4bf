//! Storage module for daily broken-link snapshots
//!
//! This module handles all database operations, including:
//! - One table per calendar day, replaced wholesale on rewrite
//! - Reading a day back, with "no snapshot" distinct from "no broken links"
//! - The rolling retention sweep

mod schema;
mod sqlite;
mod traits;

pub use schema::{date_from_table_name, table_name_for};
pub use sqlite::SqliteSnapshotStore;
pub use traits::{SnapshotHandle, SnapshotStore, StorageError, StorageResult};

use crate::record::BrokenLinkRecord;
use chrono::NaiveDate;
use std::path::Path;

/// Opens the snapshot database described by the configuration
///
/// # Arguments
///
/// * `config` - The `[snapshot]` section of the configuration
///
/// # Returns
///
/// * `Ok(SqliteSnapshotStore)` - Successfully opened store
/// * `Err(StorageError)` - Failed to open the database
pub fn open_store(config: &crate::config::SnapshotConfig) -> StorageResult<SqliteSnapshotStore> {
    SqliteSnapshotStore::open(Path::new(&config.database_path), config.retention_days)
}

/// Writes the snapshot for `date`, then sweeps relative to `today` too
///
/// The store sweeps from the written date. When `date` is a backfill older
/// than `today`, a second sweep from `today` removes whatever today's window
/// has already expired, the backfilled table included.
pub fn store_snapshot(
    store: &mut dyn SnapshotStore,
    date: NaiveDate,
    today: NaiveDate,
    records: &[BrokenLinkRecord],
    retention_days: u32,
) -> StorageResult<SnapshotHandle> {
    let mut handle = store.write_snapshot(date, records)?;

    if today > date {
        let dropped = store.enforce_retention(today, retention_days)?;
        if dropped.contains(&date) {
            tracing::warn!(
                "Snapshot {} is outside the {}-day window ending {} and was dropped",
                date,
                retention_days,
                today
            );
        }
        handle.dropped.extend(dropped);
        handle.dropped.sort();
        handle.dropped.dedup();
    }

    Ok(handle)
}

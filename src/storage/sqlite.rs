//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the SnapshotStore trait.

use crate::record::{merge_records, parse_timestamp, BrokenLinkRecord, RecordStatus};
use crate::storage::schema::{
    create_table_sql, date_from_table_name, drop_table_sql, insert_sql, select_sql,
    table_name_for, validate_table_name, LIST_SNAPSHOT_TABLES_SQL, PRAGMAS_SQL, TABLE_EXISTS_SQL,
};
use crate::storage::traits::{SnapshotHandle, SnapshotStore, StorageError, StorageResult};
use chrono::{Duration, NaiveDate};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Row};
use std::path::Path;

/// SQLite snapshot backend
pub struct SqliteSnapshotStore {
    conn: Connection,
    retention_days: u32,
}

impl SqliteSnapshotStore {
    /// Opens (or creates) the snapshot database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file; parent directories are created
    /// * `retention_days` - Window applied after every snapshot write
    pub fn open(path: &Path, retention_days: u32) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(PRAGMAS_SQL)?;

        Ok(Self {
            conn,
            retention_days,
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory(retention_days: u32) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            retention_days,
        })
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    fn table_exists(&self, table: &str) -> StorageResult<bool> {
        let count: i64 = self
            .conn
            .query_row(TABLE_EXISTS_SQL, params![table], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Lists snapshot tables with their dates, oldest first
    fn snapshot_tables(&self) -> StorageResult<Vec<(String, NaiveDate)>> {
        let mut stmt = self.conn.prepare(LIST_SNAPSHOT_TABLES_SQL)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut tables: Vec<(String, NaiveDate)> = names
            .into_iter()
            .filter_map(|name| date_from_table_name(&name).map(|date| (name, date)))
            .collect();
        tables.sort_by_key(|(_, date)| *date);
        Ok(tables)
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn write_snapshot(
        &mut self,
        date: NaiveDate,
        records: &[BrokenLinkRecord],
    ) -> StorageResult<SnapshotHandle> {
        let table = table_name_for(date);
        let rows = merge_records(records.to_vec());

        let tx = self.conn.transaction()?;
        tx.execute(&drop_table_sql(&table), [])?;
        tx.execute_batch(&create_table_sql(&table))?;
        {
            let mut stmt = tx.prepare(&insert_sql(&table))?;
            for record in &rows {
                stmt.execute(params![
                    record.region,
                    record.url,
                    record.status.to_string(),
                    record.path,
                    record.visible,
                    record.timestamp_string(),
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!("Wrote {} broken links to {}", rows.len(), table);

        let dropped = self.enforce_retention(date, self.retention_days)?;

        Ok(SnapshotHandle {
            date,
            table_name: table,
            record_count: rows.len(),
            dropped,
        })
    }

    fn read_snapshot(&self, date: NaiveDate) -> StorageResult<Option<Vec<BrokenLinkRecord>>> {
        let table = table_name_for(date);
        if !self.table_exists(&table)? {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(&select_sql(&table))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(record_from_row(&table, row)?);
        }

        Ok(Some(records))
    }

    fn enforce_retention(
        &mut self,
        today: NaiveDate,
        window_days: u32,
    ) -> StorageResult<Vec<NaiveDate>> {
        let cutoff = today - Duration::days(i64::from(window_days));
        let expired: Vec<(String, NaiveDate)> = self
            .snapshot_tables()?
            .into_iter()
            .filter(|(_, date)| *date <= cutoff)
            .collect();

        let mut dropped = Vec::with_capacity(expired.len());
        for (name, date) in expired {
            let table = validate_table_name(&name)?;
            self.conn.execute(&drop_table_sql(table), [])?;
            tracing::info!(
                "Dropped snapshot table {} ({} days old, retention {} days)",
                table,
                (today - date).num_days(),
                window_days
            );
            dropped.push(date);
        }

        Ok(dropped)
    }

    fn list_snapshot_dates(&self) -> StorageResult<Vec<NaiveDate>> {
        Ok(self
            .snapshot_tables()?
            .into_iter()
            .map(|(_, date)| date)
            .collect())
    }
}

/// Converts a table row into a record
///
/// Status may be stored as an integer by older writers; both forms parse.
fn record_from_row(table: &str, row: &Row<'_>) -> StorageResult<BrokenLinkRecord> {
    let invalid = |message: String| StorageError::InvalidRow {
        table: table.to_string(),
        message,
    };

    let region: String = row.get(0)?;
    let url: String = row.get(1)?;

    let status_text = match row.get_ref(2)? {
        ValueRef::Integer(code) => code.to_string(),
        ValueRef::Real(code) => format!("{}", code),
        ValueRef::Text(text) => String::from_utf8_lossy(text).into_owned(),
        other => return Err(invalid(format!("unexpected status type {:?} for {}", other, url))),
    };
    let status: RecordStatus = status_text
        .parse()
        .map_err(|e| invalid(format!("{} for {}", e, url)))?;

    let path: String = row.get::<_, Option<String>>(3)?.unwrap_or_default();
    let visible: bool = row.get::<_, Option<bool>>(4)?.unwrap_or(false);

    let timestamp_text: String = row.get(5)?;
    let timestamp = parse_timestamp(&timestamp_text)
        .ok_or_else(|| invalid(format!("bad timestamp {:?} for {}", timestamp_text, url)))?;

    Ok(BrokenLinkRecord {
        region,
        url,
        status,
        path,
        visible,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::TransportErrorKind;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn record(region: &str, url: &str, status: RecordStatus) -> BrokenLinkRecord {
        BrokenLinkRecord {
            region: region.to_string(),
            url: url.to_string(),
            status,
            path: format!("https://example.com/ -> {}", url),
            visible: true,
            timestamp: parse_timestamp("2025-08-21 10:00:00").unwrap(),
        }
    }

    #[test]
    fn test_create_in_memory() {
        let store = SqliteSnapshotStore::new_in_memory(60);
        assert!(store.is_ok());
    }

    #[test]
    fn test_write_and_read_back() {
        let mut store = SqliteSnapshotStore::new_in_memory(60).unwrap();
        let records = vec![
            record("AU", "https://example.com/b", RecordStatus::Http(404)),
            record(
                "AU",
                "https://example.com/a",
                RecordStatus::Transport(TransportErrorKind::Timeout),
            ),
        ];

        let handle = store.write_snapshot(date("2025-08-21"), &records).unwrap();
        assert_eq!(handle.table_name, "broken_links_2025_08_21");
        assert_eq!(handle.record_count, 2);

        let read = store.read_snapshot(date("2025-08-21")).unwrap().unwrap();
        assert_eq!(read, records);
    }

    #[test]
    fn test_duplicates_are_merged_on_write() {
        let mut store = SqliteSnapshotStore::new_in_memory(60).unwrap();
        let records = vec![
            record("AU", "/a", RecordStatus::Http(404)),
            record("NZ", "/a", RecordStatus::Http(404)),
            record("AU", "/a", RecordStatus::Http(500)),
        ];

        let handle = store.write_snapshot(date("2025-08-21"), &records).unwrap();
        assert_eq!(handle.record_count, 2);

        let read = store.read_snapshot(date("2025-08-21")).unwrap().unwrap();
        assert_eq!(read[0].status, RecordStatus::Http(500));
        assert_eq!(read[1].region, "NZ");
    }

    #[test]
    fn test_missing_date_is_none() {
        let store = SqliteSnapshotStore::new_in_memory(60).unwrap();
        assert!(store.read_snapshot(date("2025-08-21")).unwrap().is_none());
    }

    #[test]
    fn test_empty_snapshot_is_not_missing() {
        let mut store = SqliteSnapshotStore::new_in_memory(60).unwrap();
        store.write_snapshot(date("2025-08-21"), &[]).unwrap();
        assert_eq!(
            store.read_snapshot(date("2025-08-21")).unwrap(),
            Some(Vec::new())
        );
    }

    #[test]
    fn test_retention_boundary() {
        let mut store = SqliteSnapshotStore::new_in_memory(365).unwrap();
        for d in ["2025-06-21", "2025-06-22", "2025-06-23", "2025-08-21"] {
            store.write_snapshot(date(d), &[]).unwrap();
        }

        // 2025-06-22 is exactly 60 days old
        let dropped = store.enforce_retention(date("2025-08-21"), 60).unwrap();
        assert_eq!(dropped, vec![date("2025-06-21"), date("2025-06-22")]);
        assert_eq!(
            store.list_snapshot_dates().unwrap(),
            vec![date("2025-06-23"), date("2025-08-21")]
        );
    }

    #[test]
    fn test_write_runs_retention() {
        let mut store = SqliteSnapshotStore::new_in_memory(60).unwrap();
        store.write_snapshot(date("2025-06-01"), &[]).unwrap();
        let handle = store.write_snapshot(date("2025-08-21"), &[]).unwrap();
        assert_eq!(handle.dropped, vec![date("2025-06-01")]);
    }

    #[test]
    fn test_foreign_tables_are_untouched() {
        let mut store = SqliteSnapshotStore::new_in_memory(60).unwrap();
        store
            .conn
            .execute_batch("CREATE TABLE broken_links_backup (x TEXT);")
            .unwrap();
        store.enforce_retention(date("2030-01-01"), 60).unwrap();
        assert!(store.table_exists("broken_links_backup").unwrap());
    }

    #[test]
    fn test_integer_status_column_is_read() {
        let store = SqliteSnapshotStore::new_in_memory(60).unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TABLE broken_links_2025_08_24 (
                    Region TEXT, URL TEXT, Status INTEGER, Path TEXT, Visible INTEGER,
                    Timestamp TEXT, PRIMARY KEY (Region, URL));
                 INSERT INTO broken_links_2025_08_24 (Region, URL, Status, Timestamp)
                 VALUES ('AU', 'https://example.com/x', 404, '2025-08-24');",
            )
            .unwrap();

        let read = store.read_snapshot(date("2025-08-24")).unwrap().unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].status, RecordStatus::Http(404));
        assert_eq!(read[0].path, "");
        assert!(!read[0].visible);
    }
}

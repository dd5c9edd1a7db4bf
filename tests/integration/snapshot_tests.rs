//! Integration tests for the snapshot store and diff engine
//!
//! These tests run against SQLite files in temporary directories.

use chrono::{Duration, NaiveDate};
use linkwatch::diff::{compare_with_history, diff, ComparisonOutcome};
use linkwatch::output::{load_all, write_records, DeltaReport, JsonReport, ReportWriter};
use linkwatch::record::parse_timestamp;
use linkwatch::storage::{store_snapshot, SnapshotStore, SqliteSnapshotStore};
use linkwatch::{BrokenLinkRecord, LinkIdentity, RecordStatus};
use tempfile::TempDir;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

const SITE: &str = "https://example.com.au";

fn rec(region: &str, path: &str) -> BrokenLinkRecord {
    BrokenLinkRecord {
        region: region.to_string(),
        url: format!("{}{}", SITE, path),
        status: RecordStatus::Http(404),
        path: format!("{}/ -> {}{}", SITE, SITE, path),
        visible: true,
        timestamp: parse_timestamp("2025-08-21 06:00:00").unwrap(),
    }
}

fn id(region: &str, path: &str) -> LinkIdentity {
    LinkIdentity {
        region: region.to_string(),
        url: format!("{}{}", SITE, path),
    }
}

fn open_store(dir: &TempDir) -> SqliteSnapshotStore {
    SqliteSnapshotStore::open(&dir.path().join("snapshots/broken_links.db"), 60).unwrap()
}

#[test]
fn test_day_over_day_diff() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);

    store
        .write_snapshot(date("2025-08-20"), &[rec("AU", "/a"), rec("AU", "/b")])
        .unwrap();
    store
        .write_snapshot(date("2025-08-21"), &[rec("AU", "/b"), rec("AU", "/c")])
        .unwrap();

    let today = store.read_snapshot(date("2025-08-21")).unwrap().unwrap();
    let yesterday = store.read_snapshot(date("2025-08-20")).unwrap().unwrap();

    let delta = diff(&today, &yesterday);
    assert_eq!(delta.added, vec![id("AU", "/c")]);
    assert_eq!(delta.removed, vec![id("AU", "/a")]);
}

#[test]
fn test_missing_week_reference_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);

    store
        .write_snapshot(date("2025-08-20"), &[rec("AU", "/a")])
        .unwrap();
    let today = vec![rec("AU", "/a"), rec("NZ", "/z")];
    store.write_snapshot(date("2025-08-21"), &today).unwrap();

    let comparisons = compare_with_history(&store, date("2025-08-21"), &today).unwrap();

    let yesterday = comparisons[0].delta().unwrap();
    assert_eq!(yesterday.added, vec![id("NZ", "/z")]);
    assert!(yesterday.removed.is_empty());

    assert_eq!(comparisons[1].reference_date, date("2025-08-14"));
    assert_eq!(comparisons[1].outcome, ComparisonOutcome::Unavailable);
}

#[test]
fn test_retention_keeps_at_most_window() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);

    let start = date("2025-06-01");
    for offset in 0..90 {
        store
            .write_snapshot(start + Duration::days(offset), &[rec("AU", "/a")])
            .unwrap();
    }

    let last = start + Duration::days(89);
    let dates = store.list_snapshot_dates().unwrap();
    assert_eq!(dates.len(), 60);
    assert!(dates.iter().all(|d| (last - *d).num_days() < 60));
    assert_eq!(dates.last(), Some(&last));

    // A later sweep removes everything outside the new window
    let now = last + Duration::days(30);
    store.enforce_retention(now, 60).unwrap();
    let dates = store.list_snapshot_dates().unwrap();
    assert_eq!(dates.len(), 30);
    assert!(dates.iter().all(|d| (now - *d).num_days() < 60));
}

#[test]
fn test_backfill_is_swept_from_today() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let today = date("2025-08-21");

    store.write_snapshot(today, &[rec("AU", "/a")]).unwrap();
    store
        .write_snapshot(date("2025-06-01"), &[rec("AU", "/a")])
        .unwrap();
    assert_eq!(store.list_snapshot_dates().unwrap().len(), 2);

    // Written relative to today it is already outside the window
    let handle = store_snapshot(
        &mut store,
        date("2025-06-02"),
        today,
        &[rec("AU", "/b")],
        60,
    )
    .unwrap();
    assert_eq!(handle.dropped, vec![date("2025-06-01"), date("2025-06-02")]);
    assert_eq!(store.list_snapshot_dates().unwrap(), vec![today]);

    // A recent backfill survives
    let handle = store_snapshot(
        &mut store,
        date("2025-08-20"),
        today,
        &[rec("AU", "/b")],
        60,
    )
    .unwrap();
    assert!(handle.dropped.is_empty());
    assert_eq!(
        store.list_snapshot_dates().unwrap(),
        vec![date("2025-08-20"), today]
    );
}

#[test]
fn test_same_day_rewrite_replaces() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let day = date("2025-08-21");

    store
        .write_snapshot(day, &[rec("AU", "/a"), rec("AU", "/b")])
        .unwrap();
    store.write_snapshot(day, &[rec("AU", "/c")]).unwrap();

    let read = store.read_snapshot(day).unwrap().unwrap();
    assert_eq!(read, vec![rec("AU", "/c")]);
    assert_eq!(store.list_snapshot_dates().unwrap(), vec![day]);
}

#[test]
fn test_missing_date_reads_as_none() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    assert!(store.read_snapshot(date("2025-08-21")).unwrap().is_none());
}

#[test]
fn test_snapshots_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let mut store = open_store(&dir);
        store
            .write_snapshot(date("2025-08-21"), &[rec("AU", "/a")])
            .unwrap();
    }

    let store = open_store(&dir);
    let read = store.read_snapshot(date("2025-08-21")).unwrap().unwrap();
    assert_eq!(read, vec![rec("AU", "/a")]);
}

#[test]
fn test_csv_to_delta_document() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    store
        .write_snapshot(date("2025-08-20"), &[rec("AU", "/a"), rec("AU", "/b")])
        .unwrap();

    let csv_path = dir.path().join("au_broken_links.csv");
    write_records(&csv_path, &[rec("AU", "/b"), rec("AU", "/c")]).unwrap();
    let today = load_all(&[csv_path]).unwrap();

    let handle = store.write_snapshot(date("2025-08-21"), &today).unwrap();
    let comparisons = compare_with_history(&store, date("2025-08-21"), &today).unwrap();
    let report = DeltaReport::new(date("2025-08-21"), &today, comparisons, handle.dropped, 60);

    let delta_path = dir.path().join("reports/delta.json");
    JsonReport.write_to(&report, &delta_path).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&delta_path).unwrap()).unwrap();
    assert_eq!(value["total_broken"], 2);
    assert_eq!(
        value["comparisons"][0]["Added"][0]["URL"],
        "https://example.com.au/c"
    );
    assert_eq!(
        value["comparisons"][0]["Removed"][0]["URL"],
        "https://example.com.au/a"
    );
    assert_eq!(value["comparisons"][1]["available"], false);
}

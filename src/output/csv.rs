//! CSV import and export of broken-link rows
//!
//! Exports carry the columns `Region, URL, Status, Path, Visible, Timestamp`.
//! Imports accept the same layout; `Region`, `Path` and `Visible` may be
//! missing, in which case the region comes from the file name
//! (`au_broken_links.csv` is region `AU`). Rows are keyed the way the
//! crawler keys them: HTTP URLs are normalized and regions upper-cased.

use crate::diff::Comparison;
use crate::record::{merge_records, parse_timestamp, parse_visible, BrokenLinkRecord};
use crate::url::normalize_parsed;
use crate::{LinkwatchError, Result};
use csv::{ReaderBuilder, StringRecord, Writer};
use std::path::{Path, PathBuf};
use url::Url;

/// Column headers, in export order
pub const CSV_HEADERS: [&str; 6] = ["Region", "URL", "Status", "Path", "Visible", "Timestamp"];

const FILE_SUFFIX: &str = "_broken_links.csv";

/// Path of the export for `region` inside `dir`
pub fn export_path(dir: &Path, region: &str) -> PathBuf {
    dir.join(format!("{}{}", region.to_ascii_lowercase(), FILE_SUFFIX))
}

/// Region implied by a CSV file name: the upper-cased text before the first `_`
pub fn region_from_file_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let prefix = stem.split('_').next()?;
    if prefix.is_empty() || prefix == stem {
        return None;
    }
    Some(prefix.to_ascii_uppercase())
}

/// Writes broken-link rows to `path`
///
/// # Returns
///
/// The number of rows written.
pub fn write_records(path: &Path, records: &[BrokenLinkRecord]) -> Result<usize> {
    let mut writer = Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    writer
        .write_record(CSV_HEADERS)
        .map_err(|e| csv_error(path, e))?;

    for record in records {
        let status = record.status.to_string();
        let timestamp = record.timestamp_string();
        writer
            .write_record([
                record.region.as_str(),
                record.url.as_str(),
                status.as_str(),
                record.path.as_str(),
                if record.visible { "Yes" } else { "No" },
                timestamp.as_str(),
            ])
            .map_err(|e| csv_error(path, e))?;
    }

    writer.flush()?;
    Ok(records.len())
}

/// Column headers of the changes export
pub const CHANGE_HEADERS: [&str; 4] = ["Region", "URL", "Change", "Window"];

/// Writes every Added and Removed identity of the available comparisons
///
/// `Window` holds the comparison label (`yesterday`, `7 days ago`).
/// Unavailable comparisons contribute no rows. Returns the number of rows
/// written.
pub fn write_changes(path: &Path, comparisons: &[Comparison]) -> Result<usize> {
    let mut writer = Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    writer
        .write_record(CHANGE_HEADERS)
        .map_err(|e| csv_error(path, e))?;

    let mut written = 0;
    for comparison in comparisons {
        let Some(delta) = comparison.delta() else {
            continue;
        };
        let rows = delta
            .removed
            .iter()
            .map(|id| (id, "Removed"))
            .chain(delta.added.iter().map(|id| (id, "Added")));
        for (id, change) in rows {
            writer
                .write_record([
                    id.region.as_str(),
                    id.url.as_str(),
                    change,
                    comparison.label.as_str(),
                ])
                .map_err(|e| csv_error(path, e))?;
            written += 1;
        }
    }

    writer.flush()?;
    Ok(written)
}

/// Column positions resolved from the header row
struct Columns {
    region: Option<usize>,
    url: usize,
    status: usize,
    path: Option<usize>,
    visible: Option<usize>,
    timestamp: usize,
}

impl Columns {
    fn from_headers(path: &Path, headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| LinkwatchError::Csv {
                path: path.display().to_string(),
                message: format!("missing required column {:?}", name),
            })
        };

        Ok(Self {
            region: find("Region"),
            url: require("URL")?,
            status: require("Status")?,
            path: find("Path"),
            visible: find("Visible"),
            timestamp: require("Timestamp")?,
        })
    }
}

/// Reads and validates the broken-link rows of one CSV export
///
/// Rows with a 2xx status or an empty status are skipped. Any other row that
/// does not validate aborts the load with an error naming its line.
/// Duplicate `(region, url)` rows are merged.
pub fn load_records(path: &Path) -> Result<Vec<BrokenLinkRecord>> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;
    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    let columns = Columns::from_headers(path, &headers)?;
    let file_region = region_from_file_name(path);

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for row in reader.records() {
        let row = row.map_err(|e| csv_error(path, e))?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let invalid = |message: String| LinkwatchError::Csv {
            path: path.display().to_string(),
            message: format!("line {}: {}", line, message),
        };
        let field = |idx: usize| row.get(idx).unwrap_or("").trim();

        let status_text = field(columns.status);
        if status_text.is_empty() {
            skipped += 1;
            continue;
        }
        let status = status_text
            .parse::<crate::record::RecordStatus>()
            .map_err(|e| invalid(e.to_string()))?;
        if status.is_success() {
            skipped += 1;
            continue;
        }

        let region = columns
            .region
            .map(field)
            .filter(|r| !r.is_empty())
            .map(str::to_ascii_uppercase)
            .or_else(|| file_region.clone())
            .ok_or_else(|| invalid("no Region column and no region in file name".to_string()))?;

        let url = field(columns.url);
        if url.is_empty() {
            return Err(invalid("empty URL".to_string()));
        }
        let url = row_identity(url).map_err(invalid)?;

        let visible = match columns.visible.map(field) {
            None | Some("") => false,
            Some(text) => parse_visible(text)
                .ok_or_else(|| invalid(format!("invalid Visible value {:?}", text)))?,
        };

        let timestamp_text = field(columns.timestamp);
        let timestamp = parse_timestamp(timestamp_text)
            .ok_or_else(|| invalid(format!("invalid Timestamp {:?}", timestamp_text)))?;

        records.push(BrokenLinkRecord {
            region,
            url,
            status,
            path: columns.path.map(field).unwrap_or("").to_string(),
            visible,
            timestamp,
        });
    }

    tracing::info!(
        "Loaded {} broken links from {} ({} rows skipped)",
        records.len(),
        path.display(),
        skipped
    );

    Ok(merge_records(records))
}

/// Identity of a URL column value
///
/// HTTP(S) URLs are normalized; other schemes keep their parsed form.
fn row_identity(url: &str) -> std::result::Result<String, String> {
    let parsed = Url::parse(url).map_err(|e| format!("invalid URL {:?}: {}", url, e))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Ok(parsed.to_string());
    }
    normalize_parsed(parsed)
        .map(|normalized| normalized.to_string())
        .map_err(|e| format!("invalid URL {:?}: {}", url, e))
}

/// Loads several exports, merging duplicates across files
pub fn load_all(paths: &[PathBuf]) -> Result<Vec<BrokenLinkRecord>> {
    let mut all = Vec::new();
    for path in paths {
        all.extend(load_records(path)?);
    }
    Ok(merge_records(all))
}

fn csv_error(path: &Path, err: csv::Error) -> LinkwatchError {
    LinkwatchError::Csv {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{diff, ComparisonOutcome, Delta};
    use crate::record::{LinkIdentity, RecordStatus};
    use crate::status::TransportErrorKind;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_export_path_and_region() {
        let path = export_path(Path::new("out"), "AU");
        assert_eq!(path, Path::new("out/au_broken_links.csv"));
        assert_eq!(region_from_file_name(&path), Some("AU".to_string()));
        assert_eq!(region_from_file_name(Path::new("links.csv")), None);
    }

    #[test]
    fn test_write_then_load() {
        let dir = TempDir::new().unwrap();
        let path = export_path(dir.path(), "NZ");
        let records = vec![
            BrokenLinkRecord {
                region: "NZ".to_string(),
                url: "https://example.co.nz/gone".to_string(),
                status: RecordStatus::Http(404),
                path: "https://example.co.nz/ -> https://example.co.nz/gone".to_string(),
                visible: true,
                timestamp: parse_timestamp("2025-08-21 10:00:00").unwrap(),
            },
            BrokenLinkRecord {
                region: "NZ".to_string(),
                url: "https://example.co.nz/slow".to_string(),
                status: RecordStatus::Transport(TransportErrorKind::Timeout),
                path: String::new(),
                visible: false,
                timestamp: parse_timestamp("2025-08-21 10:00:05").unwrap(),
            },
        ];

        assert_eq!(write_records(&path, &records).unwrap(), 2);
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Region,URL,Status,Path,Visible,Timestamp"));
        assert!(text.contains(",Yes,"));

        assert_eq!(load_records(&path).unwrap(), records);
    }

    #[test]
    fn test_success_and_empty_status_rows_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "au_broken_links.csv",
            "URL,Status,Timestamp\n\
             https://example.com/ok,200,2025-08-21 10:00:00\n\
             https://example.com/unchecked,,2025-08-21 10:00:00\n\
             https://example.com/gone,404.0,2025-08-21 10:00:00\n",
        );

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].region, "AU");
        assert_eq!(records[0].status, RecordStatus::Http(404));
        assert!(!records[0].visible);
    }

    #[test]
    fn test_invalid_row_names_line() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "au_broken_links.csv",
            "Region,URL,Status,Timestamp\n\
             AU,https://example.com/a,404,2025-08-21 10:00:00\n\
             AU,https://example.com/b,teapot,2025-08-21 10:00:00\n",
        );

        let err = load_records(&path).unwrap_err();
        assert!(matches!(err, LinkwatchError::Csv { .. }));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_missing_required_column() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "au_broken_links.csv", "Region,URL\nAU,/a\n");
        let err = load_records(&path).unwrap_err();
        assert!(err.to_string().contains("Status"));
    }

    #[test]
    fn test_duplicates_merged_across_files() {
        let dir = TempDir::new().unwrap();
        let first = write_file(
            &dir,
            "au_broken_links.csv",
            "Region,URL,Status,Timestamp\nAU,https://example.com/a,404,2025-08-21 09:00:00\n",
        );
        let second = write_file(
            &dir,
            "au_rerun_broken_links.csv",
            "Region,URL,Status,Timestamp\nAU,https://example.com/a,500,2025-08-21 11:00:00\n",
        );

        let records = load_all(&[first, second]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, RecordStatus::Http(500));
    }

    #[test]
    fn test_rows_share_the_crawler_identity() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "links.csv",
            "Region,URL,Status,Timestamp\n\
             AU,https://Example.com/a/,404,2025-08-21 09:00:00\n\
             AU,https://example.com/a#frag,404,2025-08-21 10:00:00\n\
             au,https://example.com/a?utm_source=mail,410,2025-08-21 11:00:00\n",
        );

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].region, "AU");
        assert_eq!(records[0].url, "https://example.com/a");
        assert_eq!(records[0].status, RecordStatus::Http(410));

        let reference = vec![records[0].clone()];
        let delta = diff(&records, &reference);
        assert!(delta.is_empty());
    }

    #[test]
    fn test_unparsable_url_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "au_broken_links.csv",
            "URL,Status,Timestamp\n/relative/only,404,2025-08-21 09:00:00\n",
        );

        let err = load_records(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(err.to_string().contains("/relative/only"));
    }

    #[test]
    fn test_write_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("changes_all.csv");
        let id = |url: &str| LinkIdentity {
            region: "AU".to_string(),
            url: url.to_string(),
        };
        let date = NaiveDate::from_ymd_opt(2025, 8, 20).unwrap();
        let comparisons = vec![
            Comparison {
                label: "yesterday".to_string(),
                reference_date: date,
                outcome: ComparisonOutcome::Available(Delta {
                    added: vec![id("https://example.com/new")],
                    removed: vec![id("https://example.com/fixed")],
                }),
            },
            Comparison {
                label: "7 days ago".to_string(),
                reference_date: date,
                outcome: ComparisonOutcome::Unavailable,
            },
        ];

        assert_eq!(write_changes(&path, &comparisons).unwrap(), 2);
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Region,URL,Change,Window",
                "AU,https://example.com/fixed,Removed,yesterday",
                "AU,https://example.com/new,Added,yesterday",
            ]
        );
    }
}

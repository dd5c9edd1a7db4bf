//! Crawl result records
//!
//! A [`VisitResult`] is produced once per tracked URL by the crawler. The
//! subset that failed becomes [`BrokenLinkRecord`]s, the rows exported to CSV
//! and persisted in daily snapshots.

mod path;

pub use path::extend_path;

use crate::status::{BrokenReason, LinkStatus, TransportErrorKind};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Timestamp format used in CSV exports and snapshot tables
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of checking one unique URL during a crawl
#[derive(Debug, Clone, Serialize)]
pub struct VisitResult {
    /// Normalized identity of the URL
    pub url: String,
    /// URL as requested (fragment removed, otherwise as discovered)
    pub fetch_url: String,
    pub status: LinkStatus,
    /// Inside the crawl boundary
    pub is_internal: bool,
    /// Rendered as a visible anchor on at least one referring page
    pub is_visible_link: bool,
    /// Every page found linking here
    pub referring_pages: BTreeSet<String>,
    /// Discovery path from the seed
    pub path: String,
    /// Hops from the seed
    pub depth: u32,
    /// Number of requests made, zero for links never fetched
    pub attempts: u32,
    /// Redirects followed before the final response
    pub redirect_chain: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

impl VisitResult {
    /// Converts a failed visit into a broken-link row for `region`
    ///
    /// Returns None for links that are not broken.
    pub fn to_broken_record(&self, region: &str) -> Option<BrokenLinkRecord> {
        let status = RecordStatus::from_link_status(&self.status)?;
        Some(BrokenLinkRecord {
            region: region.to_string(),
            url: self.url.clone(),
            status,
            path: self.path.clone(),
            visible: self.is_visible_link,
            timestamp: self.checked_at.with_timezone(&Local).naive_local(),
        })
    }
}

/// Status column of a broken-link row: a numeric code or a symbolic error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecordStatus {
    Http(u16),
    TooManyRedirects,
    RedirectLoop,
    Transport(TransportErrorKind),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid status value: {0:?}")]
pub struct InvalidStatus(pub String);

impl RecordStatus {
    /// Maps a broken [`LinkStatus`]; None if the link is not broken
    pub fn from_link_status(status: &LinkStatus) -> Option<Self> {
        match status {
            LinkStatus::Broken(BrokenReason::Http(code)) => Some(Self::Http(*code)),
            LinkStatus::Broken(BrokenReason::TooManyRedirects) => Some(Self::TooManyRedirects),
            LinkStatus::Broken(BrokenReason::RedirectLoop) => Some(Self::RedirectLoop),
            LinkStatus::TransportError(kind) => Some(Self::Transport(*kind)),
            LinkStatus::Ok | LinkStatus::Redirect(_) | LinkStatus::Excluded(_) => None,
        }
    }

    /// Returns true for 2xx codes, which never belong in a snapshot
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Http(200..=299))
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(code) => write!(f, "{}", code),
            Self::TooManyRedirects => write!(f, "too_many_redirects"),
            Self::RedirectLoop => write!(f, "redirect_loop"),
            Self::Transport(kind) => write!(f, "{}", kind.label()),
        }
    }
}

impl FromStr for RecordStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // Spreadsheet round-trips turn 404 into 404.0
        let numeric = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        if let Ok(code) = numeric.parse::<u16>() {
            return if (100..=599).contains(&code) {
                Ok(Self::Http(code))
            } else {
                Err(InvalidStatus(s.to_string()))
            };
        }

        match trimmed {
            "too_many_redirects" => Ok(Self::TooManyRedirects),
            "redirect_loop" => Ok(Self::RedirectLoop),
            other => TransportErrorKind::from_label(other)
                .map(Self::Transport)
                .ok_or_else(|| InvalidStatus(s.to_string())),
        }
    }
}

impl TryFrom<String> for RecordStatus {
    type Error = InvalidStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordStatus> for String {
    fn from(status: RecordStatus) -> Self {
        status.to_string()
    }
}

/// Composite identity of a broken link across snapshots
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkIdentity {
    pub region: String,
    pub url: String,
}

impl fmt::Display for LinkIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.region, self.url)
    }
}

/// One row of a CSV export or snapshot table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLinkRecord {
    pub region: String,
    pub url: String,
    pub status: RecordStatus,
    pub path: String,
    pub visible: bool,
    pub timestamp: NaiveDateTime,
}

impl BrokenLinkRecord {
    pub fn identity(&self) -> LinkIdentity {
        LinkIdentity {
            region: self.region.clone(),
            url: self.url.clone(),
        }
    }

    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Parses a timestamp column value
///
/// Accepts the export format, ISO 8601 with a `T` separator (with or without
/// fractional seconds), and a bare date, read as midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Parses a visibility column value
pub fn parse_visible(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Some(true),
        "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Merges rows sharing a `(region, url)` identity
///
/// The row with the latest timestamp wins; on equal timestamps the later row
/// wins. Output keeps the position of each identity's first appearance.
pub fn merge_records(records: Vec<BrokenLinkRecord>) -> Vec<BrokenLinkRecord> {
    let mut merged: Vec<BrokenLinkRecord> = Vec::with_capacity(records.len());
    let mut positions: HashMap<LinkIdentity, usize> = HashMap::new();

    for record in records {
        match positions.get(&record.identity()) {
            Some(&idx) => {
                if record.timestamp >= merged[idx].timestamp {
                    merged[idx] = record;
                }
            }
            None => {
                positions.insert(record.identity(), merged.len());
                merged.push(record);
            }
        }
    }

    merged
}

//! Report writer traits and types
//!
//! This module defines the trait interface for report writers and the data
//! every report is rendered from.

use crate::diff::Comparison;
use crate::record::BrokenLinkRecord;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything a delta report shows for one report build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaReport {
    /// Day the snapshot was written for
    pub date: NaiveDate,

    /// Broken links in today's snapshot, per region
    pub broken_by_region: BTreeMap<String, usize>,

    /// Comparisons against reference days, in display order
    pub comparisons: Vec<Comparison>,

    /// Snapshot dates removed by the retention sweep
    pub dropped_snapshots: Vec<NaiveDate>,

    /// Retention window in days
    pub retention_days: u32,
}

impl DeltaReport {
    pub fn new(
        date: NaiveDate,
        today: &[BrokenLinkRecord],
        comparisons: Vec<Comparison>,
        dropped_snapshots: Vec<NaiveDate>,
        retention_days: u32,
    ) -> Self {
        let mut broken_by_region = BTreeMap::new();
        for record in today {
            *broken_by_region.entry(record.region.clone()).or_insert(0) += 1;
        }

        Self {
            date,
            broken_by_region,
            comparisons,
            dropped_snapshots,
            retention_days,
        }
    }

    pub fn total_broken(&self) -> usize {
        self.broken_by_region.values().sum()
    }
}

/// Trait for report formats
pub trait ReportWriter {
    /// Renders the report as text
    fn render(&self, report: &DeltaReport) -> OutputResult<String>;

    /// Renders the report and writes it to `path`, creating parent directories
    fn write_to(&self, report: &DeltaReport, path: &Path) -> OutputResult<()> {
        let rendered = self.render(report)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, rendered)?;
        Ok(())
    }
}

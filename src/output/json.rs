//! JSON delta document for the report renderer
//!
//! Each comparison lists `Added` and `Removed` as `{Region, URL}` objects in
//! diff order. A comparison without a reference snapshot has
//! `"available": false` and no lists.

use crate::diff::ComparisonOutcome;
use crate::output::traits::{DeltaReport, OutputResult, ReportWriter};
use crate::record::LinkIdentity;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Writes the delta report as pretty-printed JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReport;

impl ReportWriter for JsonReport {
    fn render(&self, report: &DeltaReport) -> OutputResult<String> {
        let mut json = serde_json::to_string_pretty(&DeltaDocument::from(report))?;
        json.push('\n');
        Ok(json)
    }
}

#[derive(Serialize)]
struct DeltaDocument<'a> {
    date: NaiveDate,
    total_broken: usize,
    broken_by_region: &'a BTreeMap<String, usize>,
    comparisons: Vec<ComparisonEntry<'a>>,
    dropped_snapshots: &'a [NaiveDate],
}

#[derive(Serialize)]
struct ComparisonEntry<'a> {
    label: &'a str,
    reference_date: NaiveDate,
    available: bool,
    #[serde(rename = "Added", skip_serializing_if = "Option::is_none")]
    added: Option<Vec<LinkRow<'a>>>,
    #[serde(rename = "Removed", skip_serializing_if = "Option::is_none")]
    removed: Option<Vec<LinkRow<'a>>>,
}

#[derive(Serialize)]
struct LinkRow<'a> {
    #[serde(rename = "Region")]
    region: &'a str,
    #[serde(rename = "URL")]
    url: &'a str,
}

fn rows(links: &[LinkIdentity]) -> Vec<LinkRow<'_>> {
    links
        .iter()
        .map(|link| LinkRow {
            region: &link.region,
            url: &link.url,
        })
        .collect()
}

impl<'a> From<&'a DeltaReport> for DeltaDocument<'a> {
    fn from(report: &'a DeltaReport) -> Self {
        let comparisons = report
            .comparisons
            .iter()
            .map(|comparison| {
                let (added, removed) = match &comparison.outcome {
                    ComparisonOutcome::Available(delta) => {
                        (Some(rows(&delta.added)), Some(rows(&delta.removed)))
                    }
                    ComparisonOutcome::Unavailable => (None, None),
                };
                ComparisonEntry {
                    label: &comparison.label,
                    reference_date: comparison.reference_date,
                    available: added.is_some(),
                    added,
                    removed,
                }
            })
            .collect();

        Self {
            date: report.date,
            total_broken: report.total_broken(),
            broken_by_region: &report.broken_by_region,
            comparisons,
            dropped_snapshots: &report.dropped_snapshots,
        }
    }
}

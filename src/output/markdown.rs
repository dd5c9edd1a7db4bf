//! Markdown delta report
//!
//! A human-readable summary of a report build: today's totals, then one
//! section per reference day listing links that broke and links that were
//! fixed.

use crate::diff::ComparisonOutcome;
use crate::output::traits::{DeltaReport, OutputResult, ReportWriter};
use crate::record::LinkIdentity;

/// Links listed per section before the rest are elided
const MAX_LISTED: usize = 200;

/// Writes the delta report as markdown
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownReport;

impl ReportWriter for MarkdownReport {
    fn render(&self, report: &DeltaReport) -> OutputResult<String> {
        Ok(format_markdown_report(report))
    }
}

/// Formats a delta report as markdown
///
/// # Arguments
///
/// * `report` - The report data
///
/// # Returns
///
/// A formatted markdown string
pub fn format_markdown_report(report: &DeltaReport) -> String {
    let mut md = String::new();

    md.push_str("# Broken Links Report\n\n");
    md.push_str(&format!("- **Date**: {}\n", report.date));
    md.push_str(&format!(
        "- **Total Broken Links**: {}\n",
        report.total_broken()
    ));
    md.push_str(&format!(
        "- **Retention**: {} days\n\n",
        report.retention_days
    ));

    if !report.broken_by_region.is_empty() {
        md.push_str("## Broken Links by Region\n\n");
        md.push_str("| Region | Broken |\n");
        md.push_str("|--------|--------|\n");
        for (region, count) in &report.broken_by_region {
            md.push_str(&format!("| {} | {} |\n", region, count));
        }
        md.push('\n');
    }

    for comparison in &report.comparisons {
        md.push_str(&format!(
            "## Compared with {} ({})\n\n",
            comparison.label, comparison.reference_date
        ));

        match &comparison.outcome {
            ComparisonOutcome::Unavailable => {
                md.push_str("No snapshot exists for this day; no comparison available.\n\n");
            }
            ComparisonOutcome::Available(delta) if delta.is_empty() => {
                md.push_str("No changes.\n\n");
            }
            ComparisonOutcome::Available(delta) => {
                push_link_table(&mut md, "Added", &delta.added);
                push_link_table(&mut md, "Removed", &delta.removed);
            }
        }
    }

    if !report.dropped_snapshots.is_empty() {
        md.push_str("## Expired Snapshots\n\n");
        for date in &report.dropped_snapshots {
            md.push_str(&format!("- {}\n", date));
        }
        md.push('\n');
    }

    md
}

fn push_link_table(md: &mut String, title: &str, links: &[LinkIdentity]) {
    md.push_str(&format!("### {} ({})\n\n", title, links.len()));
    if links.is_empty() {
        md.push_str("None.\n\n");
        return;
    }

    md.push_str("| Region | URL |\n");
    md.push_str("|--------|-----|\n");
    for link in links.iter().take(MAX_LISTED) {
        md.push_str(&format!("| {} | {} |\n", link.region, link.url));
    }
    if links.len() > MAX_LISTED {
        md.push_str(&format!("\n... and {} more\n", links.len() - MAX_LISTED));
    }
    md.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{Comparison, Delta};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn id(url: &str) -> LinkIdentity {
        LinkIdentity {
            region: "AU".to_string(),
            url: url.to_string(),
        }
    }

    fn create_test_report() -> DeltaReport {
        let mut broken_by_region = BTreeMap::new();
        broken_by_region.insert("AU".to_string(), 2);

        DeltaReport {
            date: NaiveDate::from_ymd_opt(2025, 8, 21).unwrap(),
            broken_by_region,
            comparisons: vec![
                Comparison {
                    label: "yesterday".to_string(),
                    reference_date: NaiveDate::from_ymd_opt(2025, 8, 20).unwrap(),
                    outcome: ComparisonOutcome::Available(Delta {
                        added: vec![id("/c")],
                        removed: vec![id("/a")],
                    }),
                },
                Comparison {
                    label: "7 days ago".to_string(),
                    reference_date: NaiveDate::from_ymd_opt(2025, 8, 14).unwrap(),
                    outcome: ComparisonOutcome::Unavailable,
                },
            ],
            dropped_snapshots: vec![],
            retention_days: 60,
        }
    }

    #[test]
    fn test_format_markdown_report() {
        let markdown = format_markdown_report(&create_test_report());

        assert!(markdown.contains("# Broken Links Report"));
        assert!(markdown.contains("**Total Broken Links**: 2"));
        assert!(markdown.contains("| AU | 2 |"));
        assert!(markdown.contains("## Compared with yesterday (2025-08-20)"));
        assert!(markdown.contains("### Added (1)"));
        assert!(markdown.contains("| AU | /c |"));
        assert!(markdown.contains("### Removed (1)"));
        assert!(markdown.contains("| AU | /a |"));
    }

    #[test]
    fn test_unavailable_is_not_empty_delta() {
        let markdown = format_markdown_report(&create_test_report());
        assert!(markdown.contains("no comparison available"));
        assert_eq!(markdown.matches("### Added").count(), 1);
    }

    #[test]
    fn test_long_lists_are_elided() {
        let mut report = create_test_report();
        let added: Vec<_> = (0..MAX_LISTED + 5).map(|i| id(&format!("/{}", i))).collect();
        report.comparisons[0].outcome = ComparisonOutcome::Available(Delta {
            added,
            removed: vec![],
        });

        let markdown = format_markdown_report(&report);
        assert!(markdown.contains("... and 5 more"));
    }
}

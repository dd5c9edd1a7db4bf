//! Output module for exports, statistics and reports
//!
//! This module handles:
//! - Writing and loading the per-region CSV exports and the changes export
//! - Summarizing a finished crawl
//! - Rendering the delta report as markdown and JSON

pub mod csv;
mod json;
mod markdown;
pub mod stats;
mod traits;

pub use self::csv::{export_path, load_all, load_records, write_changes, write_records};
pub use json::JsonReport;
pub use markdown::{format_markdown_report, MarkdownReport};
pub use stats::{compute_statistics, print_statistics, CrawlStatistics};
pub use traits::{DeltaReport, OutputError, OutputResult, ReportWriter};

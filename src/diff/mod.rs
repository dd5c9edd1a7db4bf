//! Diff engine: day-over-day changes in the broken-link set
//!
//! Snapshots are compared by `(region, url)` identity only. A change of status
//! for a link that stays broken is neither an addition nor a removal.

use crate::record::{BrokenLinkRecord, LinkIdentity};
use crate::storage::{SnapshotStore, StorageResult};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::HashSet;

/// Reference days compared against on every report build, as (label, days back)
pub const REFERENCE_DAYS: [(&str, i64); 2] = [("yesterday", 1), ("7 days ago", 7)];

/// Links that appeared and disappeared between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Delta {
    /// Broken today, not broken on the reference day
    pub added: Vec<LinkIdentity>,
    /// Broken on the reference day, not broken today
    pub removed: Vec<LinkIdentity>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Result of comparing today against one reference day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "delta", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Available(Delta),
    /// The reference day has no snapshot
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub label: String,
    pub reference_date: NaiveDate,
    pub outcome: ComparisonOutcome,
}

impl Comparison {
    pub fn delta(&self) -> Option<&Delta> {
        match &self.outcome {
            ComparisonOutcome::Available(delta) => Some(delta),
            ComparisonOutcome::Unavailable => None,
        }
    }
}

/// Computes the identities added and removed between `reference` and `today`
///
/// Both lists keep the order of their source collection; an identity listed
/// twice in the same collection is reported once.
///
/// # Example
///
/// ```
/// use linkwatch::diff::diff;
///
/// let delta = diff(&[], &[]);
/// assert!(delta.is_empty());
/// ```
pub fn diff(today: &[BrokenLinkRecord], reference: &[BrokenLinkRecord]) -> Delta {
    let today_ids: HashSet<LinkIdentity> = today.iter().map(|r| r.identity()).collect();
    let reference_ids: HashSet<LinkIdentity> = reference.iter().map(|r| r.identity()).collect();

    Delta {
        added: ordered_difference(today, &reference_ids),
        removed: ordered_difference(reference, &today_ids),
    }
}

fn ordered_difference(
    records: &[BrokenLinkRecord],
    exclude: &HashSet<LinkIdentity>,
) -> Vec<LinkIdentity> {
    let mut seen = HashSet::new();
    records
        .iter()
        .map(|r| r.identity())
        .filter(|id| !exclude.contains(id) && seen.insert(id.clone()))
        .collect()
}

/// Compares today's records against a stored reference day
pub fn compare_with(
    store: &dyn SnapshotStore,
    label: &str,
    reference_date: NaiveDate,
    today: &[BrokenLinkRecord],
) -> StorageResult<Comparison> {
    let outcome = match store.read_snapshot(reference_date)? {
        Some(reference) => ComparisonOutcome::Available(diff(today, &reference)),
        None => {
            tracing::info!(
                "No snapshot for {} ({}), comparison unavailable",
                label,
                reference_date
            );
            ComparisonOutcome::Unavailable
        }
    };

    Ok(Comparison {
        label: label.to_string(),
        reference_date,
        outcome,
    })
}

/// Compares today's records against yesterday and 7 days ago
pub fn compare_with_history(
    store: &dyn SnapshotStore,
    today_date: NaiveDate,
    today: &[BrokenLinkRecord],
) -> StorageResult<Vec<Comparison>> {
    REFERENCE_DAYS
        .iter()
        .map(|(label, days_back)| {
            compare_with(store, label, today_date - Duration::days(*days_back), today)
        })
        .collect()
}

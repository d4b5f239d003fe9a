#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core data types for the prospektor enrichment pipeline.
//!
//! These types are shared by the pipeline, the server and the CLI. They are
//! deliberately free of I/O: the pipeline crate owns the behavior, this crate
//! owns the shapes that flow through it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source marker used when a phone number was resolved without a citation,
/// including every fallback-path resolution.
pub const NO_SOURCE: &str = "Ingen kilde";

/// One input row, extracted from the dataset before any enrichment starts.
///
/// Identified solely by `index` (its position in the original dataset) for
/// the lifetime of a run; immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Zero-based position in the original dataset.
    pub index: usize,
    /// Company name used for the lookup.
    pub company: String,
    /// Person name used for the lookup.
    pub person: String,
    /// Pre-existing phone value from the fallback column, empty when the
    /// dataset has no such column.
    pub fallback_phone: String,
}

impl Record {
    /// Whether both identification fields are empty (whitespace-only counts
    /// as empty). Blank records feed the early-stop counter and skip the
    /// remote lookup entirely.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.company.trim().is_empty() && self.person.trim().is_empty()
    }
}

/// What one lookup attempt produced, after answer parsing.
///
/// Produced exactly once per selected record; fallback resolution is total
/// over every variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// A digit-only phone candidate together with a resolved source URL.
    Found { phone: String, source: String },
    /// A phone candidate without any resolvable source reference.
    FoundNoSource { phone: String },
    /// The answer contained no phone number.
    Absent,
    /// The call failed (transport error, non-2xx status or timeout).
    Failed { reason: String },
}

/// A row's final annotation: exactly one per selected record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentResult {
    /// Index of the record this result annotates.
    pub index: usize,
    /// Normalized digit string, or empty when no usable phone was resolved.
    pub phone: String,
    /// Resolved source URL, or [`NO_SOURCE`].
    pub source: String,
}

/// Point-in-time summary of run completion, published to the blob store
/// after every completed row and polled by external clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Rows completed so far. Monotonically non-decreasing within a run.
    pub processed: usize,
    /// Size of the working set.
    pub total: usize,
    /// `processed / total * 100`, rounded to two decimals. A run with an
    /// empty working set is complete by definition, so `total == 0` yields
    /// `100.0` rather than a division error.
    pub percentage: f64,
    /// When this snapshot was taken (UTC).
    pub last_update: DateTime<Utc>,
}

impl ProgressSnapshot {
    /// Builds a snapshot for `processed` out of `total`, stamped now.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(processed: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            100.0
        } else {
            let raw = processed as f64 / total as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        };
        Self {
            processed,
            total,
            percentage,
            last_update: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_record_requires_both_fields_empty() {
        let record = Record {
            index: 0,
            company: "  ".to_string(),
            person: String::new(),
            fallback_phone: String::new(),
        };
        assert!(record.is_blank());

        let record = Record {
            index: 1,
            company: String::new(),
            person: "Kari Nordmann".to_string(),
            fallback_phone: String::new(),
        };
        assert!(!record.is_blank());
    }

    #[test]
    fn snapshot_percentage_rounds_to_two_decimals() {
        let snapshot = ProgressSnapshot::new(1, 3);
        assert!((snapshot.percentage - 33.33).abs() < f64::EPSILON);

        let snapshot = ProgressSnapshot::new(2, 3);
        assert!((snapshot.percentage - 66.67).abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_complete_run_is_exactly_one_hundred() {
        let snapshot = ProgressSnapshot::new(7, 7);
        assert!((snapshot.percentage - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_empty_working_set_is_complete() {
        let snapshot = ProgressSnapshot::new(0, 0);
        assert!((snapshot.percentage - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let snapshot = ProgressSnapshot::new(2, 4);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"processed\":2"));
        assert!(json.contains("\"total\":4"));
        assert!(json.contains("\"percentage\":50.0"));
        assert!(json.contains("\"lastUpdate\":"));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let snapshot = ProgressSnapshot::new(3, 5);
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: ProgressSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}

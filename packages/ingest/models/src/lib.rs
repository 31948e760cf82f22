#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Import options and result types.
//!
//! Every row read from an input file ends up in exactly one disposition:
//! inserted, skipped (failed validation), duplicate (ride id already
//! stored), or failed (its batch was rolled back or never attempted).

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Rows per trip batch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Options for one import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Rows per trip batch (one transaction each).
    pub batch_size: usize,
    /// Run the daily aggregation after all files load.
    pub aggregate: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            aggregate: true,
        }
    }
}

/// Row dispositions for one committed trip batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Rows newly stored.
    pub inserted: u64,
    /// Rows dropped by validation.
    pub skipped: u64,
    /// Rows whose ride id was already stored or repeated in the batch.
    pub duplicates: u64,
}

impl BatchReport {
    /// Adds another report's counts into this one.
    pub const fn merge(&mut self, other: &Self) {
        self.inserted += other.inserted;
        self.skipped += other.skipped;
        self.duplicates += other.duplicates;
    }

    /// Total rows accounted for.
    #[must_use]
    pub const fn rows(&self) -> u64 {
        self.inserted + self.skipped + self.duplicates
    }
}

/// Station resolution counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverStats {
    /// Stations inserted.
    pub created: u64,
    /// Existing stations found in storage and refreshed.
    pub refreshed: u64,
    /// Lookups answered from the per-run cache.
    pub cache_hits: u64,
}

impl ResolverStats {
    /// Adds another set of counts into this one.
    pub const fn merge(&mut self, other: &Self) {
        self.created += other.created;
        self.refreshed += other.refreshed;
        self.cache_hits += other.cache_hits;
    }
}

/// Outcome of importing one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    /// The input file.
    pub path: PathBuf,
    /// Station pass counts.
    pub stations: ResolverStats,
    /// Trip pass counts over committed batches.
    pub trips: BatchReport,
    /// Rows in rolled-back or unattempted batches.
    pub failed: u64,
}

impl FileReport {
    /// Total rows read from the file.
    #[must_use]
    pub const fn rows(&self) -> u64 {
        self.trips.rows() + self.failed
    }
}

/// Outcome of one aggregation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationReport {
    /// Station-day rows created.
    pub created: u64,
    /// Station-day rows incremented.
    pub updated: u64,
    /// Trips counted (both directions, recognized bike types only).
    pub trips_counted: u64,
    /// Trip-directions excluded for an unrecognized or missing bike tag.
    pub unknown_bike_type: u64,
}

impl AggregationReport {
    /// Station-day rows written.
    #[must_use]
    pub const fn touched(&self) -> u64 {
        self.created + self.updated
    }
}

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortInfo {
    /// The file being processed.
    pub file: PathBuf,
    /// The error that stopped the run.
    pub reason: String,
}

/// Summary of an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Per-file reports, in processing order (including an aborted file).
    pub files: Vec<FileReport>,
    /// Station resolution counts across all files.
    pub stations: ResolverStats,
    /// Trip dispositions across all files.
    pub trips: BatchReport,
    /// Rows that never committed.
    pub failed: u64,
    /// Aggregation result, `None` when skipped or aborted.
    pub aggregation: Option<AggregationReport>,
    /// Set when the aggregation pass failed after every file committed.
    pub aggregation_error: Option<String>,
    /// Set when a fatal error stopped the run.
    pub aborted: Option<AbortInfo>,
    /// Wall time of the run.
    pub duration: Duration,
}

impl RunSummary {
    /// Adds one file's report to the totals.
    pub fn record_file(&mut self, report: FileReport) {
        self.stations.merge(&report.stations);
        self.trips.merge(&report.trips);
        self.failed += report.failed;
        self.files.push(report);
    }

    /// Files that completed without error.
    #[must_use]
    pub fn files_processed(&self) -> usize {
        self.files.len() - usize::from(self.aborted.is_some())
    }

    /// Total rows read; equals the sum of every disposition.
    #[must_use]
    pub const fn rows_seen(&self) -> u64 {
        self.trips.rows() + self.failed
    }

    /// Station-day rows written by the aggregation pass.
    #[must_use]
    pub fn counters_touched(&self) -> u64 {
        self.aggregation.map_or(0, |a| a.touched())
    }
}

/// Outcome of an archive download run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadReport {
    /// Months downloaded and extracted (`YYYYMM`).
    pub downloaded: Vec<String>,
    /// Months skipped because the CSV already existed.
    pub skipped: Vec<String>,
    /// Months that failed, with the error.
    pub failed: Vec<(String, String)>,
}

/// Outcome of re-assigning community areas to stations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaAssignmentReport {
    /// Stations that received an area.
    pub updated: u64,
    /// Stations whose coordinates fall in no area.
    pub not_found: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_use_thousand_row_batches() {
        let options = ImportOptions::default();
        assert_eq!(options.batch_size, 1000);
        assert!(options.aggregate);
    }

    #[test]
    fn summary_rows_seen_sums_dispositions() {
        let mut summary = RunSummary::default();
        summary.record_file(FileReport {
            path: PathBuf::from("a.csv"),
            stations: ResolverStats {
                created: 2,
                refreshed: 0,
                cache_hits: 5,
            },
            trips: BatchReport {
                inserted: 10,
                skipped: 1,
                duplicates: 2,
            },
            failed: 0,
        });
        summary.record_file(FileReport {
            path: PathBuf::from("b.csv"),
            stations: ResolverStats {
                created: 1,
                refreshed: 2,
                cache_hits: 3,
            },
            trips: BatchReport {
                inserted: 4,
                skipped: 0,
                duplicates: 0,
            },
            failed: 1000,
        });
        summary.aborted = Some(AbortInfo {
            file: PathBuf::from("b.csv"),
            reason: "boom".to_string(),
        });

        assert_eq!(summary.rows_seen(), 1017);
        assert_eq!(summary.stations.created, 3);
        assert_eq!(summary.stations.refreshed, 2);
        assert_eq!(summary.files_processed(), 1);
        assert_eq!(summary.counters_touched(), 0);
    }

    #[test]
    fn file_rows_include_failed() {
        let report = FileReport {
            trips: BatchReport {
                inserted: 3,
                skipped: 1,
                duplicates: 1,
            },
            failed: 5,
            ..FileReport::default()
        };
        assert_eq!(report.rows(), 10);
    }
}

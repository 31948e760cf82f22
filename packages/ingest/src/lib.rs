#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Imports monthly trip files into the `DuckDB` store and maintains the
//! daily per-station counters.
//!
//! Each file goes through two passes. The station pass resolves every
//! station the file references inside one transaction. The trip pass then
//! loads the rows in fixed-size batches, one transaction per batch. After
//! the last file, one aggregation pass folds all stored trips into
//! `station_days`.

pub mod aggregate;
pub mod areas;
pub mod config;
pub mod download;
pub mod resolver;
pub mod trips;

use std::path::{Path, PathBuf};
use std::time::Instant;

use bikeshare_database::{DbError, DbPool};
use bikeshare_geography::GeoError;
use bikeshare_ingest_models::{AbortInfo, FileReport, ImportOptions, ResolverStats, RunSummary};
use bikeshare_source::SourceError;
use bikeshare_source::csv_file::CsvRows;
use bikeshare_source::fields::FieldTable;
use bikeshare_source::normalize::{NormalizedRow, SkipReason, normalize_row};
use bikeshare_source::progress::ProgressCallback;
use bikeshare_spatial::GeoIndex;
use thiserror::Error;

use crate::resolver::StationCache;

/// Errors that can occur while importing, aggregating, or downloading.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Storage error outside a trip batch.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Input file could not be read.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Community area boundaries could not be loaded.
    #[error("Geography error: {0}")]
    Geo(#[from] GeoError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Archive could not be read.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An archive download produced nothing usable.
    #[error("Download of {url} failed: {message}")]
    Download {
        /// The archive URL.
        url: String,
        /// What went wrong.
        message: String,
    },

    /// Missing or invalid configuration, raised before any work starts.
    #[error("Configuration error: {message}")]
    Configuration {
        /// What is missing or invalid.
        message: String,
    },

    /// A trip batch was rolled back.
    #[error("Batch {index} ({rows} rows) failed: {source}")]
    Batch {
        /// Zero-based batch number within the file.
        index: usize,
        /// Rows in the batch.
        rows: usize,
        /// The storage error.
        #[source]
        source: DbError,
    },
}

/// A file import that stopped on a fatal error. The report counts what
/// committed before the error, plus every remaining row as failed.
#[derive(Debug)]
pub struct FileFailure {
    /// Counts up to the failure.
    pub report: FileReport,
    /// The error.
    pub error: IngestError,
}

/// Lists the `*.csv` files directly inside `dir`, sorted by path.
///
/// # Errors
///
/// Returns [`IngestError::Io`] if the directory cannot be read.
pub fn discover_input_files(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            files.push(path);
        }
    }

    files.sort();
    log::info!("Found {} CSV files in {}", files.len(), dir.display());
    Ok(files)
}

/// Reads and normalizes every row of a file. Undecodable records become
/// [`SkipReason::Unreadable`] rows.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be opened or has no header.
pub fn read_rows(fields: &FieldTable, path: &Path) -> Result<Vec<NormalizedRow>, SourceError> {
    let rows = CsvRows::open(path)?
        .enumerate()
        .map(|(i, record)| match record {
            Ok(row) => normalize_row(fields, &row),
            Err(e) => {
                log::warn!("{}: unreadable record {}: {e}", path.display(), i + 1);
                NormalizedRow::Skip(SkipReason::Unreadable)
            }
        })
        .collect();
    Ok(rows)
}

fn station_pass(
    pool: &DbPool,
    geo: &GeoIndex,
    cache: &mut StationCache,
    rows: &[NormalizedRow],
) -> Result<ResolverStats, DbError> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    let stats = resolver::resolve_rows(&tx, geo, cache, rows)?;
    tx.commit()?;
    Ok(stats)
}

/// Imports one file: station pass, then trip batches.
///
/// # Errors
///
/// Returns a [`FileFailure`] if the file cannot be read, the station pass
/// fails, or a trip batch is rolled back. Batches committed before the
/// failure stay committed.
#[allow(clippy::result_large_err)]
pub fn import_file(
    pool: &DbPool,
    geo: &GeoIndex,
    fields: &FieldTable,
    cache: &mut StationCache,
    path: &Path,
    options: &ImportOptions,
    progress: &dyn ProgressCallback,
) -> Result<FileReport, FileFailure> {
    let mut report = FileReport {
        path: path.to_path_buf(),
        ..FileReport::default()
    };

    let rows = match read_rows(fields, path) {
        Ok(rows) => rows,
        Err(e) => {
            return Err(FileFailure {
                report,
                error: e.into(),
            });
        }
    };
    let total = rows.len() as u64;

    log::info!("{}: {total} rows", path.display());
    progress.set_total(total);
    progress.set_message(format!("{}: stations", file_label(path)));

    match station_pass(pool, geo, cache, &rows) {
        Ok(stats) => {
            cache.commit();
            report.stations = stats;
        }
        Err(e) => {
            cache.rollback();
            report.failed = total;
            return Err(FileFailure {
                report,
                error: e.into(),
            });
        }
    }
    log::debug!(
        "{}: {} stations created, {} refreshed, {} cache hits",
        path.display(),
        report.stations.created,
        report.stations.refreshed,
        report.stations.cache_hits
    );

    progress.set_message(format!("{}: trips", file_label(path)));
    let mut done = 0_u64;

    for (index, batch) in rows.chunks(options.batch_size.max(1)).enumerate() {
        match trips::ingest_batch(pool, index, batch) {
            Ok(batch_report) => {
                report.trips.merge(&batch_report);
                done += batch.len() as u64;
                progress.inc(batch.len() as u64);
            }
            Err(error) => {
                report.failed = total - done;
                return Err(FileFailure { report, error });
            }
        }
    }

    log::info!(
        "{}: {} inserted, {} skipped, {} duplicates",
        path.display(),
        report.trips.inserted,
        report.trips.skipped,
        report.trips.duplicates
    );
    Ok(report)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Imports `files` in sorted order and runs one aggregation pass at the
/// end.
///
/// A fatal error in a file stops the run: later files are not opened, the
/// abort is recorded in the summary, aggregation is skipped, and every
/// batch committed so far is kept.
///
/// # Errors
///
/// Returns [`IngestError::Configuration`] if the batch size is zero or the
/// field table cannot be loaded. A failed aggregation pass is recorded in
/// [`RunSummary::aggregation_error`] since the trips are already committed.
pub fn run_import(
    pool: &DbPool,
    geo: &GeoIndex,
    files: &[PathBuf],
    options: &ImportOptions,
    progress: &dyn ProgressCallback,
) -> Result<RunSummary, IngestError> {
    if options.batch_size == 0 {
        return Err(IngestError::Configuration {
            message: "batch size must be at least 1".to_string(),
        });
    }
    let fields = FieldTable::embedded().map_err(|e| IngestError::Configuration {
        message: format!("field alias table: {e}"),
    })?;

    let start = Instant::now();
    let mut files = files.to_vec();
    files.sort();

    let mut summary = RunSummary::default();
    let mut cache = StationCache::new();

    for path in &files {
        match import_file(pool, geo, &fields, &mut cache, path, options, progress) {
            Ok(report) => summary.record_file(report),
            Err(FileFailure { report, error }) => {
                log::error!("Aborting import at {}: {error}", path.display());
                summary.record_file(report);
                summary.aborted = Some(AbortInfo {
                    file: path.clone(),
                    reason: error.to_string(),
                });
                break;
            }
        }
    }

    if summary.aborted.is_none() && options.aggregate {
        progress.set_message("aggregating".to_string());
        match aggregate::aggregate(pool) {
            Ok(report) => summary.aggregation = Some(report),
            Err(e) => {
                log::error!("Aggregation failed: {e}");
                summary.aggregation_error = Some(e.to_string());
            }
        }
    }

    summary.duration = start.elapsed();
    progress.finish(format!(
        "{} files, {} trips inserted",
        summary.files_processed(),
        summary.trips.inserted
    ));
    log::info!(
        "Import finished in {:.1}s: {} stations cached, {} rows seen",
        summary.duration.as_secs_f64(),
        cache.len(),
        summary.rows_seen()
    );

    Ok(summary)
}

//! Trip batch loading.

use std::collections::BTreeSet;

use bikeshare_database::{DbError, DbPool, trips};
use bikeshare_ingest_models::BatchReport;
use bikeshare_source::normalize::NormalizedRow;

use crate::IngestError;

/// Loads one batch of normalized rows inside a single transaction on one
/// pooled connection.
///
/// Skipped rows are only counted. Trips whose ride id is already stored,
/// or repeats an earlier row of the same batch, count as duplicates.
///
/// # Errors
///
/// Returns [`IngestError::Batch`] if the connection, any insert, or the
/// commit fails. Nothing from the batch is kept in that case.
pub fn ingest_batch(
    pool: &DbPool,
    batch_index: usize,
    rows: &[NormalizedRow],
) -> Result<BatchReport, IngestError> {
    load(pool, rows).map_err(|source| IngestError::Batch {
        index: batch_index,
        rows: rows.len(),
        source,
    })
}

fn load(pool: &DbPool, rows: &[NormalizedRow]) -> Result<BatchReport, DbError> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let mut report = BatchReport::default();
    let mut seen: BTreeSet<&str> = BTreeSet::new();

    for row in rows {
        match row {
            NormalizedRow::Skip(_) => report.skipped += 1,
            NormalizedRow::Trip(trip) => {
                if !seen.insert(trip.ride_id.as_str()) {
                    report.duplicates += 1;
                } else if trips::insert_trip(&tx, trip)? {
                    report.inserted += 1;
                } else {
                    report.duplicates += 1;
                }
            }
        }
    }

    tx.commit()?;
    Ok(report)
}

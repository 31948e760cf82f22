//! Community area back-fill for stations stored without one.

use bikeshare_database::{DbError, DbPool, stations};
use bikeshare_ingest_models::AreaAssignmentReport;
use bikeshare_spatial::GeoIndex;

use crate::IngestError;

/// Looks up every station that has coordinates but no community area and
/// stores the area it falls in. Runs in one transaction.
///
/// # Errors
///
/// Returns [`IngestError::Database`] if the query or an update fails.
pub fn assign_missing_areas(
    pool: &DbPool,
    geo: &GeoIndex,
) -> Result<AreaAssignmentReport, IngestError> {
    Ok(assign(pool, geo)?)
}

fn assign(pool: &DbPool, geo: &GeoIndex) -> Result<AreaAssignmentReport, DbError> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    let mut report = AreaAssignmentReport::default();

    for station in stations::list_unassigned(&tx)? {
        match geo.locate(station.latitude, station.longitude) {
            Some(hit) => {
                stations::set_area(&tx, station.id, Some((hit.id, hit.name)))?;
                report.updated += 1;
            }
            None => {
                log::debug!(
                    "No community area for station {} '{}' at ({:?}, {:?})",
                    station.id,
                    station.name,
                    station.latitude,
                    station.longitude
                );
                report.not_found += 1;
            }
        }
    }

    tx.commit()?;
    log::info!(
        "Assigned community areas to {} stations ({} outside every area)",
        report.updated,
        report.not_found
    );
    Ok(report)
}

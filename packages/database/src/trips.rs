//! The `trips_raw` table.

use bikeshare_trip_models::RawTrip;
use chrono::NaiveDateTime;
use duckdb::Connection;

use crate::DbError;

fn format_ts(ts: Option<&NaiveDateTime>) -> Option<String> {
    ts.map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Inserts one trip. Returns `false` if a trip with the same `ride_id` is
/// already stored (the row is left untouched).
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn insert_trip(conn: &Connection, trip: &RawTrip) -> Result<bool, DbError> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO trips_raw (
            ride_id, rideable_type, started_at, ended_at,
            start_station_name, start_station_id, end_station_name, end_station_id,
            start_lat, start_lng, end_lat, end_lng, member_casual
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (ride_id) DO NOTHING",
    )?;

    let rows = stmt.execute(duckdb::params![
        trip.ride_id,
        trip.rideable_type.as_deref(),
        format_ts(trip.started_at.as_ref()),
        format_ts(trip.ended_at.as_ref()),
        trip.start.name.as_deref(),
        trip.start.code.as_deref(),
        trip.end.name.as_deref(),
        trip.end.code.as_deref(),
        trip.start.latitude,
        trip.start.longitude,
        trip.end.latitude,
        trip.end.longitude,
        trip.member_casual.map(|c| c.to_string()),
    ])?;

    Ok(rows > 0)
}

/// Returns the number of stored trips.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn count(conn: &Connection) -> Result<u64, DbError> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM trips_raw", [], |row| row.get(0))?;
    Ok(u64::try_from(n).unwrap_or(0))
}

/// Returns `true` if a trip with this ride id is stored.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn contains(conn: &Connection, ride_id: &str) -> Result<bool, DbError> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM trips_raw WHERE ride_id = ?",
        [ride_id],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

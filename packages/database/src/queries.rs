//! Read-only queries over the aggregated counters.
//!
//! These are the shapes the dashboard reads: per-station totals, totals by
//! community area, totals by day or month within a date range, and the
//! number of stations per community area. Nothing here writes.

use bikeshare_trip_models::DayCounts;
use chrono::NaiveDate;
use duckdb::{Connection, Row};
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::DbError;

const SUM_COUNTERS: &str = "CAST(COALESCE(SUM(d.acoustic_arrive), 0) AS BIGINT),
        CAST(COALESCE(SUM(d.acoustic_depart), 0) AS BIGINT),
        CAST(COALESCE(SUM(d.electric_arrive), 0) AS BIGINT),
        CAST(COALESCE(SUM(d.electric_depart), 0) AS BIGINT)";

fn counts_at(row: &Row<'_>, first: usize) -> duckdb::Result<DayCounts> {
    Ok(DayCounts {
        acoustic_arrive: row.get(first)?,
        acoustic_depart: row.get(first + 1)?,
        electric_arrive: row.get(first + 2)?,
        electric_depart: row.get(first + 3)?,
    })
}

/// Counter totals for one station across every stored day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationTotals {
    /// Station id.
    pub station_id: i64,
    /// Station name.
    pub name: String,
    /// Community area number.
    pub community_area: Option<i32>,
    /// Community area name.
    pub community_area_name: Option<String>,
    /// Summed counters.
    pub counts: DayCounts,
}

/// Returns totals for every station, busiest first. Stations with no
/// counters have all-zero totals.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn station_totals(conn: &Connection) -> Result<Vec<StationTotals>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT s.id, s.name, s.community_area, s.community_area_name, {SUM_COUNTERS}
         FROM stations s
         LEFT JOIN station_days d ON d.station_id = s.id
         GROUP BY s.id, s.name, s.community_area, s.community_area_name
         ORDER BY COALESCE(SUM(d.acoustic_arrive + d.acoustic_depart
                              + d.electric_arrive + d.electric_depart), 0) DESC, s.id"
    ))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(StationTotals {
                station_id: row.get(0)?,
                name: row.get(1)?,
                community_area: row.get(2)?,
                community_area_name: row.get(3)?,
                counts: counts_at(row, 4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Counter totals for one community area. Stations without an area are
/// grouped under `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaTotals {
    /// Community area number.
    pub community_area: Option<i32>,
    /// Community area name.
    pub community_area_name: Option<String>,
    /// Summed counters.
    pub counts: DayCounts,
}

/// Returns totals grouped by community area, ordered by area number.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn totals_by_area(conn: &Connection) -> Result<Vec<AreaTotals>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT s.community_area, MIN(s.community_area_name), {SUM_COUNTERS}
         FROM station_days d
         JOIN stations s ON s.id = d.station_id
         GROUP BY s.community_area
         ORDER BY s.community_area NULLS LAST"
    ))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(AreaTotals {
                community_area: row.get(0)?,
                community_area_name: row.get(1)?,
                counts: counts_at(row, 2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Time bucket for [`totals_by_window`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TimeWindow {
    /// One row per calendar day.
    Day,
    /// One row per calendar month.
    Month,
}

/// Counter totals for one time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowTotals {
    /// First day of the bucket.
    pub start: NaiveDate,
    /// Summed counters.
    pub counts: DayCounts,
}

/// Returns totals per day or month for days in `from..=to`, in date
/// order. Buckets with no counters are omitted.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn totals_by_window(
    conn: &Connection,
    window: TimeWindow,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<WindowTotals>, DbError> {
    let bucket = match window {
        TimeWindow::Day => "make_date(d.year, d.month, d.day)",
        TimeWindow::Month => "make_date(d.year, d.month, 1)",
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT strftime({bucket}, '%Y-%m-%d') AS bucket, {SUM_COUNTERS}
         FROM station_days d
         WHERE make_date(d.year, d.month, d.day)
               BETWEEN CAST(? AS DATE) AND CAST(? AS DATE)
         GROUP BY bucket
         ORDER BY bucket"
    ))?;

    let mut rows = stmt.query(duckdb::params![
        from.format("%Y-%m-%d").to_string(),
        to.format("%Y-%m-%d").to_string(),
    ])?;

    let mut totals = Vec::new();
    while let Some(row) = rows.next()? {
        let bucket: String = row.get(0)?;
        let start = NaiveDate::parse_from_str(&bucket, "%Y-%m-%d").map_err(|e| {
            DbError::Conversion {
                message: format!("Invalid bucket date {bucket}: {e}"),
            }
        })?;
        totals.push(WindowTotals {
            start,
            counts: counts_at(row, 1)?,
        });
    }

    Ok(totals)
}

/// Number of stations assigned to one community area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaStationCount {
    /// Community area number, `None` for unassigned stations.
    pub community_area: Option<i32>,
    /// Community area name.
    pub community_area_name: Option<String>,
    /// Number of stations.
    pub stations: i64,
}

/// Returns the station count per community area, largest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn stations_per_area(conn: &Connection) -> Result<Vec<AreaStationCount>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT community_area, MIN(community_area_name), COUNT(*)
         FROM stations
         GROUP BY community_area
         ORDER BY COUNT(*) DESC, community_area NULLS LAST",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(AreaStationCount {
                community_area: row.get(0)?,
                community_area_name: row.get(1)?,
                stations: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

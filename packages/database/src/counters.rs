//! The `station_days` table and the trip groupings that feed it.
//!
//! Counters only ever grow: [`apply_delta`] adds to the stored values and
//! never overwrites them.

use bikeshare_trip_models::{DayCounts, Direction, StationDayKey};
use chrono::NaiveDate;
use duckdb::Connection;

use crate::DbError;

/// Trips sharing a station, calendar day, and bike tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripGroup {
    /// Resolved station id.
    pub station_id: i64,
    /// Calendar day of the trip timestamp for this direction.
    pub date: NaiveDate,
    /// Raw `rideable_type` tag.
    pub rideable_type: Option<String>,
    /// Number of trips in the group.
    pub trips: i64,
}

/// Groups stored trips by station and day for one direction. Departures
/// use the start station and `started_at`; arrivals the end station and
/// `ended_at`. Trips with a null timestamp, or whose station name (or code
/// when the name is missing) matches no stored station, are left out.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or returns an invalid date.
pub fn trip_groups(conn: &Connection, direction: Direction) -> Result<Vec<TripGroup>, DbError> {
    let (name_col, code_col, ts_col) = match direction {
        Direction::Depart => ("start_station_name", "start_station_id", "started_at"),
        Direction::Arrive => ("end_station_name", "end_station_id", "ended_at"),
    };

    let sql = format!(
        "SELECT s.id,
                CAST(year(t.{ts_col}) AS INTEGER),
                CAST(month(t.{ts_col}) AS INTEGER),
                CAST(day(t.{ts_col}) AS INTEGER),
                t.rideable_type,
                COUNT(*)
         FROM trips_raw t
         JOIN stations s ON s.name = COALESCE(t.{name_col}, t.{code_col})
         WHERE t.{ts_col} IS NOT NULL
         GROUP BY s.id, year(t.{ts_col}), month(t.{ts_col}), day(t.{ts_col}), t.rideable_type
         ORDER BY 1, 2, 3, 4, 5"
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut groups = Vec::new();

    while let Some(row) = rows.next()? {
        let year: i32 = row.get(1)?;
        let month: i32 = row.get(2)?;
        let day: i32 = row.get(3)?;
        let date = u32::try_from(month)
            .ok()
            .zip(u32::try_from(day).ok())
            .and_then(|(m, d)| NaiveDate::from_ymd_opt(year, m, d))
            .ok_or_else(|| DbError::Conversion {
                message: format!("Invalid trip date {year}-{month}-{day}"),
            })?;

        groups.push(TripGroup {
            station_id: row.get(0)?,
            date,
            rideable_type: row.get(4)?,
            trips: row.get(5)?,
        });
    }

    Ok(groups)
}

/// Adds `delta` to the counters for `key`, creating the row with `delta`
/// as its initial value if it does not exist. Returns `true` if the row
/// was created.
///
/// # Errors
///
/// Returns [`DbError`] if a statement fails.
pub fn apply_delta(conn: &Connection, key: &StationDayKey, delta: &DayCounts) -> Result<bool, DbError> {
    let updated = conn.execute(
        "UPDATE station_days SET
            acoustic_arrive = acoustic_arrive + ?,
            acoustic_depart = acoustic_depart + ?,
            electric_arrive = electric_arrive + ?,
            electric_depart = electric_depart + ?
         WHERE station_id = ? AND day = ? AND month = ? AND year = ?",
        duckdb::params![
            delta.acoustic_arrive,
            delta.acoustic_depart,
            delta.electric_arrive,
            delta.electric_depart,
            key.station_id,
            key.day,
            key.month,
            key.year,
        ],
    )?;

    if updated > 0 {
        return Ok(false);
    }

    conn.execute(
        "INSERT INTO station_days (
            station_id, day, month, year,
            acoustic_arrive, acoustic_depart, electric_arrive, electric_depart
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        duckdb::params![
            key.station_id,
            key.day,
            key.month,
            key.year,
            delta.acoustic_arrive,
            delta.acoustic_depart,
            delta.electric_arrive,
            delta.electric_depart,
        ],
    )?;

    Ok(true)
}

/// Returns the stored counters for `key`.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get(conn: &Connection, key: &StationDayKey) -> Result<Option<DayCounts>, DbError> {
    let result = conn.query_row(
        "SELECT acoustic_arrive, acoustic_depart, electric_arrive, electric_depart
         FROM station_days
         WHERE station_id = ? AND day = ? AND month = ? AND year = ?",
        duckdb::params![key.station_id, key.day, key.month, key.year],
        |row| {
            Ok(DayCounts {
                acoustic_arrive: row.get(0)?,
                acoustic_depart: row.get(1)?,
                electric_arrive: row.get(2)?,
                electric_depart: row.get(3)?,
            })
        },
    );

    match result {
        Ok(counts) => Ok(Some(counts)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Returns the number of station-day rows.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn count(conn: &Connection) -> Result<u64, DbError> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM station_days", [], |row| row.get(0))?;
    Ok(u64::try_from(n).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use bikeshare_trip_models::{RawTrip, StationRef};
    use chrono::NaiveDateTime;

    use super::*;
    use crate::stations::{self, StationWrite};
    use crate::{open_memory_pool, trips};

    fn key(station_id: i64) -> StationDayKey {
        StationDayKey::new(station_id, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    fn ts(s: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok()
    }

    fn station_ref(name: &str) -> StationRef {
        StationRef {
            name: Some(name.to_string()),
            ..StationRef::default()
        }
    }

    #[test]
    fn apply_delta_creates_then_adds() {
        let pool = open_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let delta = DayCounts {
            acoustic_arrive: 1,
            acoustic_depart: 2,
            electric_arrive: 3,
            electric_depart: 4,
        };

        assert!(apply_delta(&conn, &key(7), &delta).unwrap());
        assert!(!apply_delta(&conn, &key(7), &delta).unwrap());

        let stored = get(&conn, &key(7)).unwrap().unwrap();
        assert_eq!(
            stored,
            DayCounts {
                acoustic_arrive: 2,
                acoustic_depart: 4,
                electric_arrive: 6,
                electric_depart: 8,
            }
        );
        assert_eq!(count(&conn).unwrap(), 1);
        assert!(get(&conn, &key(8)).unwrap().is_none());
    }

    #[test]
    fn groups_split_by_direction_day_and_tag() {
        let pool = open_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let a = stations::insert(&conn, &StationWrite { name: "A", ..StationWrite::default() }).unwrap();
        let b = stations::insert(&conn, &StationWrite { name: "B", ..StationWrite::default() }).unwrap();

        let mk = |id: &str, tag: &str, start: &str, end: &str| RawTrip {
            ride_id: id.to_string(),
            rideable_type: Some(tag.to_string()),
            started_at: ts(start),
            ended_at: ts(end),
            start: station_ref("A"),
            end: station_ref("B"),
            member_casual: None,
        };

        trips::insert_trip(&conn, &mk("1", "classic_bike", "2024-06-01 08:00:00", "2024-06-01 08:20:00")).unwrap();
        trips::insert_trip(&conn, &mk("2", "classic_bike", "2024-06-01 09:00:00", "2024-06-01 09:20:00")).unwrap();
        trips::insert_trip(&conn, &mk("3", "electric_bike", "2024-06-01 23:50:00", "2024-06-02 00:10:00")).unwrap();

        let departures = trip_groups(&conn, Direction::Depart).unwrap();
        assert_eq!(departures.len(), 2);
        assert!(departures.iter().all(|g| g.station_id == a));
        assert_eq!(
            departures
                .iter()
                .find(|g| g.rideable_type.as_deref() == Some("classic_bike"))
                .map(|g| g.trips),
            Some(2)
        );

        let arrivals = trip_groups(&conn, Direction::Arrive).unwrap();
        assert!(arrivals.iter().all(|g| g.station_id == b));
        let late = arrivals
            .iter()
            .find(|g| g.rideable_type.as_deref() == Some("electric_bike"))
            .unwrap();
        assert_eq!(late.date, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
    }

    #[test]
    fn groups_skip_unknown_stations_and_null_timestamps() {
        let pool = open_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        stations::insert(&conn, &StationWrite { name: "A", ..StationWrite::default() }).unwrap();

        trips::insert_trip(
            &conn,
            &RawTrip {
                ride_id: "x".to_string(),
                rideable_type: Some("classic_bike".to_string()),
                started_at: None,
                ended_at: ts("2024-06-01 08:00:00"),
                start: station_ref("A"),
                end: station_ref("Unknown"),
                member_casual: None,
            },
        )
        .unwrap();

        assert!(trip_groups(&conn, Direction::Depart).unwrap().is_empty());
        assert!(trip_groups(&conn, Direction::Arrive).unwrap().is_empty());
    }

    #[test]
    fn code_only_endpoints_join_by_code() {
        let pool = open_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let id = stations::insert(&conn, &StationWrite { name: "TA1307000039", ..StationWrite::default() }).unwrap();

        trips::insert_trip(
            &conn,
            &RawTrip {
                ride_id: "y".to_string(),
                rideable_type: Some("docked_bike".to_string()),
                started_at: ts("2024-06-01 08:00:00"),
                ended_at: None,
                start: StationRef {
                    code: Some("TA1307000039".to_string()),
                    ..StationRef::default()
                },
                end: StationRef::default(),
                member_casual: None,
            },
        )
        .unwrap();

        let groups = trip_groups(&conn, Direction::Depart).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].station_id, id);
    }
}

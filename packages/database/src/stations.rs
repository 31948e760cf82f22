//! The `stations` table.

use bikeshare_trip_models::Station;
use duckdb::{Connection, Row};

use crate::DbError;

/// Column values written when creating or refreshing a station.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StationWrite<'a> {
    /// Station name (identity key).
    pub name: &'a str,
    /// Source station code.
    pub code: Option<&'a str>,
    /// Latitude.
    pub latitude: Option<f64>,
    /// Longitude.
    pub longitude: Option<f64>,
    /// Community area number.
    pub community_area: Option<i32>,
    /// Community area name.
    pub community_area_name: Option<&'a str>,
}

impl StationWrite<'_> {
    /// Returns `true` if both coordinates are present.
    #[must_use]
    pub const fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

const SELECT_STATION: &str = "SELECT id, name, station_code, latitude, longitude,
        community_area, community_area_name
    FROM stations";

fn station_from_row(row: &Row<'_>) -> duckdb::Result<Station> {
    Ok(Station {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        community_area: row.get(5)?,
        community_area_name: row.get(6)?,
    })
}

/// Looks up a station by name.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Station>, DbError> {
    let mut stmt = conn.prepare(&format!("{SELECT_STATION} WHERE name = ?"))?;
    let result = stmt.query_row([name], station_from_row);

    match result {
        Ok(station) => Ok(Some(station)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Inserts a new station and returns its id.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails (including a name that already
/// exists).
pub fn insert(conn: &Connection, station: &StationWrite<'_>) -> Result<i64, DbError> {
    let mut stmt = conn.prepare(
        "INSERT INTO stations (
            name, station_code, latitude, longitude, community_area, community_area_name
        ) VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id",
    )?;

    let id = stmt.query_row(
        duckdb::params![
            station.name,
            station.code,
            station.latitude,
            station.longitude,
            station.community_area,
            station.community_area_name,
        ],
        |row| row.get(0),
    )?;

    Ok(id)
}

/// Overwrites the code, coordinates, and community area of an existing
/// station.
///
/// # Errors
///
/// Returns [`DbError`] if the update fails.
pub fn refresh(conn: &Connection, id: i64, station: &StationWrite<'_>) -> Result<(), DbError> {
    conn.execute(
        "UPDATE stations SET
            station_code = COALESCE(?, station_code),
            latitude = ?,
            longitude = ?,
            community_area = ?,
            community_area_name = ?,
            updated_at = current_timestamp
         WHERE id = ?",
        duckdb::params![
            station.code,
            station.latitude,
            station.longitude,
            station.community_area,
            station.community_area_name,
            id,
        ],
    )?;
    Ok(())
}

/// Sets (or clears) the community area of one station.
///
/// # Errors
///
/// Returns [`DbError`] if the update fails.
pub fn set_area(
    conn: &Connection,
    id: i64,
    area: Option<(i32, &str)>,
) -> Result<(), DbError> {
    conn.execute(
        "UPDATE stations SET
            community_area = ?,
            community_area_name = ?,
            updated_at = current_timestamp
         WHERE id = ?",
        duckdb::params![area.map(|(n, _)| n), area.map(|(_, name)| name), id],
    )?;
    Ok(())
}

/// Returns stations that have coordinates but no community area.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn list_unassigned(conn: &Connection) -> Result<Vec<Station>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_STATION}
         WHERE community_area IS NULL
           AND latitude IS NOT NULL
           AND longitude IS NOT NULL
         ORDER BY id"
    ))?;

    let stations = stmt
        .query_map([], station_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(stations)
}

/// Returns every station ordered by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn list_all(conn: &Connection) -> Result<Vec<Station>, DbError> {
    let mut stmt = conn.prepare(&format!("{SELECT_STATION} ORDER BY id"))?;
    let stations = stmt
        .query_map([], station_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(stations)
}

/// Returns the number of stored stations.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn count(conn: &Connection) -> Result<u64, DbError> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM stations", [], |row| row.get(0))?;
    Ok(u64::try_from(n).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::open_memory_pool;

    fn loop_station() -> StationWrite<'static> {
        StationWrite {
            name: "Clark St & Lake St",
            code: Some("KA1503000012"),
            latitude: Some(41.886),
            longitude: Some(-87.631),
            community_area: Some(32),
            community_area_name: Some("LOOP"),
        }
    }

    #[test]
    fn insert_then_find_by_name() {
        let pool = open_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let id = insert(&conn, &loop_station()).unwrap();
        let found = find_by_name(&conn, "Clark St & Lake St").unwrap().unwrap();

        assert_eq!(found.id, id);
        assert_eq!(found.code.as_deref(), Some("KA1503000012"));
        assert_eq!(found.community_area, Some(32));
        assert_eq!(found.community_area_name.as_deref(), Some("LOOP"));
        assert!(find_by_name(&conn, "Nowhere").unwrap().is_none());
    }

    #[test]
    fn ids_are_assigned_in_insert_order() {
        let pool = open_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let a = insert(&conn, &StationWrite { name: "A", ..StationWrite::default() }).unwrap();
        let b = insert(&conn, &StationWrite { name: "B", ..StationWrite::default() }).unwrap();
        assert!(b > a);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let pool = open_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        insert(&conn, &loop_station()).unwrap();
        assert!(insert(&conn, &loop_station()).is_err());
        assert_eq!(count(&conn).unwrap(), 1);
    }

    #[test]
    fn refresh_overwrites_location_and_area() {
        let pool = open_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let id = insert(&conn, &loop_station()).unwrap();

        refresh(
            &conn,
            id,
            &StationWrite {
                name: "Clark St & Lake St",
                code: None,
                latitude: Some(41.95),
                longitude: Some(-87.65),
                community_area: None,
                community_area_name: None,
            },
        )
        .unwrap();

        let station = find_by_name(&conn, "Clark St & Lake St").unwrap().unwrap();
        assert_eq!(station.latitude, Some(41.95));
        assert_eq!(station.community_area, None);
        // A missing code keeps the stored one.
        assert_eq!(station.code.as_deref(), Some("KA1503000012"));
    }

    #[test]
    fn unassigned_requires_coordinates_and_missing_area() {
        let pool = open_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        insert(&conn, &loop_station()).unwrap();
        insert(&conn, &StationWrite { name: "No coords", ..StationWrite::default() }).unwrap();
        let open = insert(
            &conn,
            &StationWrite {
                name: "Lake Park",
                latitude: Some(41.79),
                longitude: Some(-87.59),
                ..StationWrite::default()
            },
        )
        .unwrap();

        let unassigned = list_unassigned(&conn).unwrap();
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].id, open);

        set_area(&conn, open, Some((41, "HYDE PARK"))).unwrap();
        assert!(list_unassigned(&conn).unwrap().is_empty());
        assert_eq!(list_all(&conn).unwrap().len(), 3);
    }
}

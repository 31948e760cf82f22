//! Pool construction and schema.

use std::path::Path;

use duckdb::{Connection, DuckdbConnectionManager};

use crate::{DbError, DbPool};

/// Connections kept by the pool. Imports use one at a time; the extra
/// connections serve read queries.
const POOL_SIZE: u32 = 4;

/// Opens (or creates) the database file and returns a connection pool.
/// The schema is created if missing.
///
/// # Errors
///
/// Returns [`DbError`] if the directory, database, pool, or schema cannot
/// be created.
pub fn open_pool(path: &Path) -> Result<DbPool, DbError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        crate::paths::ensure_dir(parent)?;
    }

    log::debug!("Opening database at {}", path.display());
    build_pool(DuckdbConnectionManager::file(path)?)
}

/// Returns a pool over a private in-memory database. All connections of
/// the pool see the same data.
///
/// # Errors
///
/// Returns [`DbError`] if the pool or schema cannot be created.
pub fn open_memory_pool() -> Result<DbPool, DbError> {
    build_pool(DuckdbConnectionManager::memory()?)
}

fn build_pool(manager: DuckdbConnectionManager) -> Result<DbPool, DbError> {
    let pool = r2d2::Pool::builder().max_size(POOL_SIZE).build(manager)?;
    let conn = pool.get()?;
    create_schema(&conn)?;
    drop(conn);
    Ok(pool)
}

/// Creates the tables if they don't exist. Safe to call repeatedly.
///
/// # Errors
///
/// Returns [`DbError`] if a statement fails.
pub fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE SEQUENCE IF NOT EXISTS stations_id_seq START 1;

        CREATE TABLE IF NOT EXISTS stations (
            id BIGINT PRIMARY KEY DEFAULT nextval('stations_id_seq'),
            name TEXT NOT NULL UNIQUE,
            station_code TEXT,
            latitude DOUBLE,
            longitude DOUBLE,
            community_area INTEGER,
            community_area_name TEXT,
            created_at TIMESTAMP DEFAULT current_timestamp,
            updated_at TIMESTAMP DEFAULT current_timestamp
        );

        CREATE TABLE IF NOT EXISTS trips_raw (
            ride_id TEXT PRIMARY KEY,
            rideable_type TEXT,
            started_at TIMESTAMP,
            ended_at TIMESTAMP,
            start_station_name TEXT,
            start_station_id TEXT,
            end_station_name TEXT,
            end_station_id TEXT,
            start_lat DOUBLE,
            start_lng DOUBLE,
            end_lat DOUBLE,
            end_lng DOUBLE,
            member_casual TEXT,
            inserted_at TIMESTAMP DEFAULT current_timestamp
        );

        CREATE TABLE IF NOT EXISTS station_days (
            station_id BIGINT NOT NULL,
            day INTEGER NOT NULL,
            month INTEGER NOT NULL,
            year INTEGER NOT NULL,
            acoustic_arrive BIGINT NOT NULL DEFAULT 0,
            acoustic_depart BIGINT NOT NULL DEFAULT 0,
            electric_arrive BIGINT NOT NULL DEFAULT 0,
            electric_depart BIGINT NOT NULL DEFAULT 0,
            PRIMARY KEY (station_id, day, month, year)
        );",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_count(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_name IN ('stations', 'trips_raw', 'station_days')",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn memory_pool_has_schema() {
        let pool = open_memory_pool().unwrap();
        assert_eq!(table_count(&pool.get().unwrap()), 3);
    }

    #[test]
    fn schema_creation_is_idempotent() {
        let pool = open_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        create_schema(&conn).unwrap();
        create_schema(&conn).unwrap();
        assert_eq!(table_count(&conn), 3);
    }

    #[test]
    fn pool_connections_share_one_database() {
        let pool = open_memory_pool().unwrap();
        let a = pool.get().unwrap();
        let b = pool.get().unwrap();

        a.execute("INSERT INTO stations (name) VALUES ('Shared')", [])
            .unwrap();
        let n: i64 = b
            .query_row("SELECT COUNT(*) FROM stations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn file_pool_creates_parent_dirs_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared").join("test.duckdb");

        {
            let pool = open_pool(&path).unwrap();
            pool.get()
                .unwrap()
                .execute("INSERT INTO stations (name) VALUES ('Kept')", [])
                .unwrap();
        }

        let pool = open_pool(&path).unwrap();
        let n: i64 = pool
            .get()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM stations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(n, 1);
    }
}

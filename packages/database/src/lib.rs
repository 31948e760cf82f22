#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `DuckDB` storage for the bike-share importer.
//!
//! One database file holds three tables: `stations` (unique on name),
//! `trips_raw` (unique on `ride_id`), and `station_days` (unique on
//! station and calendar day). Connections are handed out by an `r2d2`
//! pool; callers open a transaction on the checked-out connection and
//! pass it to the functions here as a plain [`duckdb::Connection`].

pub mod counters;
pub mod paths;
pub mod queries;
pub mod stations;
pub mod store;
pub mod trips;

pub use store::{create_schema, open_memory_pool, open_pool};

use duckdb::DuckdbConnectionManager;

/// Pool of connections to one `DuckDB` database.
pub type DbPool = r2d2::Pool<DuckdbConnectionManager>;

/// A connection checked out of a [`DbPool`].
pub type PooledConnection = r2d2::PooledConnection<DuckdbConnectionManager>;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` query or connection error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Connection pool checkout or construction failed.
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Filesystem error (creating the data directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

#![allow(clippy::module_name_repetitions)]
//! Default file locations under the project's `data/` directory.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory, resolved at compile time from
/// `CARGO_MANIFEST_DIR`. Falls back to the current directory.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the `data/csv/` directory where monthly trip files live.
#[must_use]
pub fn csv_dir() -> PathBuf {
    data_dir().join("csv")
}

/// Returns the `data/shared/` directory for the database and caches.
#[must_use]
pub fn shared_dir() -> PathBuf {
    data_dir().join("shared")
}

/// Returns the default `DuckDB` file path.
#[must_use]
pub fn db_path() -> PathBuf {
    shared_dir().join("bikeshare.duckdb")
}

/// Returns the default community area boundary cache path.
#[must_use]
pub fn areas_cache_path() -> PathBuf {
    shared_dir().join("community_areas.json")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

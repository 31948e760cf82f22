//! Runtime configuration from environment variables.
//!
//! | Variable                | Default                              |
//! |-------------------------|--------------------------------------|
//! | `BIKESHARE_DATA_DIR`    | `data/csv`                           |
//! | `BIKESHARE_DB_PATH`     | `data/shared/bikeshare.duckdb`       |
//! | `BIKESHARE_AREAS_CACHE` | `data/shared/community_areas.json`   |
//! | `BIKESHARE_AREAS_URL`   | City of Chicago community areas feed |

use std::path::PathBuf;

use bikeshare_database::paths;
use bikeshare_geography::DEFAULT_AREAS_URL;

use crate::IngestError;

/// Resolved locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// Directory holding the monthly CSV files.
    pub data_dir: PathBuf,
    /// `DuckDB` database file.
    pub db_path: PathBuf,
    /// Community area boundary cache.
    pub areas_cache: PathBuf,
    /// Community area boundary source.
    pub areas_url: String,
}

impl ImportConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Configuration`] if a variable is set but
    /// empty.
    pub fn from_env() -> Result<Self, IngestError> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, falling back to the
    /// defaults under the workspace `data/` directory.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Configuration`] if a variable is set but
    /// empty.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, IngestError> {
        let var = |key: &str| -> Result<Option<String>, IngestError> {
            match lookup(key) {
                Some(value) if value.trim().is_empty() => Err(IngestError::Configuration {
                    message: format!("{key} is set but empty"),
                }),
                other => Ok(other.map(|v| v.trim().to_string())),
            }
        };

        Ok(Self {
            data_dir: var("BIKESHARE_DATA_DIR")?.map_or_else(paths::csv_dir, PathBuf::from),
            db_path: var("BIKESHARE_DB_PATH")?.map_or_else(paths::db_path, PathBuf::from),
            areas_cache: var("BIKESHARE_AREAS_CACHE")?
                .map_or_else(paths::areas_cache_path, PathBuf::from),
            areas_url: var("BIKESHARE_AREAS_URL")?.unwrap_or_else(|| DEFAULT_AREAS_URL.to_string()),
        })
    }

    /// Checks that the data directory exists. Called before an import so
    /// a bad path fails before the database is opened.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Configuration`] if `data_dir` is missing or
    /// not a directory.
    pub fn require_data_dir(&self) -> Result<(), IngestError> {
        if self.data_dir.is_dir() {
            Ok(())
        } else {
            Err(IngestError::Configuration {
                message: format!("data directory {} does not exist", self.data_dir.display()),
            })
        }
    }

    /// Creates the database file's parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Configuration`] if the path has no file name,
    /// or [`IngestError::Io`] if the directory cannot be created.
    pub fn prepare_db_dir(&self) -> Result<(), IngestError> {
        if self.db_path.file_name().is_none() {
            return Err(IngestError::Configuration {
                message: format!("database path {} names no file", self.db_path.display()),
            });
        }
        if let Some(parent) = self.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            paths::ensure_dir(parent)?;
        }
        Ok(())
    }
}

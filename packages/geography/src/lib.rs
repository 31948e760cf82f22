#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Community area boundary loading.
//!
//! Boundaries come from a local JSON cache when one exists; otherwise they
//! are downloaded from the City of Chicago open data portal as a `GeoJSON`
//! `FeatureCollection`, converted to `{id, name, geometry}` records, and
//! written to the cache for the next run.

pub mod cache;
pub mod fetch;

use std::path::Path;

use bikeshare_geography_models::CommunityArea;
use bikeshare_spatial::GeoIndex;
use thiserror::Error;

/// Community area boundaries export (`GeoJSON`).
pub const DEFAULT_AREAS_URL: &str =
    "https://data.cityofchicago.org/api/geospatial/cauq-8yn6?method=export&format=GeoJSON";

/// Errors that can occur while loading community area boundaries.
#[derive(Debug, Error)]
pub enum GeoError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Reading or writing the cache file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Loads community areas, from `cache_path` when present, otherwise from
/// `url` (and then writes the cache). With `refresh`, the cache is ignored
/// and overwritten.
///
/// # Errors
///
/// Returns [`GeoError`] if the cache cannot be read or written, or the
/// download fails.
pub async fn load_areas(
    cache_path: &Path,
    url: &str,
    refresh: bool,
) -> Result<Vec<CommunityArea>, GeoError> {
    let records = match (refresh, cache::read_cache(cache_path)?) {
        (false, Some(records)) => {
            log::info!(
                "Loaded {} community areas from {}",
                records.len(),
                cache_path.display()
            );
            records
        }
        _ => {
            log::info!("Fetching community area boundaries from {url}");
            let client = reqwest::Client::new();
            let records = fetch::fetch_community_areas(&client, url).await?;
            cache::write_cache(cache_path, &records)?;
            log::info!(
                "Cached {} community areas at {}",
                records.len(),
                cache_path.display()
            );
            records
        }
    };

    Ok(cache::areas_from_records(&records))
}

/// [`load_areas`], then builds the lookup index.
///
/// # Errors
///
/// See [`load_areas`].
pub async fn load_index(cache_path: &Path, url: &str, refresh: bool) -> Result<GeoIndex, GeoError> {
    Ok(GeoIndex::new(load_areas(cache_path, url, refresh).await?))
}

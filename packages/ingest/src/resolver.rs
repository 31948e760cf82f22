//! Station resolution: station reference to canonical station id.
//!
//! Stations are keyed by name (or by code when a file has no name). The
//! first time a key is seen in a run it is looked up in storage and either
//! refreshed or created; later occurrences are served from the
//! [`StationCache`] without touching storage.

use std::collections::BTreeMap;

use bikeshare_database::DbError;
use bikeshare_database::stations::{self, StationWrite};
use bikeshare_ingest_models::ResolverStats;
use bikeshare_source::normalize::NormalizedRow;
use bikeshare_spatial::GeoIndex;
use bikeshare_trip_models::StationRef;
use duckdb::Connection;

/// Per-run mapping from station key to station id.
///
/// Entries added since the last [`commit`](Self::commit) can be dropped
/// with [`rollback`](Self::rollback) when the transaction that created
/// them fails.
#[derive(Debug, Default)]
pub struct StationCache {
    ids: BTreeMap<String, i64>,
    pending: Vec<String>,
}

impl StationCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached id for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<i64> {
        self.ids.get(key).copied()
    }

    fn insert(&mut self, key: &str, id: i64) {
        self.ids.insert(key.to_string(), id);
        self.pending.push(key.to_string());
    }

    /// Keeps every entry added since the last commit.
    pub fn commit(&mut self) {
        self.pending.clear();
    }

    /// Forgets every entry added since the last commit.
    pub fn rollback(&mut self) {
        for key in self.pending.drain(..) {
            self.ids.remove(&key);
        }
    }

    /// Number of cached stations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// How a station reference was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Answered from the cache.
    Cached(i64),
    /// Found in storage and refreshed.
    Refreshed(i64),
    /// Inserted.
    Created(i64),
}

impl Resolution {
    /// The station id.
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::Cached(id) | Self::Refreshed(id) | Self::Created(id) => id,
        }
    }

    fn tally(self, stats: &mut ResolverStats) {
        match self {
            Self::Cached(_) => stats.cache_hits += 1,
            Self::Refreshed(_) => stats.refreshed += 1,
            Self::Created(_) => stats.created += 1,
        }
    }
}

/// Resolves one station reference to a station id. Returns `Ok(None)` for
/// a reference with neither name nor code.
///
/// On a cache miss the station is looked up by key. An existing station
/// has its code, coordinates, and community area overwritten when this
/// reference carries coordinates. A new station is geocoded against `geo`
/// (no match leaves the area empty) and inserted.
///
/// # Errors
///
/// Returns [`DbError`] if a lookup or write fails.
pub fn resolve(
    conn: &Connection,
    geo: &GeoIndex,
    cache: &mut StationCache,
    station: &StationRef,
) -> Result<Option<Resolution>, DbError> {
    let Some(key) = station.key() else {
        return Ok(None);
    };

    if let Some(id) = cache.get(key) {
        return Ok(Some(Resolution::Cached(id)));
    }

    let area = geo.locate(station.latitude, station.longitude);
    let write = StationWrite {
        name: key,
        code: station.code.as_deref(),
        latitude: station.latitude,
        longitude: station.longitude,
        community_area: area.map(|a| a.id),
        community_area_name: area.map(|a| a.name),
    };

    let resolution = if let Some(existing) = stations::find_by_name(conn, key)? {
        if write.has_coordinates() {
            stations::refresh(conn, existing.id, &write)?;
        }
        Resolution::Refreshed(existing.id)
    } else {
        let id = stations::insert(conn, &write)?;
        log::debug!(
            "Created station {id} '{key}' (area: {})",
            area.map_or("none", |a| a.name)
        );
        Resolution::Created(id)
    };

    cache.insert(key, resolution.id());
    Ok(Some(resolution))
}

/// Resolves every station referenced by `rows` (both endpoints of every
/// trip) in row order.
///
/// # Errors
///
/// Returns [`DbError`] on the first failed lookup or write. Cache entries
/// added before the failure stay pending; the caller decides whether to
/// commit or roll them back along with the transaction.
pub fn resolve_rows(
    conn: &Connection,
    geo: &GeoIndex,
    cache: &mut StationCache,
    rows: &[NormalizedRow],
) -> Result<ResolverStats, DbError> {
    let mut stats = ResolverStats::default();

    for trip in rows.iter().filter_map(NormalizedRow::trip) {
        for station in trip.stations() {
            if let Some(resolution) = resolve(conn, geo, cache, station)? {
                resolution.tally(&mut stats);
            }
        }
    }

    Ok(stats)
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Community area boundary types.
//!
//! [`AreaRecord`] is the shape of one entry in the on-disk boundary cache
//! (`{id, name, geometry}` with a `GeoJSON` `Polygon` or `MultiPolygon`).
//! [`CommunityArea`] is the loaded form used for point lookups: only the
//! outer ring of each polygon is kept.

use serde::{Deserialize, Serialize};

/// One community area as stored in the boundary cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRecord {
    /// Community area number (1-77 for Chicago).
    pub id: i32,
    /// Community area name (e.g. `"LOOP"`).
    pub name: String,
    /// Boundary geometry.
    pub geometry: geojson::Geometry,
}

/// A latitude/longitude vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lng: f64,
}

impl LatLng {
    /// Creates a vertex.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A community area reduced to the outer rings of its polygons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityArea {
    /// Community area number.
    pub id: i32,
    /// Community area name.
    pub name: String,
    /// One outer ring per polygon part. Interior rings (holes) are not kept.
    pub rings: Vec<Vec<LatLng>>,
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory community area index for station attribution.
//!
//! Built once per run from the loaded [`CommunityArea`] list and queried
//! once per distinct station. Containment uses a horizontal ray-crossing
//! test against each polygon's outer ring only, so points inside a hole
//! still count as inside the area. Station assignments already stored
//! depend on that behavior.

use bikeshare_geography_models::CommunityArea;
use geo::{BoundingRect as _, Coord, LineString, Rect};

/// A community area ready for lookups.
struct AreaEntry {
    id: i32,
    name: String,
    /// Outer rings, x = longitude, y = latitude, closed.
    rings: Vec<LineString<f64>>,
    bounds: Option<Rect<f64>>,
}

/// The area a point was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaHit<'a> {
    /// Community area number.
    pub id: i32,
    /// Community area name.
    pub name: &'a str,
}

/// Point-in-polygon index over community areas.
///
/// Areas are scanned linearly in load order; the first area with a ring
/// containing the point wins.
pub struct GeoIndex {
    areas: Vec<AreaEntry>,
}

impl GeoIndex {
    /// Builds an index from loaded community areas. Areas without any ring
    /// of at least three vertices are dropped.
    #[must_use]
    pub fn new(areas: Vec<CommunityArea>) -> Self {
        let mut entries = Vec::with_capacity(areas.len());

        for area in areas {
            let rings: Vec<LineString<f64>> = area
                .rings
                .iter()
                .filter(|ring| ring.len() >= 3)
                .map(|ring| {
                    let mut line: LineString<f64> =
                        ring.iter().map(|v| Coord { x: v.lng, y: v.lat }).collect();
                    line.close();
                    line
                })
                .collect();

            if rings.is_empty() {
                log::warn!("Community area {} ({}) has no usable ring", area.id, area.name);
                continue;
            }

            let bounds = rings
                .iter()
                .filter_map(LineString::bounding_rect)
                .reduce(|a, b| {
                    Rect::new(
                        Coord {
                            x: a.min().x.min(b.min().x),
                            y: a.min().y.min(b.min().y),
                        },
                        Coord {
                            x: a.max().x.max(b.max().x),
                            y: a.max().y.max(b.max().y),
                        },
                    )
                });

            entries.push(AreaEntry {
                id: area.id,
                name: area.name,
                rings,
                bounds,
            });
        }

        log::debug!("Built community area index with {} areas", entries.len());

        Self { areas: entries }
    }

    /// An index with no areas. Every lookup misses.
    #[must_use]
    pub const fn empty() -> Self {
        Self { areas: Vec::new() }
    }

    /// Number of indexed areas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// Returns `true` if no areas are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Finds the community area containing a point.
    ///
    /// Returns `None` when either coordinate is missing or non-finite, or
    /// when no area contains the point.
    #[must_use]
    pub fn locate(&self, lat: Option<f64>, lng: Option<f64>) -> Option<AreaHit<'_>> {
        let (lat, lng) = (lat?, lng?);
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }

        self.areas
            .iter()
            .filter(|area| {
                area.bounds.is_none_or(|b| {
                    lng >= b.min().x && lng <= b.max().x && lat >= b.min().y && lat <= b.max().y
                })
            })
            .find(|area| area.rings.iter().any(|ring| ring_contains(ring, lng, lat)))
            .map(|area| AreaHit {
                id: area.id,
                name: &area.name,
            })
    }
}

/// Horizontal ray-crossing test: counts how many ring edges a ray cast
/// from `(x, y)` towards +x crosses. Odd means inside.
fn ring_contains(ring: &LineString<f64>, x: f64, y: f64) -> bool {
    let mut inside = false;

    for line in ring.lines() {
        let (a, b) = (line.start, line.end);
        if (a.y > y) != (b.y > y) {
            let x_cross = (b.x - a.x) * (y - a.y) / (b.y - a.y) + a.x;
            if x < x_cross {
                inside = !inside;
            }
        }
    }

    inside
}

//! On-disk boundary cache.
//!
//! The cache is a JSON array of [`AreaRecord`]s. Loading it reduces each
//! record to the outer rings used for point lookups.

use std::path::Path;

use bikeshare_geography_models::{AreaRecord, CommunityArea, LatLng};

use crate::GeoError;

/// Reads cached boundary records. Returns `Ok(None)` when the file does
/// not exist.
///
/// # Errors
///
/// Returns [`GeoError`] if the file exists but cannot be read or parsed.
pub fn read_cache(path: &Path) -> Result<Option<Vec<AreaRecord>>, GeoError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Writes boundary records to the cache, creating parent directories.
///
/// # Errors
///
/// Returns [`GeoError`] if the directories or file cannot be written.
pub fn write_cache(path: &Path, records: &[AreaRecord]) -> Result<(), GeoError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, serde_json::to_string(records)?)?;
    Ok(())
}

/// Converts cache records to lookup areas, keeping the first (outer) ring
/// of every polygon. Records whose geometry is neither a `Polygon` nor a
/// `MultiPolygon` are skipped.
#[must_use]
pub fn areas_from_records(records: &[AreaRecord]) -> Vec<CommunityArea> {
    records
        .iter()
        .filter_map(|record| {
            let rings = match &record.geometry.value {
                geojson::Value::Polygon(polygon) => {
                    polygon.first().map(|ring| to_ring(ring)).into_iter().collect()
                }
                geojson::Value::MultiPolygon(polygons) => polygons
                    .iter()
                    .filter_map(|polygon| polygon.first())
                    .map(|ring| to_ring(ring))
                    .collect(),
                _ => {
                    log::warn!(
                        "Community area {} ({}) has unsupported geometry, skipping",
                        record.id,
                        record.name
                    );
                    return None;
                }
            };

            Some(CommunityArea {
                id: record.id,
                name: record.name.clone(),
                rings,
            })
        })
        .collect()
}

/// `GeoJSON` positions are `[lng, lat]`.
fn to_ring(positions: &[Vec<f64>]) -> Vec<LatLng> {
    positions
        .iter()
        .filter_map(|p| match p.as_slice() {
            [lng, lat, ..] => Some(LatLng::new(*lat, *lng)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use geojson::{Geometry, Value};

    use super::*;

    fn polygon_record(id: i32, name: &str) -> AreaRecord {
        AreaRecord {
            id,
            name: name.to_string(),
            geometry: Geometry::new(Value::Polygon(vec![
                vec![
                    vec![-87.64, 41.87],
                    vec![-87.62, 41.87],
                    vec![-87.62, 41.89],
                    vec![-87.64, 41.87],
                ],
                vec![
                    vec![-87.635, 41.875],
                    vec![-87.625, 41.875],
                    vec![-87.625, 41.88],
                    vec![-87.635, 41.875],
                ],
            ])),
        }
    }

    #[test]
    fn missing_cache_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_cache(&dir.path().join("areas.json")).unwrap().is_none());
    }

    #[test]
    fn cache_round_trip_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("shared").join("areas.json");
        let records = vec![polygon_record(32, "LOOP")];

        write_cache(&path, &records).unwrap();
        let loaded = read_cache(&path).unwrap().unwrap();

        assert_eq!(loaded, records);
    }

    #[test]
    fn corrupt_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("areas.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(read_cache(&path), Err(GeoError::Json(_))));
    }

    #[test]
    fn polygon_keeps_only_outer_ring_in_lat_lng_order() {
        let areas = areas_from_records(&[polygon_record(32, "LOOP")]);

        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].rings.len(), 1);
        assert_eq!(areas[0].rings[0][0], LatLng::new(41.87, -87.64));
        assert_eq!(areas[0].rings[0].len(), 4);
    }

    #[test]
    fn multi_polygon_yields_one_ring_per_part() {
        let record = AreaRecord {
            id: 76,
            name: "OHARE".to_string(),
            geometry: Geometry::new(Value::MultiPolygon(vec![
                vec![vec![
                    vec![-87.92, 41.97],
                    vec![-87.91, 41.97],
                    vec![-87.91, 41.98],
                ]],
                vec![vec![
                    vec![-87.95, 42.00],
                    vec![-87.94, 42.00],
                    vec![-87.94, 42.01],
                ]],
            ])),
        };

        let areas = areas_from_records(&[record]);
        assert_eq!(areas[0].rings.len(), 2);
    }

    #[test]
    fn non_polygon_geometry_is_skipped() {
        let record = AreaRecord {
            id: 1,
            name: "POINT".to_string(),
            geometry: Geometry::new(Value::Point(vec![-87.6, 41.9])),
        };
        assert!(areas_from_records(&[record, polygon_record(32, "LOOP")])
            .iter()
            .all(|a| a.id == 32));
    }

    #[test]
    fn hole_in_cached_polygon_does_not_exclude_points() {
        let index = bikeshare_spatial::GeoIndex::new(areas_from_records(&[polygon_record(
            32, "LOOP",
        )]));
        // Inside the interior ring of the record.
        let hit = index.locate(Some(41.876), Some(-87.63));
        assert_eq!(hit.map(|h| h.id), Some(32));
    }
}

//! Boundary download from a `GeoJSON` `FeatureCollection` endpoint.

use bikeshare_geography_models::AreaRecord;
use geojson::{GeoJson, JsonObject};

use crate::GeoError;

/// Downloads the boundary export and converts it to cache records.
///
/// # Errors
///
/// Returns [`GeoError`] if the request fails, the server responds with a
/// non-success status, or the body is not a `FeatureCollection`.
pub async fn fetch_community_areas(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<AreaRecord>, GeoError> {
    let resp = client.get(url).send().await?;
    if !resp.status().is_success() {
        return Err(GeoError::Conversion {
            message: format!("Boundary request failed with status {}", resp.status()),
        });
    }
    let body = resp.text().await?;

    parse_feature_collection(&body)
}

/// Converts a `FeatureCollection` body to cache records.
///
/// The area number is read from `area_num_1`, falling back to
/// `area_numbe`; the name from `community`. Features without a polygon
/// geometry or a readable area number are skipped.
///
/// # Errors
///
/// Returns [`GeoError`] if the body is not a `FeatureCollection`.
pub fn parse_feature_collection(body: &str) -> Result<Vec<AreaRecord>, GeoError> {
    let GeoJson::FeatureCollection(collection) = body.parse::<GeoJson>()? else {
        return Err(GeoError::Conversion {
            message: "Boundary response is not a FeatureCollection".to_string(),
        });
    };
    let mut records = Vec::with_capacity(collection.features.len());

    for feature in collection.features {
        let props = feature.properties.unwrap_or_default();

        let Some(geometry) = feature.geometry else {
            log::warn!("Skipping boundary feature without geometry");
            continue;
        };
        if !matches!(
            geometry.value,
            geojson::Value::Polygon(_) | geojson::Value::MultiPolygon(_)
        ) {
            log::warn!("Skipping boundary feature with non-polygon geometry");
            continue;
        }

        let Some(id) = area_number(&props) else {
            log::warn!("Skipping boundary feature without an area number");
            continue;
        };

        let name = props
            .get("community")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| "Unknown".to_string(), |s| s.trim().to_string());

        records.push(AreaRecord { id, name, geometry });
    }

    Ok(records)
}

/// The export carries area numbers as strings; accept numbers too.
fn area_number(props: &JsonObject) -> Option<i32> {
    ["area_num_1", "area_numbe"].iter().find_map(|key| {
        match props.get(*key)? {
            serde_json::Value::String(s) => s.trim().parse().ok(),
            serde_json::Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
            _ => None,
        }
    })
}

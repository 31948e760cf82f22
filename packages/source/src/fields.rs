//! Ordered column aliases for each logical trip field.

use serde::Deserialize;

use crate::SourceError;
use crate::csv_file::CsvRow;

/// The alias table baked into the binary.
const EMBEDDED_FIELDS: &str = include_str!("../fields.toml");

/// Column aliases per logical field, tried in order (first non-empty
/// value wins). Aliases are written in normalized header form; see
/// [`normalize_header`].
#[derive(Debug, Clone, Deserialize)]
pub struct FieldTable {
    /// Trip identifier.
    pub ride_id: Vec<String>,
    /// Bike type tag.
    pub rideable_type: Vec<String>,
    /// Start timestamp.
    pub started_at: Vec<String>,
    /// End timestamp.
    pub ended_at: Vec<String>,
    /// Start station code.
    pub start_station_id: Vec<String>,
    /// Start station name.
    pub start_station_name: Vec<String>,
    /// End station code.
    pub end_station_id: Vec<String>,
    /// End station name.
    pub end_station_name: Vec<String>,
    /// Start latitude.
    #[serde(default)]
    pub start_lat: Vec<String>,
    /// Start longitude.
    #[serde(default)]
    pub start_lng: Vec<String>,
    /// End latitude.
    #[serde(default)]
    pub end_lat: Vec<String>,
    /// End longitude.
    #[serde(default)]
    pub end_lng: Vec<String>,
    /// Rider category.
    #[serde(default)]
    pub member_casual: Vec<String>,
}

impl FieldTable {
    /// Parses the alias table embedded from `fields.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::FieldTable`] if the embedded table is
    /// malformed.
    pub fn embedded() -> Result<Self, SourceError> {
        Self::from_toml(EMBEDDED_FIELDS)
    }

    /// Parses an alias table. Aliases are normalized so the table may use
    /// raw header spellings.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::FieldTable`] if the TOML is malformed or a
    /// required field is missing.
    pub fn from_toml(s: &str) -> Result<Self, SourceError> {
        let mut table: Self = toml::from_str(s)?;
        for aliases in table.all_mut() {
            for alias in aliases.iter_mut() {
                *alias = normalize_header(alias);
            }
        }
        Ok(table)
    }

    fn all_mut(&mut self) -> [&mut Vec<String>; 13] {
        [
            &mut self.ride_id,
            &mut self.rideable_type,
            &mut self.started_at,
            &mut self.ended_at,
            &mut self.start_station_id,
            &mut self.start_station_name,
            &mut self.end_station_id,
            &mut self.end_station_name,
            &mut self.start_lat,
            &mut self.start_lng,
            &mut self.end_lat,
            &mut self.end_lng,
            &mut self.member_casual,
        ]
    }
}

/// Normalizes a header name: strips a UTF-8 byte order mark and
/// surrounding quotes/whitespace, lowercases, and replaces spaces with
/// underscores.
#[must_use]
pub fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .trim()
        .trim_matches('"')
        .trim()
        .to_lowercase()
        .replace(' ', "_")
}

/// Returns the first non-empty value among `aliases`, trimmed.
#[must_use]
pub fn lookup<'a>(row: &'a CsvRow, aliases: &[String]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|alias| row.get(alias))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> CsvRow {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn embedded_table_parses() {
        let table = FieldTable::embedded().unwrap();
        assert_eq!(table.ride_id[0], "ride_id");
        assert!(table.ride_id.contains(&"trip_id".to_string()));
        assert!(table.start_station_name.contains(&"from_station_name".to_string()));
        assert!(
            table
                .started_at
                .contains(&"01_-_rental_details_local_start_time".to_string())
        );
    }

    #[test]
    fn normalizes_headers() {
        assert_eq!(normalize_header("  Ride_ID "), "ride_id");
        assert_eq!(
            normalize_header("01 - Rental Details Rental ID"),
            "01_-_rental_details_rental_id"
        );
        assert_eq!(normalize_header("\u{feff}\"trip_id\""), "trip_id");
        assert_eq!(normalize_header("User Type"), "user_type");
    }

    #[test]
    fn lookup_takes_first_non_empty_alias() {
        let aliases = vec!["ride_id".to_string(), "trip_id".to_string()];

        assert_eq!(lookup(&row(&[("ride_id", "A"), ("trip_id", "B")]), &aliases), Some("A"));
        assert_eq!(lookup(&row(&[("ride_id", "  "), ("trip_id", "B")]), &aliases), Some("B"));
        assert_eq!(lookup(&row(&[("trip_id", " 7 ")]), &aliases), Some("7"));
        assert_eq!(lookup(&row(&[("other", "x")]), &aliases), None);
    }

    #[test]
    fn custom_table_aliases_are_normalized() {
        let table = FieldTable::from_toml(
            r#"
            ride_id = ["Rental ID"]
            rideable_type = []
            started_at = ["Start Time"]
            ended_at = ["End Time"]
            start_station_id = []
            start_station_name = ["From"]
            end_station_id = []
            end_station_name = ["To"]
            "#,
        )
        .unwrap();

        assert_eq!(table.ride_id, vec!["rental_id".to_string()]);
        assert!(table.member_casual.is_empty());
    }

    #[test]
    fn missing_required_field_is_an_error() {
        assert!(matches!(
            FieldTable::from_toml("ride_id = [\"ride_id\"]"),
            Err(SourceError::FieldTable(_))
        ));
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical trip, station, and daily counter types.
//!
//! Every input file, whatever its historical column layout, is normalized
//! into [`RawTrip`] records. Stations are identified by name, and the
//! aggregated output is a set of [`StationDayCounter`] rows keyed by
//! station and calendar day.

use chrono::{Datelike as _, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A bike type tag as it appears in the `rideable_type` column.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum BikeType {
    /// Dockable pedal bike (current exports).
    #[serde(rename = "classic_bike")]
    #[strum(serialize = "classic_bike")]
    Classic,
    /// Pedal bike tag used by the 2020-2023 exports.
    #[serde(rename = "docked_bike")]
    #[strum(serialize = "docked_bike")]
    Docked,
    /// Pedal-assist e-bike.
    #[serde(rename = "electric_bike")]
    #[strum(serialize = "electric_bike")]
    Electric,
}

impl BikeType {
    /// Parses a raw tag. Unknown tags (scooters, numeric bike IDs from the
    /// legacy exports, blanks) return `None` and are excluded from counters.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        tag.trim().parse().ok()
    }

    /// Returns the counter bucket this bike type is tallied under.
    #[must_use]
    pub const fn bucket(self) -> CounterBucket {
        match self {
            Self::Classic | Self::Docked => CounterBucket::Acoustic,
            Self::Electric => CounterBucket::Electric,
        }
    }
}

/// The two bike-type buckets tracked by [`DayCounts`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CounterBucket {
    /// Non-electric bikes.
    Acoustic,
    /// Electric bikes.
    Electric,
}

/// Whether a trip is counted at its start station or its end station.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    /// Trip ended at the station.
    Arrive,
    /// Trip started at the station.
    Depart,
}

/// Rider category, normalized across the `member_casual` and `usertype`
/// vocabularies.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RiderCategory {
    /// Annual member (`member`, legacy `Subscriber`).
    #[strum(to_string = "member", serialize = "subscriber")]
    Member,
    /// Single ride or day pass (`casual`, legacy `Customer`).
    #[strum(to_string = "casual", serialize = "customer")]
    Casual,
}

impl RiderCategory {
    /// Parses a raw rider category value, accepting both vocabularies.
    #[must_use]
    pub fn from_raw(value: &str) -> Option<Self> {
        value.trim().parse().ok()
    }
}

/// A reference to a station as it appears on one end of a trip row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRef {
    /// Source station code (e.g. `"TA1307000039"` or legacy `"418"`).
    pub code: Option<String>,
    /// Station name (e.g. `"Clark St & Elm St"`).
    pub name: Option<String>,
    /// Latitude reported on the trip row.
    pub latitude: Option<f64>,
    /// Longitude reported on the trip row.
    pub longitude: Option<f64>,
}

impl StationRef {
    /// Returns the identity key for this station: the name, or the source
    /// code when a file carries a code but no name.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.name.as_deref().or(self.code.as_deref())
    }

    /// Returns `true` if neither a name nor a code is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key().is_none()
    }
}

/// One trip normalized to the canonical schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrip {
    /// Unique ride identifier from the source file (deduplication key).
    pub ride_id: String,
    /// Raw bike type tag, kept verbatim. See [`BikeType::from_tag`].
    pub rideable_type: Option<String>,
    /// Local start time. `None` when missing or unparseable.
    pub started_at: Option<NaiveDateTime>,
    /// Local end time. `None` when missing or unparseable.
    pub ended_at: Option<NaiveDateTime>,
    /// Start station.
    pub start: StationRef,
    /// End station.
    pub end: StationRef,
    /// Rider category.
    pub member_casual: Option<RiderCategory>,
}

impl RawTrip {
    /// Returns the bike type, if the tag is one of the recognized values.
    #[must_use]
    pub fn bike_type(&self) -> Option<BikeType> {
        self.rideable_type.as_deref().and_then(BikeType::from_tag)
    }

    /// Iterates the non-empty station references on this trip.
    pub fn stations(&self) -> impl Iterator<Item = &StationRef> {
        [&self.start, &self.end]
            .into_iter()
            .filter(|s| !s.is_empty())
    }
}

/// A station row as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    /// Database primary key.
    pub id: i64,
    /// Station name (unique).
    pub name: String,
    /// Last seen source station code.
    pub code: Option<String>,
    /// Latitude.
    pub latitude: Option<f64>,
    /// Longitude.
    pub longitude: Option<f64>,
    /// Community area number, if the coordinates fell inside one.
    pub community_area: Option<i32>,
    /// Community area name.
    pub community_area_name: Option<String>,
}

/// Identity of a [`StationDayCounter`] row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationDayKey {
    /// Station primary key.
    pub station_id: i64,
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
    /// Day of month (1-31).
    pub day: u32,
}

impl StationDayKey {
    /// Builds a key from a station and a calendar date.
    #[must_use]
    pub fn new(station_id: i64, date: NaiveDate) -> Self {
        Self {
            station_id,
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    /// Returns the calendar date, or `None` if the parts don't form one.
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

/// The four counters tracked per station per day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCounts {
    /// Non-electric trips ending at the station.
    pub acoustic_arrive: i64,
    /// Non-electric trips starting at the station.
    pub acoustic_depart: i64,
    /// Electric trips ending at the station.
    pub electric_arrive: i64,
    /// Electric trips starting at the station.
    pub electric_depart: i64,
}

impl DayCounts {
    /// Adds `count` trips to the counter for `bucket` and `direction`.
    pub const fn add(&mut self, bucket: CounterBucket, direction: Direction, count: i64) {
        match (bucket, direction) {
            (CounterBucket::Acoustic, Direction::Arrive) => self.acoustic_arrive += count,
            (CounterBucket::Acoustic, Direction::Depart) => self.acoustic_depart += count,
            (CounterBucket::Electric, Direction::Arrive) => self.electric_arrive += count,
            (CounterBucket::Electric, Direction::Depart) => self.electric_depart += count,
        }
    }

    /// Adds every counter of `other` into `self`.
    pub const fn merge(&mut self, other: &Self) {
        self.acoustic_arrive += other.acoustic_arrive;
        self.acoustic_depart += other.acoustic_depart;
        self.electric_arrive += other.electric_arrive;
        self.electric_depart += other.electric_depart;
    }

    /// Sum of all four counters.
    #[must_use]
    pub const fn total(&self) -> i64 {
        self.acoustic_arrive + self.acoustic_depart + self.electric_arrive + self.electric_depart
    }

    /// Returns `true` if every counter is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

/// A per-station, per-day counter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationDayCounter {
    /// Row identity.
    pub key: StationDayKey,
    /// Accumulated counts.
    pub counts: DayCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bike_tags_map_to_buckets() {
        assert_eq!(
            BikeType::from_tag("classic_bike").map(BikeType::bucket),
            Some(CounterBucket::Acoustic)
        );
        assert_eq!(
            BikeType::from_tag("docked_bike").map(BikeType::bucket),
            Some(CounterBucket::Acoustic)
        );
        assert_eq!(
            BikeType::from_tag("electric_bike").map(BikeType::bucket),
            Some(CounterBucket::Electric)
        );
    }

    #[test]
    fn unknown_bike_tags_are_unrecognized() {
        assert_eq!(BikeType::from_tag("electric_scooter"), None);
        assert_eq!(BikeType::from_tag("2215"), None);
        assert_eq!(BikeType::from_tag(""), None);
    }

    #[test]
    fn rider_category_accepts_both_vocabularies() {
        assert_eq!(RiderCategory::from_raw("member"), Some(RiderCategory::Member));
        assert_eq!(RiderCategory::from_raw("Subscriber"), Some(RiderCategory::Member));
        assert_eq!(RiderCategory::from_raw("casual"), Some(RiderCategory::Casual));
        assert_eq!(RiderCategory::from_raw("Customer"), Some(RiderCategory::Casual));
        assert_eq!(RiderCategory::from_raw("Dependent"), None);
    }

    #[test]
    fn station_key_falls_back_to_code() {
        let named = StationRef {
            code: Some("13022".to_string()),
            name: Some("Streeter Dr & Grand Ave".to_string()),
            ..StationRef::default()
        };
        assert_eq!(named.key(), Some("Streeter Dr & Grand Ave"));

        let coded = StationRef {
            code: Some("13022".to_string()),
            ..StationRef::default()
        };
        assert_eq!(coded.key(), Some("13022"));
        assert!(StationRef::default().is_empty());
    }

    #[test]
    fn day_counts_add_and_total() {
        let mut counts = DayCounts::default();
        counts.add(CounterBucket::Acoustic, Direction::Depart, 2);
        counts.add(CounterBucket::Electric, Direction::Arrive, 3);
        assert_eq!(counts.acoustic_depart, 2);
        assert_eq!(counts.electric_arrive, 3);
        assert_eq!(counts.total(), 5);
        assert!(!counts.is_zero());
        assert!(DayCounts::default().is_zero());
    }

    #[test]
    fn station_day_key_round_trips_date() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        let key = StationDayKey::new(9, date);
        assert_eq!((key.year, key.month, key.day), (2024, 7, 4));
        assert_eq!(key.date(), Some(date));
    }
}

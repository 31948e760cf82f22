//! Row normalization: CSV record to [`RawTrip`].

use bikeshare_trip_models::{RawTrip, RiderCategory, StationRef};
use strum_macros::{AsRefStr, Display};

use crate::csv_file::CsvRow;
use crate::fields::{FieldTable, lookup};
use crate::parsing::{parse_coordinate, parse_timestamp};

/// Why a row was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// No ride id under any alias.
    MissingRideId,
    /// Neither endpoint has a station name or code.
    MissingStations,
    /// The CSV record could not be decoded.
    Unreadable,
}

/// Outcome of normalizing one row.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedRow {
    /// A trip ready for loading.
    Trip(RawTrip),
    /// A dropped row.
    Skip(SkipReason),
}

impl NormalizedRow {
    /// Returns the trip, if this row was not skipped.
    #[must_use]
    pub const fn trip(&self) -> Option<&RawTrip> {
        match self {
            Self::Trip(trip) => Some(trip),
            Self::Skip(_) => None,
        }
    }
}

fn station_ref(
    row: &CsvRow,
    code: &[String],
    name: &[String],
    lat: &[String],
    lng: &[String],
) -> StationRef {
    StationRef {
        code: lookup(row, code).map(str::to_string),
        name: lookup(row, name).map(str::to_string),
        latitude: lookup(row, lat).and_then(parse_coordinate),
        longitude: lookup(row, lng).and_then(parse_coordinate),
    }
}

/// Maps one CSV row onto the canonical trip shape.
///
/// Unparseable timestamps, coordinates, and rider categories become
/// `None`; the row is only skipped when the ride id is missing or neither
/// endpoint names a station.
#[must_use]
pub fn normalize_row(fields: &FieldTable, row: &CsvRow) -> NormalizedRow {
    let Some(ride_id) = lookup(row, &fields.ride_id) else {
        return NormalizedRow::Skip(SkipReason::MissingRideId);
    };

    let start = station_ref(
        row,
        &fields.start_station_id,
        &fields.start_station_name,
        &fields.start_lat,
        &fields.start_lng,
    );
    let end = station_ref(
        row,
        &fields.end_station_id,
        &fields.end_station_name,
        &fields.end_lat,
        &fields.end_lng,
    );

    if start.is_empty() && end.is_empty() {
        return NormalizedRow::Skip(SkipReason::MissingStations);
    }

    NormalizedRow::Trip(RawTrip {
        ride_id: ride_id.to_string(),
        rideable_type: lookup(row, &fields.rideable_type).map(str::to_string),
        started_at: lookup(row, &fields.started_at).and_then(parse_timestamp),
        ended_at: lookup(row, &fields.ended_at).and_then(parse_timestamp),
        start,
        end,
        member_casual: lookup(row, &fields.member_casual).and_then(RiderCategory::from_raw),
    })
}

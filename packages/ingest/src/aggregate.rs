//! Daily station counters.
//!
//! Every pass recomputes departures and arrivals from the whole
//! `trips_raw` table and adds the result onto `station_days`. Running it
//! twice over the same trips counts them twice.

use std::collections::BTreeMap;

use bikeshare_database::counters::{self, TripGroup};
use bikeshare_database::{DbError, DbPool};
use bikeshare_ingest_models::AggregationReport;
use bikeshare_trip_models::{BikeType, DayCounts, Direction, StationDayKey};

use crate::IngestError;

/// Per-key deltas folded from both directions.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FoldedDeltas {
    /// Nonzero deltas by station-day.
    pub deltas: BTreeMap<StationDayKey, DayCounts>,
    /// Trip-directions counted.
    pub counted: u64,
    /// Trip-directions with an unrecognized or missing bike tag.
    pub unknown_bike_type: u64,
}

/// Folds trip groups into per-station-day deltas. Groups whose tag is not
/// a known bike type contribute nothing.
#[must_use]
pub fn fold_groups(groups: &[(Direction, TripGroup)]) -> FoldedDeltas {
    let mut folded = FoldedDeltas::default();

    for (direction, group) in groups {
        let trips = u64::try_from(group.trips).unwrap_or(0);

        let Some(bike) = group.rideable_type.as_deref().and_then(BikeType::from_tag) else {
            folded.unknown_bike_type += trips;
            continue;
        };

        folded
            .deltas
            .entry(StationDayKey::new(group.station_id, group.date))
            .or_default()
            .add(bike.bucket(), *direction, group.trips);
        folded.counted += trips;
    }

    folded.deltas.retain(|_, counts| !counts.is_zero());
    folded
}

/// Runs one aggregation pass in a single transaction.
///
/// # Errors
///
/// Returns [`IngestError::Database`] if any query or write fails; the pass
/// is rolled back.
pub fn aggregate(pool: &DbPool) -> Result<AggregationReport, IngestError> {
    // TODO: key the pass on trips_raw.inserted_at so re-running only adds
    // trips loaded since the previous pass.
    Ok(run_pass(pool)?)
}

fn run_pass(pool: &DbPool) -> Result<AggregationReport, DbError> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let mut groups: Vec<(Direction, TripGroup)> = Vec::new();
    for direction in [Direction::Depart, Direction::Arrive] {
        groups.extend(
            counters::trip_groups(&tx, direction)?
                .into_iter()
                .map(|g| (direction, g)),
        );
    }

    let folded = fold_groups(&groups);
    log::info!(
        "Aggregating {} trip-directions into {} station-days ({} with unknown bike type)",
        folded.counted,
        folded.deltas.len(),
        folded.unknown_bike_type
    );

    let mut report = AggregationReport {
        trips_counted: folded.counted,
        unknown_bike_type: folded.unknown_bike_type,
        ..AggregationReport::default()
    };

    for (key, delta) in &folded.deltas {
        if counters::apply_delta(&tx, key, delta)? {
            report.created += 1;
        } else {
            report.updated += 1;
        }
    }

    tx.commit()?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use bikeshare_database::{open_memory_pool, stations, trips};
    use bikeshare_database::stations::StationWrite;
    use bikeshare_trip_models::{RawTrip, StationRef};
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn group(station_id: i64, d: u32, tag: Option<&str>, trips: i64) -> TripGroup {
        TripGroup {
            station_id,
            date: date(d),
            rideable_type: tag.map(str::to_string),
            trips,
        }
    }

    fn ts(s: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok()
    }

    fn at(name: &str) -> StationRef {
        StationRef {
            name: Some(name.to_string()),
            ..StationRef::default()
        }
    }

    fn raw(ride_id: &str, tag: &str, from: &str, to: &str, start: &str, end: &str) -> RawTrip {
        RawTrip {
            ride_id: ride_id.to_string(),
            rideable_type: Some(tag.to_string()),
            started_at: ts(start),
            ended_at: ts(end),
            start: at(from),
            end: at(to),
            member_casual: None,
        }
    }

    #[test]
    fn fold_partitions_bike_types_into_buckets() {
        let folded = fold_groups(&[
            (Direction::Depart, group(1, 1, Some("classic_bike"), 2)),
            (Direction::Depart, group(1, 1, Some("docked_bike"), 3)),
            (Direction::Depart, group(1, 1, Some("electric_bike"), 4)),
            (Direction::Arrive, group(1, 1, Some("electric_bike"), 1)),
            (Direction::Depart, group(1, 1, Some("scooter"), 9)),
            (Direction::Arrive, group(1, 1, None, 5)),
        ]);

        let counts = folded.deltas[&StationDayKey::new(1, date(1))];
        assert_eq!(
            counts,
            DayCounts {
                acoustic_arrive: 0,
                acoustic_depart: 5,
                electric_arrive: 1,
                electric_depart: 4,
            }
        );
        assert_eq!(folded.counted, 10);
        assert_eq!(folded.unknown_bike_type, 14);
    }

    #[test]
    fn fold_drops_keys_with_only_unknown_tags() {
        let folded = fold_groups(&[(Direction::Depart, group(2, 3, Some("scooter"), 4))]);
        assert!(folded.deltas.is_empty());
    }

    fn seeded_pool() -> (DbPool, i64, i64) {
        let pool = open_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let a = stations::insert(&conn, &StationWrite { name: "A", ..StationWrite::default() }).unwrap();
        let b = stations::insert(&conn, &StationWrite { name: "B", ..StationWrite::default() }).unwrap();
        for trip in [
            raw("1", "classic_bike", "A", "B", "2024-06-01 08:00:00", "2024-06-01 08:30:00"),
            raw("2", "electric_bike", "A", "B", "2024-06-01 09:00:00", "2024-06-01 09:30:00"),
            raw("3", "docked_bike", "B", "A", "2024-06-01 10:00:00", "2024-06-01 10:30:00"),
        ] {
            trips::insert_trip(&conn, &trip).unwrap();
        }
        drop(conn);
        (pool, a, b)
    }

    #[test]
    fn aggregation_sums_per_station_day() {
        let (pool, a, b) = seeded_pool();

        let report = aggregate(&pool).unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.updated, 0);
        assert_eq!(report.trips_counted, 6);

        let conn = pool.get().unwrap();
        let at_a = counters::get(&conn, &StationDayKey::new(a, date(1))).unwrap().unwrap();
        assert_eq!(
            at_a,
            DayCounts {
                acoustic_arrive: 1,
                acoustic_depart: 1,
                electric_arrive: 0,
                electric_depart: 1,
            }
        );
        let at_b = counters::get(&conn, &StationDayKey::new(b, date(1))).unwrap().unwrap();
        assert_eq!(at_b.acoustic_arrive, 1);
        assert_eq!(at_b.electric_arrive, 1);
        assert_eq!(at_b.acoustic_depart, 1);
    }

    #[test]
    fn running_aggregation_twice_doubles_counters() {
        let (pool, a, _) = seeded_pool();

        aggregate(&pool).unwrap();
        let first = counters::get(&pool.get().unwrap(), &StationDayKey::new(a, date(1)))
            .unwrap()
            .unwrap();

        let report = aggregate(&pool).unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.updated, 2);

        let second = counters::get(&pool.get().unwrap(), &StationDayKey::new(a, date(1)))
            .unwrap()
            .unwrap();
        assert_eq!(second.total(), first.total() * 2);
        assert_eq!(second.acoustic_depart, 2 * first.acoustic_depart);
    }

    #[test]
    fn empty_store_aggregates_nothing() {
        let pool = open_memory_pool().unwrap();
        let report = aggregate(&pool).unwrap();
        assert_eq!(report.touched(), 0);
        assert_eq!(counters::count(&pool.get().unwrap()).unwrap(), 0);
    }
}

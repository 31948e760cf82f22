//! Timestamp and coordinate parsing for trip exports.

use chrono::NaiveDateTime;

/// Timestamp layouts seen across the exports, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parses a trip timestamp. Accepts `YYYY-MM-DD HH:MM:SS[.f]`, the same
/// with a `T` separator, and `M/D/YYYY H:MM[:SS]`. A trailing `Z` is
/// ignored. Returns `None` for anything else.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_end_matches('Z');
    if s.is_empty() {
        return None;
    }

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Parses one coordinate. Returns `None` if unparseable, non-finite, or
/// exactly zero (the exports use `0` for unknown).
#[must_use]
pub fn parse_coordinate(s: &str) -> Option<f64> {
    let value = s.trim().parse::<f64>().ok()?;
    if !value.is_finite() || value.abs() < f64::EPSILON {
        return None;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> String {
        parse_timestamp(s).unwrap().to_string()
    }

    #[test]
    fn parses_current_export_timestamps() {
        assert_eq!(ts("2024-06-01 08:15:42"), "2024-06-01 08:15:42");
        assert_eq!(ts("2020-04-26 17:45:14.123"), "2020-04-26 17:45:14.123");
    }

    #[test]
    fn parses_iso_timestamps() {
        assert_eq!(ts("2024-06-01T08:15:42"), "2024-06-01 08:15:42");
        assert_eq!(ts("2024-06-01T08:15:42.500Z"), "2024-06-01 08:15:42.500");
    }

    #[test]
    fn parses_legacy_us_timestamps() {
        assert_eq!(ts("6/1/2015 8:05"), "2015-06-01 08:05:00");
        assert_eq!(ts("12/31/2016 23:59:59"), "2016-12-31 23:59:59");
    }

    #[test]
    fn parses_minute_precision_iso() {
        assert_eq!(ts("2019-01-01 00:04"), "2019-01-01 00:04:00");
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-13-01 00:00:00").is_none());
    }

    #[test]
    fn parses_coordinates() {
        let lat = parse_coordinate(" 41.8781 ").unwrap();
        assert!((lat - 41.8781).abs() < f64::EPSILON);
        assert!(parse_coordinate("-87.6298").is_some());
    }

    #[test]
    fn rejects_zero_and_non_finite_coordinates() {
        assert!(parse_coordinate("0").is_none());
        assert!(parse_coordinate("0.0").is_none());
        assert!(parse_coordinate("NaN").is_none());
        assert!(parse_coordinate("inf").is_none());
        assert!(parse_coordinate("").is_none());
        assert!(parse_coordinate("north").is_none());
    }
}

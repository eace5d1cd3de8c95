//! Version filename codec
//!
//! A data file is named `<version>_<timestamp>`:
//!
//! ```text
//! 00000000000000000007_20261019T120000.000000042Z
//! ^^^^^^^^^^^^^^^^^^^^ ^^^^^^^^^^^^^^^^^^^^^^^^^^
//! version, 20 digits   UTC creation time, ns precision
//! ```
//!
//! Its sidecar is `<data file>.<algorithm>`. Anything else in the directory
//! is foreign and ignored.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use regex::Regex;
use thiserror::Error;

use crate::checksum::is_valid_name;

const TIME_FORMAT: &str = "%Y%m%dT%H%M%S%.9f";

/// Why a name is not a data file name
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilenameError {
    #[error("not a version file name: {0}")]
    Malformed(String),

    #[error("version number out of range in {0}")]
    VersionOutOfRange(String),

    #[error("invalid timestamp in {0}")]
    InvalidTime(String),

    #[error("time {0} cannot be encoded in a version file name")]
    TimeOutOfRange(String),
}

fn data_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-9]{20})_([0-9]{8}T[0-9]{6}\.[0-9]{9})Z$")
            .expect("version file pattern is valid")
    })
}

/// Check that `time` survives a `generate`/`parse` round trip.
///
/// The grammar holds four-digit years (0 to 9999) and no leap seconds.
pub fn check_time(time: DateTime<Utc>) -> Result<(), FilenameError> {
    if (0..=9999).contains(&time.year()) && time.nanosecond() < 1_000_000_000 {
        Ok(())
    } else {
        Err(FilenameError::TimeOutOfRange(time.to_rfc3339()))
    }
}

/// Encode a version number and creation time as a data file name.
///
/// Only times accepted by [`check_time`] parse back.
pub fn generate(version: u64, time: DateTime<Utc>) -> String {
    format!("{:020}_{}Z", version, time.format(TIME_FORMAT))
}

/// Decode a data file name back into its version number and creation time
pub fn parse(name: &str) -> Result<(u64, DateTime<Utc>), FilenameError> {
    let caps = data_pattern()
        .captures(name)
        .ok_or_else(|| FilenameError::Malformed(name.to_string()))?;

    let version = caps[1]
        .parse::<u64>()
        .map_err(|_| FilenameError::VersionOutOfRange(name.to_string()))?;
    let time = NaiveDateTime::parse_from_str(&caps[2], TIME_FORMAT)
        .map_err(|_| FilenameError::InvalidTime(name.to_string()))?
        .and_utc();

    Ok((version, time))
}

/// Whether `name` is a well-formed data file name
pub fn is_data_name(name: &str) -> bool {
    parse(name).is_ok()
}

/// Name of the sidecar holding `data`'s digest under `algorithm`
pub fn sidecar_name(data: &str, algorithm: &str) -> String {
    format!("{}.{}", data, algorithm)
}

/// Split a sidecar name into its data file name and algorithm name.
///
/// Returns `None` unless the data half parses and the algorithm half is a
/// valid algorithm name.
pub fn split_sidecar(name: &str) -> Option<(&str, &str)> {
    let (data, algorithm) = name.rsplit_once('.')?;
    if is_data_name(data) && is_valid_name(algorithm) {
        Some((data, algorithm))
    } else {
        None
    }
}

/// Whether data file `a` was written after data file `b`.
///
/// Ordering is by version number only.
pub fn is_younger(a: &str, b: &str) -> Result<bool, FilenameError> {
    let (va, _) = parse(a)?;
    let (vb, _) = parse(b)?;
    Ok(va > vb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64, nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, nanos).unwrap()
    }

    #[test]
    fn test_generate_format() {
        let time = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(42);
        assert_eq!(
            generate(7, time),
            "00000000000000000007_20261019T120000.000000042Z"
        );
    }

    #[test]
    fn test_parse_recovers_exact_time() {
        let time = at(1_760_000_000, 123_456_789);
        let name = generate(42, time);
        assert_eq!(parse(&name).unwrap(), (42, time));
    }

    #[test]
    fn test_max_version() {
        let name = generate(u64::MAX, at(0, 0));
        assert_eq!(parse(&name).unwrap().0, u64::MAX);
    }

    #[test]
    fn test_version_overflow_rejected() {
        let name = "99999999999999999999_20261019T120000.000000000Z";
        assert_eq!(
            parse(name),
            Err(FilenameError::VersionOutOfRange(name.to_string()))
        );
    }

    #[test]
    fn test_foreign_names_rejected() {
        for name in [
            "",
            "notes.txt",
            "1_20261019T120000.000000000Z",
            "00000000000000000001_20261019T120000Z",
            "00000000000000000001_20261019T120000.000000000Z.crc32",
            "00000000000000000001_20261019T120000.000000000Z.tmp",
            "00000000000000000001_20261399T120000.000000000Z",
        ] {
            assert!(parse(name).is_err(), "{} should not parse", name);
        }
    }

    #[test]
    fn test_invalid_calendar_date() {
        let name = "00000000000000000001_20261399T120000.000000000Z";
        assert_eq!(parse(name), Err(FilenameError::InvalidTime(name.to_string())));
    }

    #[test]
    fn test_lexical_order_matches_version_order() {
        let time = at(0, 0);
        let mut names: Vec<String> = [10u64, 2, 300, 1].iter().map(|v| generate(*v, time)).collect();
        names.sort();
        let versions: Vec<u64> = names.iter().map(|n| parse(n).unwrap().0).collect();
        assert_eq!(versions, vec![1, 2, 10, 300]);
    }

    #[test]
    fn test_sidecar_split() {
        let data = generate(3, at(5, 6));
        let sidecar = sidecar_name(&data, "crc32");
        assert_eq!(split_sidecar(&sidecar), Some((data.as_str(), "crc32")));
        assert_eq!(split_sidecar(&data), None);
        assert_eq!(split_sidecar(&format!("{}.CRC", data)), None);
        assert_eq!(split_sidecar("junk.crc32"), None);
    }

    #[test]
    fn test_younger_is_by_version_not_time() {
        let older_time = generate(2, at(100, 0));
        let newer_time = generate(1, at(200, 0));
        assert!(is_younger(&older_time, &newer_time).unwrap());
        assert!(!is_younger(&newer_time, &older_time).unwrap());
        assert!(is_younger("junk", &newer_time).is_err());
    }

    #[test]
    fn test_time_range() {
        let edges = [
            Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap()
                + chrono::Duration::nanoseconds(999_999_999),
        ];
        for time in edges {
            check_time(time).unwrap();
            assert_eq!(parse(&generate(1, time)).unwrap(), (1, time));
        }

        for time in [
            Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(-1, 12, 31, 0, 0, 0).unwrap(),
        ] {
            assert!(matches!(check_time(time), Err(FilenameError::TimeOutOfRange(_))));
            assert!(parse(&generate(1, time)).is_err());
        }
    }
}

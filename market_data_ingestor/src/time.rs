//! Timestamp parsing for providers that read text sources.
//!
//! Sources disagree on how they stamp bars:
//! - RFC-3339 with an explicit offset (`2025-03-03T10:05:00+08:00`) is converted to UTC.
//! - Naive date-times (`2025-03-03 02:05:00`, `2025-03-03T02:05:00`) carry no zone and
//!   are taken as UTC, which is what most vendor exports mean by them.
//! - Bare integers are Unix epoch seconds.
//!
//! Everything leaves this module as a [`DateTime<Utc>`]; wall-clock conversion
//! happens downstream.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognised timestamp: {0:?}")]
pub struct TimestampError(pub String);

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// RFC-3339 with offset -> UTC.
///
/// Example:
/// - "2025-03-03T10:05:00+08:00" -> "2025-03-03T02:05:00Z"
pub fn parse_ts_to_utc(s: &str) -> Result<DateTime<Utc>, TimestampError> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TimestampError(s.to_string()))
}

/// Parse any of the accepted shapes (offset, naive, epoch seconds) into UTC.
pub fn parse_any_to_utc(s: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = s.trim();
    if let Ok(dt) = parse_ts_to_utc(trimmed) {
        return Ok(dt);
    }
    if let Ok(secs) = trimmed.parse::<i64>() {
        return from_epoch_secs(secs).ok_or_else(|| TimestampError(s.to_string()));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimestampError(s.to_string()))
}

/// Unix epoch seconds -> UTC instant; `None` when out of chrono's range.
pub fn from_epoch_secs(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

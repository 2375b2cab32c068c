//! Timestamp validity for sensor data.
//!
//! Devices that lose power restart their clock at the Unix epoch or report
//! an uptime counter instead of a date. Those samples must not be presented
//! as recent data, so every timestamp goes through [`is_valid_timestamp`]
//! before it is used.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::record::RawTimestamp;

/// Naive date-time layouts accepted in addition to RFC 3339 / RFC 2822.
/// Interpreted in server local time.
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Earliest instant a valid timestamp may follow: 2020-01-01T00:00:00Z.
pub fn validity_floor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Parse a stored timestamp, rejecting clock-reset artifacts.
///
/// Returns `None` for `1970-…` strings, digit-only strings, and anything
/// that does not parse. Numbers are epoch milliseconds.
pub fn parse_timestamp(raw: &RawTimestamp) -> Option<DateTime<Utc>> {
    match raw {
        RawTimestamp::Millis(ms) => {
            if !ms.is_finite() {
                return None;
            }
            Utc.timestamp_millis_opt(ms.trunc() as i64).single()
        }
        RawTimestamp::Text(text) => parse_text(text.trim()),
    }
}

fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() || text.starts_with("1970-") {
        return None;
    }
    if text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }
    // Date-only strings are UTC midnight.
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Whether a stored timestamp is present, parseable, and after 2020-01-01.
pub fn is_valid_timestamp(raw: Option<&RawTimestamp>) -> bool {
    raw.and_then(parse_timestamp)
        .is_some_and(|dt| dt > validity_floor())
}

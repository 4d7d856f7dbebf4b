//! Display time zone handling
//!
//! The dashboard shows and filters timestamps in one configured fixed UTC
//! offset. Stored timestamps are always UTC.

use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};

/// Parse an offset such as `+07:00`, `-03:30`, `+0700`, `Z` or `UTC`
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return Ok(utc_offset());
    }

    let invalid = || Error::validation(format!("invalid UTC offset '{}', expected e.g. +07:00", value));

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => match (rest.get(..2), rest.get(2..)) {
            (Some(h), Some(m)) => (h, m),
            _ => return Err(invalid()),
        },
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// The zero offset
pub fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Convert a local wall-clock time in `offset` to UTC
pub fn local_to_utc(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    (local - chrono::Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

/// Start of a calendar day in `offset` and start of the following day, in UTC.
///
/// The day is the half-open interval `[start, next_start)`.
pub fn day_bounds(date: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_to_utc(date.and_time(NaiveTime::MIN), offset);
    (start, start + chrono::Duration::days(1))
}

/// Timestamp rendered in the display offset
pub fn to_local(at: DateTime<Utc>, offset: FixedOffset) -> DateTime<FixedOffset> {
    at.with_timezone(&offset)
}

//! Access-log timestamps and week numbering.
//!
//! httpd writes request times as `29/Mar/2020:16:04:28 +0000`. They are
//! parsed by splitting on the fixed delimiters; [`strptime_logtime`] is the
//! format-string equivalent.

use crate::types::{CountmeError, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone};
use std::sync::OnceLock;

/// A parsed log timestamp, keeping the offset it was written with.
pub type LogTime = DateTime<FixedOffset>;

pub const DAY_LEN: i64 = 24 * 60 * 60;
pub const WEEK_LEN: i64 = 7 * DAY_LEN;
/// 00:00:00 Mon Jan 5 1970 UTC
pub const COUNTME_EPOCH: i64 = 345_600;

const LOGTIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Week number of a unix timestamp, counting from [`COUNTME_EPOCH`].
///
/// Uses floor division so timestamps before the epoch land in negative
/// weeks instead of being rounded towards zero.
pub fn weeknum(timestamp: i64) -> i64 {
    (i128::from(timestamp) - i128::from(COUNTME_EPOCH)).div_euclid(i128::from(WEEK_LEN)) as i64
}

fn month_index(month: &str) -> Option<u32> {
    Some(match month {
        "Jan" => 1,
        "Feb" => 2,
        "Mar" => 3,
        "Apr" => 4,
        "May" => 5,
        "Jun" => 6,
        "Jul" => 7,
        "Aug" => 8,
        "Sep" => 9,
        "Oct" => 10,
        "Nov" => 11,
        "Dec" => 12,
        _ => return None,
    })
}

fn utc() -> FixedOffset {
    static UTC: OnceLock<FixedOffset> = OnceLock::new();
    *UTC.get_or_init(|| chrono::Utc.fix())
}

/// Converts a UTC offset like `-0400` into a [`FixedOffset`].
pub fn offset_to_timezone(offset: &str) -> Option<FixedOffset> {
    let bytes = offset.as_bytes();
    if bytes.len() != 5 || !bytes[1..].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let hours: i32 = offset[1..3].parse().ok()?;
    let minutes: i32 = offset[3..5].parse().ok()?;
    if minutes > 59 {
        return None;
    }
    let seconds = (hours * 60 + minutes) * 60;
    match bytes[0] {
        b'+' => FixedOffset::east_opt(seconds),
        b'-' => FixedOffset::west_opt(seconds),
        _ => None,
    }
}

/// Parses an access-log timestamp.
///
/// Equivalent to [`strptime_logtime`] for well-formed input, but splits on
/// the literal `' '`, `':'` and `'/'` delimiters instead.
pub fn parse_logtime(logtime: &str) -> Result<LogTime> {
    parse_fields(logtime).ok_or_else(|| CountmeError::MalformedTimestamp(logtime.to_string()))
}

fn parse_fields(logtime: &str) -> Option<LogTime> {
    let (dt, off) = logtime.split_once(' ')?;
    let mut parts = dt.splitn(4, ':');
    let (date, hour, minute, second) = (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
    let mut date = date.splitn(3, '/');
    let (day, month, year) = (date.next()?, date.next()?, date.next()?);

    let tz = match off {
        "+0000" | "-0000" => utc(),
        _ => offset_to_timezone(off)?,
    };
    let naive = NaiveDate::from_ymd_opt(year.parse().ok()?, month_index(month)?, day.parse().ok()?)?
        .and_hms_opt(hour.parse().ok()?, minute.parse().ok()?, second.parse().ok()?)?;
    tz.from_local_datetime(&naive).single()
}

/// The slow, general-purpose equivalent of [`parse_logtime`].
pub fn strptime_logtime(logtime: &str) -> Result<LogTime> {
    DateTime::parse_from_str(logtime, LOGTIME_FORMAT)
        .map_err(|_| CountmeError::MalformedTimestamp(logtime.to_string()))
}

/// Rewrites a log timestamp as ISO8601 without building a datetime:
/// `29/Mar/2020:16:04:28 +0000` becomes `2020-03-29T16:04:28+00:00`.
pub fn logtime_to_isoformat(logtime: &str) -> Result<String> {
    let malformed = || CountmeError::MalformedTimestamp(logtime.to_string());
    if logtime.len() != 26 || !logtime.is_ascii() {
        return Err(malformed());
    }
    let month = month_index(&logtime[3..6]).ok_or_else(malformed)?;
    Ok(format!(
        "{}-{:02}-{}T{}{}:{}",
        &logtime[7..11],
        month,
        &logtime[0..2],
        &logtime[12..20],
        &logtime[21..24],
        &logtime[24..26],
    ))
}

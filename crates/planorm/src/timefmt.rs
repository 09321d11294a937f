//! Time parsing and formatting used by the value scanner.
//!
//! Databases hand back timestamps in many textual shapes. [`parse_time_string`] sniffs the
//! string (timezone suffix, `T` separator, fractional seconds) and picks one layout instead of
//! trying each in turn. [`to_unix`] converts a broken-down UTC date/time into epoch seconds
//! without consulting a timezone database.

use crate::error::{OrmError, OrmResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Layout used when time values are bound or rendered as text.
pub const TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

const CUMULATIVE_DAYS: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

/// Convert a calendar date/time (UTC) into Unix seconds.
///
/// Returns `-1` when `month` is outside `1..=12`.
pub fn to_unix(year: i64, month: i64, day: i64, hour: i64, min: i64, sec: i64) -> i64 {
    if !(1..=12).contains(&month) {
        return -1;
    }

    let is_leap = year % 4 == 0 && (year % 100 != 0 || year % 400 == 0);
    let leap = i64::from(is_leap && month >= 3);

    let days = 365 * year - 719_528 + day - 1 + (year + 3) / 4 - (year + 99) / 100
        + (year + 399) / 400
        + CUMULATIVE_DAYS[(month - 1) as usize]
        + leap;

    days * 86_400 + hour * 3_600 + min * 60 + sec
}

/// Build a UTC timestamp from Unix seconds.
pub fn from_unix(secs: i64) -> OrmResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| OrmError::conversion("", format!("unix timestamp {secs} out of range")))
}

/// Render a timestamp with [`TIME_LAYOUT`].
pub fn format_time(t: &DateTime<Utc>) -> String {
    t.format(TIME_LAYOUT).to_string()
}

/// Scan `%4d-%2d-%2d %2d:%2d:%2d` from the start of `s`.
///
/// Returns how many numeric fields were read along with the values. Callers accept a
/// count of 3 (date) or 6 (date and time).
pub fn scan_datetime(s: &str) -> (usize, [i64; 6]) {
    const WIDTHS: [usize; 6] = [4, 2, 2, 2, 2, 2];
    const SEPARATORS: [u8; 5] = [b'-', b'-', b' ', b':', b':'];

    let bytes = s.as_bytes();
    let mut pos = 0;
    let mut out = [0i64; 6];

    for (i, width) in WIDTHS.iter().enumerate() {
        if i > 0 {
            let sep = SEPARATORS[i - 1];
            if sep == b' ' {
                while pos < bytes.len() && bytes[pos] == b' ' {
                    pos += 1;
                }
            } else if bytes.get(pos) == Some(&sep) {
                pos += 1;
            } else {
                return (i, out);
            }
        }

        while pos < bytes.len() && bytes[pos] == b' ' {
            pos += 1;
        }

        let start = pos;
        let mut negative = false;
        if matches!(bytes.get(pos), Some(b'+') | Some(b'-')) {
            negative = bytes[pos] == b'-';
            pos += 1;
        }
        let digits_start = pos;
        while pos < bytes.len() && pos - start < *width && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == digits_start {
            return (i, out);
        }

        let mut value = 0i64;
        for b in &bytes[digits_start..pos] {
            value = value * 10 + i64::from(b - b'0');
        }
        out[i] = if negative { -value } else { value };
    }

    (6, out)
}

/// Parse a time string by sniffing its shape.
///
/// Empty strings and `NULL`/`null` yield the zero time (the Unix epoch). Strings shorter than
/// a date are rejected.
pub fn parse_time_string(s: &str) -> OrmResult<DateTime<Utc>> {
    if s.is_empty() || s == "NULL" || s == "null" {
        return Ok(DateTime::<Utc>::default());
    }

    let b = s.as_bytes();
    let n = b.len();
    if n < 10 {
        return Err(OrmError::conversion("", format!("time string too short: {s:?}")));
    }

    let is_date_only = n == 10 && b[4] == b'-' && b[7] == b'-';

    let mut has_timezone = b[n - 1] == b'Z'
        || s.ends_with("+00:00")
        || s.ends_with("-00:00")
        || s.ends_with("+0000")
        || s.ends_with("-0000");
    if !has_timezone && n >= 6 {
        has_timezone = b[n - 6..].iter().any(|c| *c == b'+' || *c == b'-');
    }
    if is_date_only {
        has_timezone = false;
    }

    let has_fraction = n > 19 && b[19] == b'.';
    let has_t = n > 10 && b[10] == b'T';

    let parsed = if has_timezone {
        if has_t {
            // RFC3339, with or without fractional seconds.
            DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc))
        } else if has_fraction || b[n - 1] != b'Z' {
            DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f %:z").map(|t| t.with_timezone(&Utc))
        } else {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.fZ").map(|t| t.and_utc())
        }
    } else if is_date_only {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
    } else {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").map(|t| t.and_utc())
    };

    parsed.map_err(|e| OrmError::conversion("", format!("cannot parse time {s:?}: {e}")))
}

/// Decode a textual time with every fallback: sniffed layouts, the manual field scan, and
/// finally a raw integer Unix timestamp.
pub fn decode_time_text(s: &str) -> OrmResult<DateTime<Utc>> {
    if let Ok(t) = parse_time_string(s) {
        return Ok(t);
    }

    let (n, f) = scan_datetime(s);
    if n == 3 || n == 6 {
        return from_unix(to_unix(f[0], f[1], f[2], f[3], f[4], f[5]));
    }

    let secs: i64 = s
        .trim()
        .parse()
        .map_err(|e| OrmError::conversion("", format!("converting {s:?} to a time: {e}")))?;
    from_unix(secs)
}

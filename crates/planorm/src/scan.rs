//! Scanning wire values into typed destinations.
//!
//! Each typed destination implements [`FromValue`]. The rules are lenient in the way database
//! drivers tend to need:
//!
//! - `NULL` becomes the destination's zero value (`None` for `Option<T>`).
//! - Values of the same kind are moved directly.
//! - Bools and numbers convert into each other (`0`/`1`, non-zero is true).
//! - Narrowing integer conversions are range checked; floats truncate before the check.
//! - Text is parsed into numbers, bools and times. A `YYYY-MM-DD[ hh:mm:ss]` string scanned
//!   into a number yields Unix seconds.
//! - Times convert to numbers as Unix seconds and to text with
//!   [`TIME_LAYOUT`](crate::timefmt::TIME_LAYOUT).

use crate::error::{OrmError, OrmResult};
use crate::timefmt::{decode_time_text, format_time, from_unix, scan_datetime, to_unix};
use crate::value::{Value, ValueKind};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

/// A type that can be produced from a wire [`Value`].
pub trait FromValue: Sized {
    /// Structural kind reported to the record shape.
    const KIND: ValueKind;
    /// Whether `NULL` is represented distinctly from the zero value.
    const NULLABLE: bool = false;

    fn from_value(value: Value) -> OrmResult<Self>;
}

fn bytes_to_text(bytes: Vec<u8>) -> OrmResult<String> {
    String::from_utf8(bytes)
        .map_err(|e| OrmError::conversion("", format!("bytes are not valid UTF-8: {e}")))
}

/// The wire kind has no path into the destination type at all.
fn cannot(value: &Value, target: &str) -> OrmError {
    OrmError::unsupported(format!("cannot convert {} value to {target}", value.kind_name()))
}

/// Scan a value into a bool.
pub fn to_bool(value: Value) -> OrmResult<bool> {
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        Value::Int(i) => Ok(i != 0),
        Value::Float(f) => Ok(f != 0.0),
        Value::Text(s) => Ok(s == "true"),
        Value::Bytes(b) => Ok(b == b"true"),
        Value::Time(t) => Ok(t.timestamp() != 0),
    }
}

fn parse_integer_text(s: &str, target: &str) -> OrmResult<i128> {
    let (n, f) = scan_datetime(s);
    if n == 3 || n == 6 {
        return Ok(i128::from(to_unix(f[0], f[1], f[2], f[3], f[4], f[5])));
    }
    s.trim().parse::<i128>().map_err(|e| {
        OrmError::conversion("", format!("converting text ({s}) to {target}: {e}"))
    })
}

/// Scan a value into any integer type, range checking the result.
pub fn to_integer<T>(value: Value, target: &str) -> OrmResult<T>
where
    T: TryFrom<i128> + Default,
{
    let wide = match value {
        Value::Null => return Ok(T::default()),
        Value::Bool(b) => i128::from(b),
        Value::Int(i) => i128::from(i),
        Value::Float(f) => {
            if !f.is_finite() {
                return Err(OrmError::conversion(
                    "",
                    format!("non-finite float {f} cannot become {target}"),
                ));
            }
            f.trunc() as i128
        }
        Value::Text(s) => parse_integer_text(&s, target)?,
        Value::Bytes(b) => parse_integer_text(&bytes_to_text(b)?, target)?,
        Value::Time(t) => i128::from(t.timestamp()),
    };

    T::try_from(wide).map_err(|_| {
        OrmError::conversion("", format!("value {wide} out of range for {target}"))
    })
}

fn parse_float_text(s: &str) -> OrmResult<f64> {
    let (n, f) = scan_datetime(s);
    if n == 3 || n == 6 {
        return Ok(to_unix(f[0], f[1], f[2], f[3], f[4], f[5]) as f64);
    }
    s.trim()
        .parse::<f64>()
        .map_err(|e| OrmError::conversion("", format!("converting text ({s}) to a float: {e}")))
}

/// Scan a value into an `f64`.
pub fn to_float(value: Value) -> OrmResult<f64> {
    match value {
        Value::Null => Ok(0.0),
        Value::Bool(b) => Ok(if b { 1.0 } else { 0.0 }),
        Value::Int(i) => Ok(i as f64),
        Value::Float(f) => Ok(f),
        Value::Text(s) => parse_float_text(&s),
        Value::Bytes(b) => parse_float_text(&bytes_to_text(b)?),
        Value::Time(t) => Ok(t.timestamp() as f64),
    }
}

/// Scan a value into text.
pub fn to_text(value: Value) -> OrmResult<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(if b { "true" } else { "false" }.to_string()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Text(s) => Ok(s),
        Value::Bytes(b) => bytes_to_text(b),
        Value::Time(t) => Ok(format_time(&t)),
    }
}

/// Scan a value into raw bytes. Non-text values go through their decimal form; times
/// become Unix seconds.
pub fn to_bytes(value: Value) -> OrmResult<Vec<u8>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Bytes(b) => Ok(b),
        Value::Text(s) => Ok(s.into_bytes()),
        Value::Time(t) => Ok(t.timestamp().to_string().into_bytes()),
        other => to_text(other).map(String::into_bytes),
    }
}

/// Scan a value into a UTC timestamp.
pub fn to_time(value: Value) -> OrmResult<DateTime<Utc>> {
    match value {
        Value::Null => Ok(DateTime::<Utc>::default()),
        Value::Time(t) => Ok(t),
        Value::Int(i) => from_unix(i),
        Value::Float(f) if f.is_finite() => from_unix(f.trunc() as i64),
        Value::Text(s) => decode_time_text(&s),
        Value::Bytes(b) => decode_time_text(&bytes_to_text(b)?),
        other => Err(cannot(&other, "a time")),
    }
}

/// Scan a value into a UUID, from its text form or 16 raw bytes.
pub fn to_uuid(value: Value) -> OrmResult<Uuid> {
    match value {
        Value::Null => Ok(Uuid::nil()),
        Value::Text(s) => Uuid::parse_str(&s)
            .map_err(|e| OrmError::conversion("", format!("invalid uuid {s:?}: {e}"))),
        Value::Bytes(b) if b.len() == 16 => Uuid::from_slice(&b)
            .map_err(|e| OrmError::conversion("", format!("invalid uuid bytes: {e}"))),
        Value::Bytes(b) => to_uuid(Value::Text(bytes_to_text(b)?)),
        other => Err(cannot(&other, "a uuid")),
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty => $kind:expr),* $(,)?) => {
        $(
            impl FromValue for $ty {
                const KIND: ValueKind = $kind;

                fn from_value(value: Value) -> OrmResult<Self> {
                    to_integer::<$ty>(value, stringify!($ty))
                }
            }
        )*
    };
}

impl_from_value_int! {
    i8 => ValueKind::Int(8),
    i16 => ValueKind::Int(16),
    i32 => ValueKind::Int(32),
    i64 => ValueKind::Int(64),
    isize => ValueKind::Int(64),
    u8 => ValueKind::UInt(8),
    u16 => ValueKind::UInt(16),
    u32 => ValueKind::UInt(32),
    u64 => ValueKind::UInt(64),
    usize => ValueKind::UInt(64),
}

impl FromValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn from_value(value: Value) -> OrmResult<Self> {
        to_bool(value)
    }
}

impl FromValue for f64 {
    const KIND: ValueKind = ValueKind::Float(64);

    fn from_value(value: Value) -> OrmResult<Self> {
        to_float(value)
    }
}

impl FromValue for f32 {
    const KIND: ValueKind = ValueKind::Float(32);

    fn from_value(value: Value) -> OrmResult<Self> {
        to_float(value).map(|f| f as f32)
    }
}

impl FromValue for String {
    const KIND: ValueKind = ValueKind::Text;

    fn from_value(value: Value) -> OrmResult<Self> {
        to_text(value)
    }
}

impl FromValue for Vec<u8> {
    const KIND: ValueKind = ValueKind::Bytes;

    fn from_value(value: Value) -> OrmResult<Self> {
        to_bytes(value)
    }
}

impl FromValue for DateTime<Utc> {
    const KIND: ValueKind = ValueKind::Time;

    fn from_value(value: Value) -> OrmResult<Self> {
        to_time(value)
    }
}

impl FromValue for NaiveDateTime {
    const KIND: ValueKind = ValueKind::Time;

    fn from_value(value: Value) -> OrmResult<Self> {
        to_time(value).map(|t| t.naive_utc())
    }
}

impl FromValue for NaiveDate {
    const KIND: ValueKind = ValueKind::Time;

    fn from_value(value: Value) -> OrmResult<Self> {
        to_time(value).map(|t| t.date_naive())
    }
}

impl FromValue for Uuid {
    const KIND: ValueKind = ValueKind::Uuid;

    fn from_value(value: Value) -> OrmResult<Self> {
        to_uuid(value)
    }
}

impl FromValue for Value {
    const KIND: ValueKind = ValueKind::Any;
    const NULLABLE: bool = true;

    fn from_value(value: Value) -> OrmResult<Self> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const KIND: ValueKind = T::KIND;
    const NULLABLE: bool = true;

    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(None),
            v => T::from_value(v).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn null_becomes_zero_or_none() {
        assert_eq!(i32::from_value(Value::Null).unwrap(), 0);
        assert_eq!(String::from_value(Value::Null).unwrap(), "");
        assert!(!bool::from_value(Value::Null).unwrap());
        assert_eq!(Option::<i32>::from_value(Value::Null).unwrap(), None);
        assert_eq!(
            Option::<String>::from_value(Value::Text("x".into())).unwrap(),
            Some("x".to_string())
        );
    }

    #[test]
    fn bool_and_numbers_cross_convert() {
        assert!(bool::from_value(Value::Int(2)).unwrap());
        assert!(!bool::from_value(Value::Float(0.0)).unwrap());
        assert_eq!(i64::from_value(Value::Bool(true)).unwrap(), 1);
        assert_eq!(f64::from_value(Value::Int(3)).unwrap(), 3.0);
        assert_eq!(i64::from_value(Value::Float(3.9)).unwrap(), 3);
        assert_eq!(i64::from_value(Value::Float(-3.9)).unwrap(), -3);
    }

    #[test]
    fn narrowing_is_range_checked() {
        assert_eq!(u8::from_value(Value::Int(255)).unwrap(), 255);
        assert!(u8::from_value(Value::Int(256)).unwrap_err().is_conversion());
        assert!(u32::from_value(Value::Int(-1)).is_err());
        assert!(i8::from_value(Value::Float(1e10)).is_err());
        assert!(i64::from_value(Value::Float(f64::NAN)).is_err());
    }

    #[test]
    fn text_parses_into_numbers() {
        assert_eq!(i32::from_value(Value::Text("42".into())).unwrap(), 42);
        assert_eq!(i32::from_value(Value::Text("-7".into())).unwrap(), -7);
        assert_eq!(f64::from_value(Value::Text("2.5".into())).unwrap(), 2.5);
        assert_eq!(
            u64::from_value(Value::Text(u64::MAX.to_string())).unwrap(),
            u64::MAX
        );
        assert!(i32::from_value(Value::Text("abc".into())).is_err());
        assert!(bool::from_value(Value::Text("true".into())).unwrap());
        assert!(!bool::from_value(Value::Text("yes".into())).unwrap());
    }

    #[test]
    fn date_text_into_number_is_unix_seconds() {
        assert_eq!(
            i64::from_value(Value::Text("2019-03-01".into())).unwrap(),
            1_551_398_400
        );
        assert_eq!(
            i64::from_value(Value::Text("2019-03-01 00:00:10".into())).unwrap(),
            1_551_398_410
        );
    }

    #[test]
    fn numbers_into_text() {
        assert_eq!(String::from_value(Value::Int(10)).unwrap(), "10");
        assert_eq!(String::from_value(Value::Float(1.5)).unwrap(), "1.5");
        assert_eq!(String::from_value(Value::Bool(true)).unwrap(), "true");
        assert_eq!(
            String::from_value(Value::Bytes(b"raw".to_vec())).unwrap(),
            "raw"
        );
        assert_eq!(Vec::<u8>::from_value(Value::Int(12)).unwrap(), b"12".to_vec());
    }

    #[test]
    fn times_cross_convert() {
        let t = Utc.with_ymd_and_hms(2019, 3, 1, 8, 9, 10).unwrap();

        assert_eq!(i64::from_value(Value::Time(t)).unwrap(), t.timestamp());
        assert_eq!(
            String::from_value(Value::Time(t)).unwrap(),
            "2019-03-01 08:09:10"
        );
        assert_eq!(
            DateTime::<Utc>::from_value(Value::Int(t.timestamp())).unwrap(),
            t
        );
        assert_eq!(
            DateTime::<Utc>::from_value(Value::Text("2019-03-01 08:09:10".into())).unwrap(),
            t
        );
        assert_eq!(
            NaiveDate::from_value(Value::Text("2019-03-01".into())).unwrap(),
            NaiveDate::from_ymd_opt(2019, 3, 1).unwrap()
        );
        assert!(
            DateTime::<Utc>::from_value(Value::Bool(true))
                .unwrap_err()
                .is_unsupported()
        );
    }

    #[test]
    fn uuid_from_text_and_bytes() {
        let id = Uuid::from_u128(0x1234);
        assert_eq!(
            Uuid::from_value(Value::Text(id.to_string())).unwrap(),
            id
        );
        assert_eq!(
            Uuid::from_value(Value::Bytes(id.as_bytes().to_vec())).unwrap(),
            id
        );
        assert!(Uuid::from_value(Value::Int(1)).unwrap_err().is_unsupported());
        // Malformed text is a conversion failure, not a kind mismatch.
        assert!(Uuid::from_value(Value::Text("x".into())).unwrap_err().is_conversion());
    }

    #[test]
    fn kinds_are_reported() {
        assert_eq!(<i32 as FromValue>::KIND, ValueKind::Int(32));
        assert_eq!(<Option<u16> as FromValue>::KIND, ValueKind::UInt(16));
        assert!(<Option<u16> as FromValue>::NULLABLE);
        assert!(!<u16 as FromValue>::NULLABLE);
    }
}

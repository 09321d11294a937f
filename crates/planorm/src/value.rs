//! Wire values and the binding side of the value mapper.
//!
//! [`Value`] is what travels between a record and an [`Executor`](crate::Executor): every bound
//! argument and every column of a returned row is one of its variants. [`ToValue`] moves typed
//! memory into a `Value`; the reverse direction lives in [`crate::scan`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// A single positional argument or result column.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Time(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in conversion error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Time(_) => "time",
        }
    }
}

/// Structural kind of a record field.
///
/// Kinds feed the structural fingerprint of a record type, so two types whose fields share
/// identifiers but differ in type never share a compiled plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    /// Signed integer with its bit width.
    Int(u8),
    /// Unsigned integer with its bit width.
    UInt(u8),
    /// Float with its bit width.
    Float(u8),
    Text,
    Bytes,
    Time,
    Uuid,
    /// Accepts any wire value unchanged.
    Any,
    /// A field the binder cannot move values through (skipped or foreign types).
    Opaque,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bool => f.write_str("bool"),
            ValueKind::Int(bits) => write!(f, "i{bits}"),
            ValueKind::UInt(bits) => write!(f, "u{bits}"),
            ValueKind::Float(bits) => write!(f, "f{bits}"),
            ValueKind::Text => f.write_str("text"),
            ValueKind::Bytes => f.write_str("bytes"),
            ValueKind::Time => f.write_str("time"),
            ValueKind::Uuid => f.write_str("uuid"),
            ValueKind::Any => f.write_str("any"),
            ValueKind::Opaque => f.write_str("opaque"),
        }
    }
}

/// Convert a typed value into a [`Value`] for binding.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

macro_rules! impl_to_value_lossless {
    ($($ty:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::$variant(<$target>::from(*self))
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    v.to_value()
                }
            }
        )*
    };
}

impl_to_value_lossless! {
    bool => Bool as bool,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => Int as i64,
    u16 => Int as i64,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float as f64,
}

// Values past i64::MAX have no integer wire form; they travel as decimal text.
macro_rules! impl_to_value_wide_unsigned {
    ($($ty:ty),*) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    i64::try_from(*self)
                        .map(Value::Int)
                        .unwrap_or_else(|_| Value::Text(self.to_string()))
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    v.to_value()
                }
            }
        )*
    };
}

impl_to_value_wide_unsigned!(u64, usize);

impl ToValue for isize {
    fn to_value(&self) -> Value {
        Value::Int(*self as i64)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl ToValue for [u8] {
    fn to_value(&self) -> Value {
        Value::Bytes(self.to_vec())
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Time(*self)
    }
}

impl ToValue for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::Time(self.and_utc())
    }
}

impl ToValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Time(self.and_time(NaiveTime::MIN).and_utc())
    }
}

impl ToValue for Uuid {
    fn to_value(&self) -> Value {
        Value::Text(self.hyphenated().to_string())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Time(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        v.to_value()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One entry of a [`ValueMap`]: a bound value or a raw SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Assign {
    /// Bound through a `?` placeholder.
    Bind(Value),
    /// Emitted verbatim, e.g. `age+1`. Never parameterized.
    Expr(String),
}

/// Column-keyed values, kept sorted by column name.
///
/// Used as an insert/update source, as a select destination, and as the assignment list of
/// `on conflict ... do update set`.
///
/// ```ignore
/// let v = ValueMap::new().with("name", "bob").with_expr("age", "age+1");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    entries: BTreeMap<String, Assign>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ValueMap::set`].
    pub fn with(mut self, column: impl Into<String>, value: impl ToValue) -> Self {
        self.set(column, value);
        self
    }

    /// Builder form of [`ValueMap::set_expr`].
    pub fn with_expr(mut self, column: impl Into<String>, expr: impl Into<String>) -> Self {
        self.set_expr(column, expr);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl ToValue) {
        self.entries
            .insert(column.into(), Assign::Bind(value.to_value()));
    }

    pub fn set_expr(&mut self, column: impl Into<String>, expr: impl Into<String>) {
        self.entries.insert(column.into(), Assign::Expr(expr.into()));
    }

    /// The bound value for `column`; `None` for missing keys and expressions.
    pub fn get(&self, column: &str) -> Option<&Value> {
        match self.entries.get(column) {
            Some(Assign::Bind(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_assign(&self, column: &str) -> Option<&Assign> {
        self.entries.get(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<Assign> {
        self.entries.remove(column)
    }

    pub fn contains_key(&self, column: &str) -> bool {
        self.entries.contains_key(column)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Assign)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Into<String>, V: ToValue> FromIterator<(K, V)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.set(k, v);
        }
        map
    }
}

//! Typed values produced by the decode engine
//!
//! [`Value`] extends the wire model with the typed primitives a schema can
//! describe: big integers, dates and temporal values, byte buffers, compiled
//! regular expressions and parsed URLs. [`Value::to_wire`] is the single
//! source of truth for the canonical wire form of each typed variant.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Timelike, Utc};

use crate::wire::WireValue;

/// A decoded, typed value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absence of a value, distinct from an explicit null.
    Undefined,
    /// An explicit null.
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Arbitrary-precision integer primitive, carried as `i128`.
    BigInt(i128),
    /// A calendar timestamp, always held in UTC.
    Date(DateTime<Utc>),
    /// A raw byte buffer; its wire form is standard base64.
    Bytes(Vec<u8>),
    /// A compiled regular expression; equality compares source patterns.
    Regex(regex::Regex),
    Url(url::Url),
    /// An absolute point in time, epoch-anchored.
    Instant(DateTime<Utc>),
    LocalDate(NaiveDate),
    LocalTime(NaiveTime),
    LocalDateTime(NaiveDateTime),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::BigInt(_) => "bigint",
            Self::Date(_) => "date",
            Self::Bytes(_) => "bytes",
            Self::Regex(_) => "regex",
            Self::Url(_) => "url",
            Self::Instant(_) => "instant",
            Self::LocalDate(_) => "localDate",
            Self::LocalTime(_) => "localTime",
            Self::LocalDateTime(_) => "localDateTime",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Returns true for `Undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns true for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Structural conversion from the wire model. No coercion happens here;
    /// wire scalars map onto the matching typed variant one to one.
    pub fn from_wire(wire: &WireValue) -> Value {
        match wire {
            WireValue::Undefined => Self::Undefined,
            WireValue::Null => Self::Null,
            WireValue::Bool(b) => Self::Bool(*b),
            WireValue::Number(n) => Self::Number(*n),
            WireValue::String(s) => Self::String(s.clone()),
            WireValue::Array(items) => Self::Array(items.iter().map(Self::from_wire).collect()),
            WireValue::Object(entries) => Self::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), Self::from_wire(value)))
                    .collect(),
            ),
        }
    }

    /// Canonical wire form of the value.
    ///
    /// Typed variants serialize to their documented string forms: big
    /// integers as decimal strings, timestamps as RFC 3339 with milliseconds
    /// in UTC, byte buffers as standard base64, regular expressions and URLs
    /// as their source text. Containers convert structurally.
    pub fn to_wire(&self) -> WireValue {
        match self {
            Self::Undefined => WireValue::Undefined,
            Self::Null => WireValue::Null,
            Self::Bool(b) => WireValue::Bool(*b),
            Self::Number(n) => WireValue::Number(*n),
            Self::String(s) => WireValue::String(s.clone()),
            Self::BigInt(i) => WireValue::String(i.to_string()),
            Self::Date(dt) | Self::Instant(dt) => {
                WireValue::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Self::Bytes(bytes) => WireValue::String(STANDARD.encode(bytes)),
            Self::Regex(re) => WireValue::String(re.as_str().to_string()),
            Self::Url(url) => WireValue::String(url.as_str().to_string()),
            Self::LocalDate(d) => WireValue::String(d.format("%Y-%m-%d").to_string()),
            Self::LocalTime(t) => WireValue::String(format_local_time(t)),
            Self::LocalDateTime(dt) => WireValue::String(format_local_datetime(dt)),
            Self::Array(items) => WireValue::Array(items.iter().map(Self::to_wire).collect()),
            Self::Object(entries) => WireValue::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_wire()))
                    .collect(),
            ),
        }
    }

    /// Builds an object value from key/value pairs.
    pub fn object<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Object(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Builds an array value from elements.
    pub fn array<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

fn format_local_time(t: &NaiveTime) -> String {
    if t.nanosecond() == 0 {
        t.format("%H:%M:%S").to_string()
    } else {
        t.format("%H:%M:%S%.3f").to_string()
    }
}

fn format_local_datetime(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Instant(a), Self::Instant(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Regex(a), Self::Regex(b)) => a.as_str() == b.as_str(),
            (Self::Url(a), Self::Url(b)) => a == b,
            (Self::LocalDate(a), Self::LocalDate(b)) => a == b,
            (Self::LocalTime(a), Self::LocalTime(b)) => a == b,
            (Self::LocalDateTime(a), Self::LocalDateTime(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i128> for Value {
    fn from(value: i128) -> Self {
        Self::BigInt(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_values_compare_by_source_pattern() {
        let a = Value::Regex(regex::Regex::new("^a+$").unwrap());
        let b = Value::Regex(regex::Regex::new("^a+$").unwrap());
        let c = Value::Regex(regex::Regex::new("^b+$").unwrap());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn cross_variant_equality_is_false() {
        assert_ne!(Value::Undefined, Value::Null);
        assert_ne!(Value::Number(1.0), Value::BigInt(1));
        assert_ne!(Value::String("1".into()), Value::Number(1.0));
    }

    #[test]
    fn bigint_wire_form_is_a_decimal_string() {
        assert_eq!(
            Value::BigInt(i128::MIN).to_wire(),
            WireValue::String("-170141183460469231731687303715884105728".into())
        );
        assert_eq!(Value::BigInt(42).to_wire(), WireValue::from("42"));
    }

    #[test]
    fn date_wire_form_is_rfc3339_with_milliseconds() {
        let dt = DateTime::from_timestamp_millis(1_577_836_800_123).unwrap();
        assert_eq!(
            Value::Date(dt).to_wire(),
            WireValue::String("2020-01-01T00:00:00.123Z".into())
        );
    }

    #[test]
    fn bytes_wire_form_is_standard_base64() {
        assert_eq!(
            Value::Bytes(b"hello".to_vec()).to_wire(),
            WireValue::String("aGVsbG8=".into())
        );
    }

    #[test]
    fn local_time_wire_form_omits_a_zero_fraction() {
        let plain = NaiveTime::from_hms_opt(10, 15, 30).unwrap();
        let sub = NaiveTime::from_hms_milli_opt(10, 15, 30, 250).unwrap();
        assert_eq!(Value::LocalTime(plain).to_wire(), WireValue::from("10:15:30"));
        assert_eq!(Value::LocalTime(sub).to_wire(), WireValue::from("10:15:30.250"));
    }

    #[test]
    fn structural_conversion_round_trips_plain_shapes() {
        let wire = WireValue::object([
            ("a", WireValue::Number(1.0)),
            ("b", WireValue::array(["x", "y"])),
        ]);
        assert_eq!(Value::from_wire(&wire).to_wire(), wire);
    }
}

//! Deserializers: from a raw JSON value to a typed argument.
//!
//! | Constructor | Produces | Accepts |
//! |---|---|---|
//! | [`Deserializer::boolean`] | `bool` | `""`/`"true"` (any case) and JSON booleans |
//! | [`Deserializer::integer`] | any `TryFrom<i64>` | integral numbers and numeric strings |
//! | [`Deserializer::float`] | `f64` | numbers and numeric strings |
//! | [`Deserializer::decimal`] | [`Decimal`] | numbers and numeric strings |
//! | [`Deserializer::datetime`] | `DateTime<FixedOffset>` | RFC 3339, RFC 2822 and common date formats |
//! | [`Deserializer::string`] | `String` | anything; non-strings are rendered as JSON |
//! | [`Deserializer::string_list`] | `Vec<String>` | arrays, or a single value |
//! | [`Deserializer::model`] | any `DeserializeOwned` | whatever serde accepts |

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use restbind_core::ArgValue;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;

type DeserializeFn = dyn Fn(Value) -> Result<ArgValue, String> + Send + Sync;

/// Converts a raw value into the argument handed to the handler.
#[derive(Clone)]
pub struct Deserializer {
    name: &'static str,
    f: Arc<DeserializeFn>,
}

impl Deserializer {
    /// Wraps a conversion function. `name` is used in logs.
    pub fn new<T, F>(name: &'static str, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Value) -> Result<T, String> + Send + Sync + 'static,
    {
        Self {
            name,
            f: Arc::new(move |value| f(value).map(|v| Box::new(v) as ArgValue)),
        }
    }

    /// Boolean flags.
    #[must_use]
    pub fn boolean() -> Self {
        Self::new("bool", |value| Ok(parse_bool(&value)))
    }

    /// Integers, narrowed to `T`.
    #[must_use]
    pub fn integer<T>() -> Self
    where
        T: TryFrom<i64> + Any + Send + Sync,
    {
        Self::new(std::any::type_name::<T>(), |value| {
            let n = parse_int(&value)?;
            T::try_from(n).map_err(|_| format!("{n} is out of range"))
        })
    }

    /// Floating point numbers.
    #[must_use]
    pub fn float() -> Self {
        Self::new("f64", |value| parse_float(&value))
    }

    /// Arbitrary-precision decimals.
    #[must_use]
    pub fn decimal() -> Self {
        Self::new("decimal", |value| parse_decimal(&value))
    }

    /// Dates and datetimes. Values without an offset are taken as UTC.
    #[must_use]
    pub fn datetime() -> Self {
        Self::new("datetime", |value| parse_datetime(&value))
    }

    /// Dates and datetimes, converted to UTC.
    #[must_use]
    pub fn datetime_utc() -> Self {
        Self::new("datetime", |value| {
            parse_datetime(&value).map(|dt| dt.with_timezone(&Utc))
        })
    }

    /// Strings.
    #[must_use]
    pub fn string() -> Self {
        Self::new("string", |value| Ok(value_to_string(&value)))
    }

    /// Lists of strings.
    #[must_use]
    pub fn string_list() -> Self {
        Self::new("string_list", |value| {
            Ok(match value {
                Value::Array(items) => items.iter().map(value_to_string).collect::<Vec<_>>(),
                other => vec![value_to_string(&other)],
            })
        })
    }

    /// Any type serde can build from JSON.
    #[must_use]
    pub fn model<T>() -> Self
    where
        T: DeserializeOwned + Any + Send + Sync,
    {
        Self::new(std::any::type_name::<T>(), |value| {
            serde_json::from_value::<T>(value).map_err(|e| e.to_string())
        })
    }

    /// Runs the conversion.
    ///
    /// # Errors
    ///
    /// Returns the reason the value was rejected.
    pub fn deserialize(&self, value: Value) -> Result<ArgValue, String> {
        (self.f)(value)
    }

    /// Returns the deserializer name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for Deserializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Deserializer").field(&self.name).finish()
    }
}

/// Interprets a flag. An empty string counts as set, so `?flag` is true.
#[must_use]
pub fn parse_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.is_empty() || s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Parses an integer.
///
/// # Errors
///
/// Returns a reason for non-numeric strings, fractional numbers and other
/// JSON types.
pub fn parse_int(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e18)
                    .map(|f| f as i64)
            })
            .ok_or_else(|| format!("{n} is not an integer")),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("invalid literal for int: '{s}'")),
        other => Err(format!("{other} is not an integer")),
    }
}

/// Parses a float.
///
/// # Errors
///
/// Returns a reason for non-numeric values.
pub fn parse_float(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("{n} is not a number")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("could not convert string to float: '{s}'")),
        other => Err(format!("{other} is not a number")),
    }
}

/// Parses a decimal.
///
/// # Errors
///
/// Returns a reason for non-numeric values.
pub fn parse_decimal(value: &Value) -> Result<Decimal, String> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => return Err(format!("{other} is not a decimal")),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| format!("invalid decimal: '{text}'"))
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %B %Y", "%B %d, %Y"];

/// Parses a date or datetime.
///
/// # Errors
///
/// Returns a reason when no known format matches.
pub fn parse_datetime(value: &Value) -> Result<DateTime<FixedOffset>, String> {
    let Value::String(raw) = value else {
        return Err(format!("{value} is not a date"));
    };
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(dt);
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc().fixed_offset());
        }
    }
    Err(format!("unknown date format: '{s}'"))
}

/// Renders a value as text: strings as-is, everything else as JSON.
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use proptest::prelude::*;
    use serde::Deserialize;
    use serde_json::json;

    fn run<T: Any + Clone>(d: &Deserializer, value: Value) -> Result<T, String> {
        d.deserialize(value)
            .map(|boxed| boxed.downcast_ref::<T>().cloned().unwrap())
    }

    #[test]
    fn test_bool() {
        assert!(parse_bool(&json!("")));
        assert!(parse_bool(&json!("true")));
        assert!(parse_bool(&json!("TRUE")));
        assert!(parse_bool(&json!(true)));
        assert!(!parse_bool(&json!("false")));
        assert!(!parse_bool(&json!("1")));
        assert!(!parse_bool(&json!(null)));
    }

    #[test]
    fn test_integer() {
        let d = Deserializer::integer::<i64>();
        assert_eq!(run::<i64>(&d, json!("2")), Ok(2));
        assert_eq!(run::<i64>(&d, json!(" -7 ")), Ok(-7));
        assert_eq!(run::<i64>(&d, json!(3.0)), Ok(3));
        assert!(run::<i64>(&d, json!("abc")).is_err());
        assert!(run::<i64>(&d, json!(2.5)).is_err());
    }

    #[test]
    fn test_integer_narrowing() {
        let d = Deserializer::integer::<u8>();
        assert_eq!(run::<u8>(&d, json!(200)), Ok(200));
        assert!(run::<u8>(&d, json!(300)).unwrap_err().contains("out of range"));
    }

    #[test]
    fn test_float_and_decimal() {
        assert_eq!(run::<f64>(&Deserializer::float(), json!("1.5")), Ok(1.5));
        assert_eq!(
            run::<Decimal>(&Deserializer::decimal(), json!("10.25")),
            Ok(Decimal::new(1025, 2))
        );
        assert_eq!(
            run::<Decimal>(&Deserializer::decimal(), json!(3)),
            Ok(Decimal::new(3, 0))
        );
        assert!(run::<Decimal>(&Deserializer::decimal(), json!("ten")).is_err());
    }

    #[test]
    fn test_datetime_formats() {
        let dt = parse_datetime(&json!("2020-03-04T05:06:07+02:00")).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (2020, 3, 4, 5));
        assert_eq!(dt.offset().local_minus_utc(), 7200);

        let dt = parse_datetime(&json!("2020-03-04 05:06:07")).unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 0);
        assert_eq!(dt.minute(), 6);

        let dt = parse_datetime(&json!("2020-03-04")).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (2020, 3, 4, 0));

        assert!(parse_datetime(&json!("yesterday")).is_err());
        assert!(parse_datetime(&json!(12)).is_err());
    }

    #[test]
    fn test_string() {
        let d = Deserializer::string();
        assert_eq!(run::<String>(&d, json!("x")), Ok("x".to_string()));
        assert_eq!(run::<String>(&d, json!(2)), Ok("2".to_string()));
        assert_eq!(run::<String>(&d, json!(true)), Ok("true".to_string()));
    }

    #[test]
    fn test_string_list() {
        let d = Deserializer::string_list();
        assert_eq!(
            run::<Vec<String>>(&d, json!(["a", 1])),
            Ok(vec!["a".to_string(), "1".to_string()])
        );
        assert_eq!(run::<Vec<String>>(&d, json!("a")), Ok(vec!["a".to_string()]));
    }

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Payload {
        name: String,
        count: u32,
    }

    #[test]
    fn test_model() {
        let d = Deserializer::model::<Payload>();
        assert_eq!(
            run::<Payload>(&d, json!({"name": "n", "count": 2})),
            Ok(Payload {
                name: "n".to_string(),
                count: 2
            })
        );
        assert!(run::<Payload>(&d, json!({"name": "n"})).is_err());
    }

    proptest! {
        #[test]
        fn prop_bool_is_idempotent(raw in ".{0,12}") {
            let once = parse_bool(&json!(raw));
            let twice = parse_bool(&json!(once.to_string()));
            prop_assert_eq!(once, twice);
        }
    }
}

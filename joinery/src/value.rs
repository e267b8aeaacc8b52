//! # Value Module
//!
//! Loose values as read from a row (`RawValue`) and typed values as stored on
//! entities (`Value`), plus the coercion between them driven by the column's
//! declared [`SqlType`].

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::{schema::SqlType, Error};

// ============================================================================
// Raw Values
// ============================================================================

/// A value as delivered by a row stream, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

macro_rules! impl_raw_from {
    ($($t:ty => $variant:ident as $conv:ty),* $(,)?) => {
        $(
            impl From<$t> for RawValue {
                fn from(v: $t) -> Self {
                    RawValue::$variant(v as $conv)
                }
            }
        )*
    };
}

impl_raw_from!(
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float as f64,
);

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        RawValue::Bool(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(v: Vec<u8>) -> Self {
        RawValue::Bytes(v)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(RawValue::Null, Into::into)
    }
}

// ============================================================================
// Typed Values
// ============================================================================

/// A typed column value on a materialized entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(Uuid),
    Json(serde_json::Value),
    Vector(Vec<f32>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(i) => Some(*i as i64),
            Value::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Converts to a JSON value; temporal types and UUIDs become strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Text(s) => Json::String(s.clone()),
            Value::Int32(i) => Json::from(*i),
            Value::Int64(i) => Json::from(*i),
            Value::Float(f) => Json::from(*f as f64),
            Value::Double(f) => Json::from(*f),
            Value::Bool(b) => Json::Bool(*b),
            Value::Bytes(b) => Json::from(b.clone()),
            Value::Json(j) => j.clone(),
            Value::Vector(v) => Json::from(v.iter().map(|f| *f as f64).collect::<Vec<_>>()),
            other => Json::String(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Text(s) => write!(f, "{}", s),
            Value::Int32(i) => write!(f, "{}", i),
            Value::Int64(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::TimestampTz(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Json(j) => write!(f, "{}", j),
            Value::Vector(v) => write!(f, "{:?}", v),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// ============================================================================
// Coercion
// ============================================================================

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Coerces a raw row value into the representation of `sql_type`.
///
/// NULL always becomes `Value::Null`. Any value that cannot be represented is
/// a `MalformedValue` error naming `field`.
pub fn coerce(field: &str, raw: RawValue, sql_type: SqlType) -> Result<Value, Error> {
    let bad = |reason: &dyn fmt::Display| Error::malformed(field, sql_type, reason);

    if raw.is_null() {
        return Ok(Value::Null);
    }

    let value = match (sql_type, raw) {
        (SqlType::Text, RawValue::Text(s)) => Value::Text(s),
        (SqlType::Text, RawValue::Int(i)) => Value::Text(i.to_string()),
        (SqlType::Text, RawValue::Float(f)) => Value::Text(f.to_string()),
        (SqlType::Text, RawValue::Bool(b)) => Value::Text(b.to_string()),
        (SqlType::Text, RawValue::Bytes(b)) => Value::Text(String::from_utf8(b).map_err(|e| bad(&e))?),

        (SqlType::Int32, RawValue::Int(i)) => Value::Int32(i32::try_from(i).map_err(|e| bad(&e))?),
        (SqlType::Int32, RawValue::Text(s)) => Value::Int32(s.trim().parse().map_err(|e| bad(&e))?),
        (SqlType::Int32, RawValue::Bool(b)) => Value::Int32(b as i32),

        (SqlType::Int64, RawValue::Int(i)) => Value::Int64(i),
        (SqlType::Int64, RawValue::Text(s)) => Value::Int64(s.trim().parse().map_err(|e| bad(&e))?),
        (SqlType::Int64, RawValue::Bool(b)) => Value::Int64(b as i64),

        (SqlType::Float, RawValue::Float(f)) => Value::Float(f as f32),
        (SqlType::Float, RawValue::Int(i)) => Value::Float(i as f32),
        (SqlType::Float, RawValue::Text(s)) => Value::Float(s.trim().parse().map_err(|e| bad(&e))?),

        (SqlType::Double, RawValue::Float(f)) => Value::Double(f),
        (SqlType::Double, RawValue::Int(i)) => Value::Double(i as f64),
        (SqlType::Double, RawValue::Text(s)) => Value::Double(s.trim().parse().map_err(|e| bad(&e))?),

        (SqlType::Boolean, RawValue::Bool(b)) => Value::Bool(b),
        (SqlType::Boolean, RawValue::Int(0)) => Value::Bool(false),
        (SqlType::Boolean, RawValue::Int(1)) => Value::Bool(true),
        (SqlType::Boolean, RawValue::Text(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "t" | "1" | "yes" => Value::Bool(true),
            "false" | "f" | "0" | "no" => Value::Bool(false),
            other => return Err(bad(&format!("'{}' is not a boolean", other))),
        },

        (SqlType::Bytes, RawValue::Bytes(b)) => Value::Bytes(b),
        (SqlType::Bytes, RawValue::Text(s)) => Value::Bytes(s.into_bytes()),

        (SqlType::Timestamp, RawValue::Text(s)) => Value::Timestamp(parse_naive_timestamp(&s).ok_or_else(|| bad(&s))?),
        (SqlType::Timestamp, RawValue::Int(secs)) => Value::Timestamp(
            DateTime::from_timestamp(secs, 0).ok_or_else(|| bad(&"timestamp out of range"))?.naive_utc(),
        ),

        (SqlType::TimestampTz, RawValue::Text(s)) => {
            let parsed = DateTime::parse_from_rfc3339(s.trim())
                .or_else(|_| DateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S%.f%#z"))
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| parse_naive_timestamp(&s).map(|naive| naive.and_utc()));
            Value::TimestampTz(parsed.ok_or_else(|| bad(&s))?)
        }
        (SqlType::TimestampTz, RawValue::Int(secs)) => {
            Value::TimestampTz(DateTime::from_timestamp(secs, 0).ok_or_else(|| bad(&"timestamp out of range"))?)
        }

        (SqlType::Date, RawValue::Text(s)) => {
            Value::Date(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| bad(&e))?)
        }
        (SqlType::Time, RawValue::Text(s)) => {
            Value::Time(NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f").map_err(|e| bad(&e))?)
        }

        (SqlType::Uuid, RawValue::Text(s)) => Value::Uuid(Uuid::parse_str(s.trim()).map_err(|e| bad(&e))?),
        (SqlType::Uuid, RawValue::Bytes(b)) => Value::Uuid(Uuid::from_slice(&b).map_err(|e| bad(&e))?),

        (SqlType::Json, RawValue::Text(s)) => Value::Json(serde_json::from_str(&s).map_err(|e| bad(&e))?),
        (SqlType::Json, RawValue::Bytes(b)) => Value::Json(serde_json::from_slice(&b).map_err(|e| bad(&e))?),
        (SqlType::Json, RawValue::Int(i)) => Value::Json(serde_json::Value::from(i)),
        (SqlType::Json, RawValue::Float(f)) => Value::Json(serde_json::Value::from(f)),
        (SqlType::Json, RawValue::Bool(b)) => Value::Json(serde_json::Value::Bool(b)),

        (SqlType::Vector(dim), RawValue::Text(s)) => {
            let values: Vec<f32> = serde_json::from_str(s.trim()).map_err(|e| bad(&e))?;
            Value::Vector(check_dimension(values, dim).map_err(|e| bad(&e))?)
        }
        (SqlType::Vector(dim), RawValue::Bytes(b)) => {
            if b.len() % 4 != 0 {
                return Err(bad(&format!("{} bytes is not a whole number of f32 values", b.len())));
            }
            let values = b.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect();
            Value::Vector(check_dimension(values, dim).map_err(|e| bad(&e))?)
        }

        (_, raw) => return Err(bad(&format!("cannot convert {:?}", raw))),
    };

    Ok(value)
}

fn parse_naive_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
}

fn check_dimension(values: Vec<f32>, dim: Option<usize>) -> Result<Vec<f32>, String> {
    match dim {
        Some(n) if values.len() != n => Err(format!("expected {} dimensions, found {}", n, values.len())),
        _ => Ok(values),
    }
}

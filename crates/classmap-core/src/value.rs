//! Runtime values and semantic property types.
//!
//! [`Value`] is the closed set of scalars that flows between property cells,
//! SQL parameters, and database rows. [`PropertyType`] is the semantic type
//! tag attached to a property definition; coercion from raw database scalars
//! is an explicit per-tag function rather than reflection.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A single scalar value held by a property cell or bound to a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL / absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// Exact decimal kept as its canonical string rendering.
    Decimal(String),
    /// UTF-8 text.
    Text(String),
    /// Date and time without timezone.
    DateTime(NaiveDateTime),
    /// Globally unique identifier.
    Uuid(Uuid),
}

impl Value {
    /// Whether this is the NULL value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text content, if this is a `Text` value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content, if this is an `Int` value.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Uuid content, if this is a `Uuid` value.
    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Decimal content parsed to a float, if this is a `Decimal` value.
    #[must_use]
    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            Value::Decimal(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Render this value as a quoted SQL literal.
    ///
    /// Used for literal where clauses (duplicate-key messages, key equality
    /// diagnostics); parameterized statements bind the value itself instead.
    #[must_use]
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Decimal(d) => d.clone(),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Value::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Uuid(u) => format!("'{u}'"),
        }
    }

    /// Total ordering with null-low semantics.
    ///
    /// Values of mismatched variants compare by a fixed variant rank so a
    /// sort over heterogeneous rows is still deterministic.
    #[must_use]
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => {
                match (a.parse::<f64>(), b.parse::<f64>()) {
                    (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                    _ => a.cmp(b),
                }
            }
            (Value::Int(a), Value::Decimal(b)) => match b.parse::<f64>() {
                Ok(y) => (*a as f64).partial_cmp(&y).unwrap_or(Ordering::Equal),
                Err(_) => Ordering::Less,
            },
            (Value::Decimal(a), Value::Int(b)) => match a.parse::<f64>() {
                Ok(x) => x.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
                Err(_) => Ordering::Greater,
            },
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Uuid(a), Value::Uuid(b)) => a.cmp(b),
            (a, b) => variant_rank(a).cmp(&variant_rank(b)),
        }
    }
}

fn variant_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) => 2,
        Value::Decimal(_) => 3,
        Value::Text(_) => 4,
        Value::DateTime(_) => 5,
        Value::Uuid(_) => 6,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, ""),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Uuid(u) => write!(f, "{u}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

/// Semantic type of a property, independent of any particular language type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    /// Free text.
    Text,
    /// 64-bit integer.
    Int,
    /// Boolean.
    Bool,
    /// Date and time.
    DateTime,
    /// Globally unique identifier.
    Guid,
    /// Exact decimal.
    Decimal,
    /// Application-defined type identified by name; values pass through as
    /// text and the application owns construction/rendering.
    Custom(String),
}

impl PropertyType {
    /// Human-readable type name, used in coercion errors.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            PropertyType::Text => "Text",
            PropertyType::Int => "Int",
            PropertyType::Bool => "Bool",
            PropertyType::DateTime => "DateTime",
            PropertyType::Guid => "Guid",
            PropertyType::Decimal => "Decimal",
            PropertyType::Custom(name) => name,
        }
    }

    /// Coerce a raw database scalar into this semantic type.
    ///
    /// NULL always passes through. A zero-valued GUID normalizes to NULL.
    /// Failures identify the target type; callers decide whether to fall
    /// back to the raw value (property assignment) or propagate (load).
    pub fn coerce(&self, property_name: &str, raw: Value) -> Result<Value> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let fail = |raw: &Value| Error::Coercion {
            property_name: property_name.to_string(),
            value: raw.to_string(),
            target_type: self.name().to_string(),
        };
        match self {
            PropertyType::Text | PropertyType::Custom(_) => Ok(match raw {
                Value::Text(s) => Value::Text(s),
                other => Value::Text(other.to_string()),
            }),
            PropertyType::Int => match raw {
                Value::Int(i) => Ok(Value::Int(i)),
                Value::Bool(b) => Ok(Value::Int(i64::from(b))),
                Value::Decimal(ref d) => {
                    let parsed: f64 = d.parse().map_err(|_| fail(&raw))?;
                    if parsed.fract() == 0.0 {
                        Ok(Value::Int(parsed as i64))
                    } else {
                        Err(fail(&raw))
                    }
                }
                Value::Text(ref s) => s.trim().parse().map(Value::Int).map_err(|_| fail(&raw)),
                _ => Err(fail(&raw)),
            },
            PropertyType::Bool => match raw {
                Value::Bool(b) => Ok(Value::Bool(b)),
                Value::Int(0) => Ok(Value::Bool(false)),
                Value::Int(1) => Ok(Value::Bool(true)),
                Value::Text(ref s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" => Ok(Value::Bool(true)),
                    "false" | "0" | "no" => Ok(Value::Bool(false)),
                    _ => Err(fail(&raw)),
                },
                _ => Err(fail(&raw)),
            },
            PropertyType::DateTime => match raw {
                Value::DateTime(dt) => Ok(Value::DateTime(dt)),
                Value::Text(ref s) => parse_date_time(s).map(Value::DateTime).ok_or_else(|| fail(&raw)),
                _ => Err(fail(&raw)),
            },
            PropertyType::Guid => match raw {
                Value::Uuid(u) => Ok(normalize_uuid(u)),
                Value::Text(ref s) => match Uuid::parse_str(s.trim()) {
                    Ok(u) => Ok(normalize_uuid(u)),
                    // Guid parse failures load as NULL rather than erroring;
                    // a fresh key value will be assigned for new objects.
                    Err(_) => Ok(Value::Null),
                },
                _ => Err(fail(&raw)),
            },
            PropertyType::Decimal => match raw {
                Value::Decimal(d) => Ok(Value::Decimal(d)),
                Value::Int(i) => Ok(Value::Decimal(i.to_string())),
                Value::Text(ref s) => {
                    let trimmed = s.trim();
                    trimmed
                        .parse::<f64>()
                        .map(|_| Value::Decimal(trimmed.to_string()))
                        .map_err(|_| fail(&raw))
                }
                _ => Err(fail(&raw)),
            },
        }
    }
}

/// A zero-valued GUID means "no identity" and normalizes to NULL.
fn normalize_uuid(u: Uuid) -> Value {
    if u.is_nil() {
        Value::Null
    } else {
        Value::Uuid(u)
    }
}

fn parse_date_time(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

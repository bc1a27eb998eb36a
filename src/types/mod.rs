//! Value model for pocketsql
//!
//! Values are weakly typed in the SQLite manner: a column declares a type,
//! but a value carries its own runtime kind and is coerced on write.

mod table;

pub use table::{Column, ColumnFlags, TypeTag};

use crate::error::{PocketError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dynamically typed SQL value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,

    /// Integer value (covers both 32- and 64-bit SQL integers)
    Integer(i64),

    /// Floating point value
    Real(f64),

    /// Text string
    Text(String),

    /// Byte sequence
    Blob(Vec<u8>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Real(_))
    }

    /// Type inferred from the runtime kind. Null and blobs have no affinity.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Integer(_) => TypeTag::Integer,
            Value::Real(_) => TypeTag::Real,
            Value::Text(_) => TypeTag::Text,
            Value::Null | Value::Blob(_) => TypeTag::None,
        }
    }

    /// Forces the value to a double for arithmetic and mixed comparisons.
    ///
    /// Null and blobs read as `0.0`. Text must parse as a number, otherwise
    /// the coercion fault escapes uncaught.
    pub fn to_f64(&self) -> Result<f64> {
        match self {
            Value::Null | Value::Blob(_) => Ok(0.0),
            Value::Integer(i) => Ok(*i as f64),
            Value::Real(r) => Ok(*r),
            Value::Text(s) => parse_f64(s),
        }
    }

    /// Truthiness used by AND, OR and NOT: only a value equal to one is true.
    ///
    /// Text is true when it reads `TRUE` (any case) or parses to `1`.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Integer(i) => *i == 1,
            Value::Real(r) => *r == 1.0,
            Value::Text(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    true
                } else if s.eq_ignore_ascii_case("FALSE") {
                    false
                } else {
                    s.trim().parse::<f64>().map(|d| d == 1.0).unwrap_or(false)
                }
            }
            Value::Null | Value::Blob(_) => false,
        }
    }

    /// Coerces the value to a declared column type, as done on every write.
    ///
    /// - INTEGER keeps integers, truncates reals and parses text; non-numeric
    ///   text is a coercion fault, blobs read as `0`.
    /// - REAL widens integers and parses text; blobs read as `0.0`.
    /// - TEXT and NUMERIC stringify; blobs are decoded lossily.
    /// - NONE stringifies numbers and keeps text and blobs as they are.
    pub fn coerce(&self, target: TypeTag) -> Result<Value> {
        if self.is_null() {
            return Ok(Value::Null);
        }
        let coerced = match target {
            TypeTag::Integer => match self {
                Value::Integer(i) => Value::Integer(*i),
                Value::Real(r) => Value::Integer(r.trunc() as i64),
                Value::Text(s) => Value::Integer(parse_i64(s, target)?),
                Value::Blob(_) | Value::Null => Value::Integer(0),
            },
            TypeTag::Real => match self {
                Value::Integer(i) => Value::Real(*i as f64),
                Value::Real(r) => Value::Real(*r),
                Value::Text(s) => Value::Real(parse_f64(s)?),
                Value::Blob(_) | Value::Null => Value::Real(0.0),
            },
            TypeTag::Text | TypeTag::Numeric => match self {
                Value::Blob(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
                other => Value::Text(other.to_string()),
            },
            TypeTag::None => match self {
                Value::Blob(bytes) => Value::Blob(bytes.clone()),
                other => Value::Text(other.to_string()),
            },
        };
        Ok(coerced)
    }

    /// Reads the value as a 32-bit integer. Null reads as `0`.
    pub fn as_int(&self) -> Result<i32> {
        match self {
            Value::Null => Ok(0),
            Value::Integer(i) => Ok(*i as i32),
            Value::Real(r) => Ok(*r as i32),
            other => Ok(parse_i64(&other.to_string(), TypeTag::Integer)? as i32),
        }
    }

    /// Reads the value as a 64-bit integer. Null reads as `0`.
    pub fn as_long(&self) -> Result<i64> {
        match self {
            Value::Null => Ok(0),
            Value::Integer(i) => Ok(*i),
            Value::Real(r) => Ok(*r as i64),
            other => parse_i64(&other.to_string(), TypeTag::Integer),
        }
    }

    /// Reads the value as a double. Null reads as `0.0`.
    pub fn as_double(&self) -> Result<f64> {
        match self {
            Value::Null => Ok(0.0),
            Value::Integer(i) => Ok(*i as f64),
            Value::Real(r) => Ok(*r),
            other => parse_f64(&other.to_string()),
        }
    }

    /// Reads the value as text. Null reads as the empty string.
    pub fn as_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        Ok(self.as_int()? == 1)
    }
}

fn parse_i64(text: &str, target: TypeTag) -> Result<i64> {
    text.parse::<i64>().map_err(|_| PocketError::Coercion {
        value: text.to_string(),
        target,
    })
}

fn parse_f64(text: &str) -> Result<f64> {
    text.trim().parse::<f64>().map_err(|_| PocketError::Coercion {
        value: text.to_string(),
        target: TypeTag::Real,
    })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => {
                if r.is_finite() && r.fract() == 0.0 && r.abs() < 1e16 {
                    write!(f, "{:.1}", r)
                } else {
                    write!(f, "{}", r)
                }
            }
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(bytes) => {
                write!(f, "X'")?;
                for b in bytes {
                    write!(f, "{:02X}", b)?;
                }
                write!(f, "'")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
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
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

//! Dynamic column values.
//!
//! Rows travel between the driver and the records as [`Value`]s. Records keep
//! typed fields; [`ColumnValue`] is the bridge between the two.

use std::collections::HashMap;
use std::fmt;

use serde::{Serialize, Serializer};

/// One row, keyed by column name.
pub type Row = HashMap<String, Value>;

/// A single column value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Short name of the variant, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null     => "null",
            Self::Bool(_)  => "bool",
            Self::Int(_)   => "int",
            Self::Float(_) => "float",
            Self::Text(_)  => "text",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Text(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null     => f.write_str("NULL"),
            Self::Bool(b)  => write!(f, "{b}"),
            Self::Int(n)   => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s)  => write!(f, "'{s}'"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null     => serializer.serialize_unit(),
            Self::Bool(b)  => serializer.serialize_bool(*b),
            Self::Int(n)   => serializer.serialize_i64(*n),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::Text(s)  => serializer.serialize_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Self::Bool(b) }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self { Self::Int(n) }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self { Self::Int(n.into()) }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self { Self::Int(i64::try_from(n).unwrap_or(i64::MAX)) }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self { Self::Float(x) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Self::Text(s) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Rust types a record field can hold.
///
/// `from_value` returns `Ok(None)` for SQL `NULL` and gives the value back
/// when it cannot be represented as `Self`.
pub trait ColumnValue: Sized + Into<Value> {
    const KIND: &'static str;

    fn from_value(value: Value) -> Result<Option<Self>, Value>;
}

impl ColumnValue for String {
    const KIND: &'static str = "text";

    fn from_value(value: Value) -> Result<Option<Self>, Value> {
        match value {
            Value::Null     => Ok(None),
            Value::Text(s)  => Ok(Some(s)),
            Value::Int(n)   => Ok(Some(n.to_string())),
            Value::Float(x) => Ok(Some(x.to_string())),
            other           => Err(other),
        }
    }
}

impl ColumnValue for bool {
    const KIND: &'static str = "bool";

    // MySQL and SQLite both hand booleans back as integers.
    fn from_value(value: Value) -> Result<Option<Self>, Value> {
        match value {
            Value::Null    => Ok(None),
            Value::Bool(b) => Ok(Some(b)),
            Value::Int(n)  => Ok(Some(n != 0)),
            other          => Err(other),
        }
    }
}

impl ColumnValue for i64 {
    const KIND: &'static str = "int";

    fn from_value(value: Value) -> Result<Option<Self>, Value> {
        match value {
            Value::Null    => Ok(None),
            Value::Int(n)  => Ok(Some(n)),
            Value::Bool(b) => Ok(Some(i64::from(b))),
            other          => Err(other),
        }
    }
}

impl ColumnValue for f64 {
    const KIND: &'static str = "float";

    fn from_value(value: Value) -> Result<Option<Self>, Value> {
        match value {
            Value::Null     => Ok(None),
            Value::Float(x) => Ok(Some(x)),
            Value::Int(n)   => Ok(Some(n as f64)),
            other           => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_converts_to_unset_field() {
        assert_eq!(String::from_value(Value::Null), Ok(None));
        assert_eq!(bool::from_value(Value::Null), Ok(None));
    }

    #[test]
    fn integer_booleans_are_accepted() {
        assert_eq!(bool::from_value(Value::Int(1)), Ok(Some(true)));
        assert_eq!(bool::from_value(Value::Int(0)), Ok(Some(false)));
    }

    #[test]
    fn text_is_not_a_float() {
        assert_eq!(f64::from_value(Value::from("abc")), Err(Value::from("abc")));
    }

    #[test]
    fn serializes_to_plain_json() {
        let row = vec![Value::Null, Value::Int(3), Value::from("x"), Value::Bool(true)];
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"[null,3,"x",true]"#);
    }
}

//! Dynamic value model shared by bindings, rows and entities.

use crate::error::{OrmError, OrmResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single SQL value.
///
/// Bindings, result rows and entity fields all carry `Value`s, so the
/// builder never needs to know the static type of a column.
///
/// # Example
/// ```
/// use lightorm::Value;
///
/// assert_eq!(Value::from(42), Value::Int(42));
/// assert_eq!(Value::from("admin"), Value::Text("admin".to_string()));
/// assert_eq!(Value::from(None::<i64>), Value::Null);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL
    #[default]
    Null,
    /// Boolean (stored as 0/1 by most engines)
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl Value {
    /// Whether this is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value binds as a number (the associative binding mode
    /// binds numbers as integers/reals and everything else as text).
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Bool(_))
    }

    /// Integer view, accepting numeric text the way loose drivers do.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text view.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
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

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Conversion from a [`Value`] into a concrete Rust type.
///
/// Used by [`Row::try_get`](crate::Row::try_get) and
/// [`EntityState::get_as`](crate::EntityState::get_as).
pub trait FromValue: Sized {
    /// Convert `value`, reading from `column` (used only for error messages).
    fn from_value(column: &str, value: &Value) -> OrmResult<Self>;
}

fn mismatch(column: &str, expected: &str, value: &Value) -> OrmError {
    OrmError::decode(
        column,
        format!("expected {expected}, found {}", value.kind()),
    )
}

impl FromValue for Value {
    fn from_value(_column: &str, value: &Value) -> OrmResult<Self> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
        value.as_i64().ok_or_else(|| mismatch(column, "int", value))
    }
}

impl FromValue for i32 {
    fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
        let v = i64::from_value(column, value)?;
        i32::try_from(v).map_err(|e| OrmError::decode(column, e.to_string()))
    }
}

impl FromValue for f64 {
    fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
        match value {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            Value::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| mismatch(column, "float", value)),
            _ => Err(mismatch(column, "float", value)),
        }
    }
}

impl FromValue for bool {
    fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(v) => Ok(*v != 0),
            _ => Err(mismatch(column, "bool", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Int(_) | Value::Float(_) | Value::Bool(_) => Ok(value.to_string()),
            _ => Err(mismatch(column, "text", value)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(mismatch(column, "bytes", value)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(column: &str, value: &Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(column, other).map(Some),
        }
    }
}

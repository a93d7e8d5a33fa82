//! Tagged scalar values used throughout mapping trees.
use serde_json::Value;
use std::fmt;

/// Type tag of a [`ScalarValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Integer,
    Float,
    Boolean,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::String => f.write_str("string"),
            ScalarKind::Integer => f.write_str("integer"),
            ScalarKind::Float => f.write_str("float"),
            ScalarKind::Boolean => f.write_str("boolean"),
        }
    }
}

/// An immutable scalar with exactly one populated variant.
///
/// Equality is structural: two scalars are equal when their tags and values
/// both match, so `1` (integer) and `1.0` (float) are distinct.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl ScalarValue {
    #[must_use]
    pub const fn kind(&self) -> ScalarKind {
        match self {
            ScalarValue::String(_) => ScalarKind::String,
            ScalarValue::Integer(_) => ScalarKind::Integer,
            ScalarValue::Float(_) => ScalarKind::Float,
            ScalarValue::Boolean(_) => ScalarKind::Boolean,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            ScalarValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            ScalarValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_boolean(&self) -> Option<bool> {
        match self {
            ScalarValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Whether this is a string whose content is empty.
    #[must_use]
    pub fn is_empty_string(&self) -> bool {
        matches!(self, ScalarValue::String(value) if value.is_empty())
    }

    /// Convert a JSON value into a scalar, when it is one.
    ///
    /// Numbers that fit `i64` become integers, all other numbers become
    /// floats; `null`, arrays, and objects are not scalars.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<ScalarValue> {
        match value {
            Value::String(value) => Some(ScalarValue::String(value.clone())),
            Value::Bool(value) => Some(ScalarValue::Boolean(*value)),
            Value::Number(number) => {
                if let Some(value) = number.as_i64() {
                    Some(ScalarValue::Integer(value))
                } else {
                    number.as_f64().map(ScalarValue::Float)
                }
            }
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::String(value) => f.write_str(value),
            ScalarValue::Integer(value) => write!(f, "{value}"),
            ScalarValue::Float(value) => write!(f, "{value}"),
            ScalarValue::Boolean(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> ScalarValue {
        ScalarValue::String(value.to_owned())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> ScalarValue {
        ScalarValue::String(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> ScalarValue {
        ScalarValue::Integer(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> ScalarValue {
        ScalarValue::Float(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> ScalarValue {
        ScalarValue::Boolean(value)
    }
}

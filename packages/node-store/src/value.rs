//! Property values and property states.

use crate::path::{validate_name, PathError};
use crate::Blob;

/// The typed value of a property.
///
/// Single-valued types map one-to-one to the property types of the tree.
/// Multi-valued properties are represented as an [`Value::Array`] of
/// single values of the same type.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Boolean value.
    Boolean(bool),
    /// Signed 64-bit integer.
    Long(i64),
    /// 64-bit floating point.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// A node or property name.
    Name(String),
    /// A path in the tree.
    Path(String),
    /// An ISO-8601 timestamp.
    Date(String),
    /// Binary content.
    Binary(Blob),
    /// Multi-valued property.
    Array(Vec<Value>),
}

impl Value {
    /// Check if this value is multi-valued.
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// The boolean, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is a long value.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// The text of any string-like value (string, name, path, date).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Name(s) | Value::Path(s) | Value::Date(s) => Some(s),
            _ => None,
        }
    }

    /// The blob, if this is a binary value.
    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Number of values: the array length, or 1 for single values.
    pub fn count(&self) -> usize {
        match self {
            Value::Array(values) => values.len(),
            _ => 1,
        }
    }
}

// Conversion from common types

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Long(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Blob> for Value {
    fn from(v: Blob) -> Self {
        Value::Binary(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

/// A named property of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyState {
    name: String,
    value: Value,
}

impl PropertyState {
    /// Create a property, validating its name.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Result<Self, PathError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            value: value.into(),
        })
    }

    /// The property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The property value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consume the property, returning its value.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// True for multi-valued properties.
    pub fn is_array(&self) -> bool {
        self.value.is_array()
    }
}

/// Typed accessors shared by node states and builders.
///
/// These follow the strict typing of the tree: a NAME property is not
/// returned as a string, and a STRING property is not returned as a name.
pub(crate) mod access {
    use super::{PropertyState, Value};

    pub(crate) fn boolean(property: Option<PropertyState>) -> bool {
        matches!(property.map(PropertyState::into_value), Some(Value::Boolean(true)))
    }

    pub(crate) fn string(property: Option<PropertyState>) -> Option<String> {
        match property.map(PropertyState::into_value) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn name(property: Option<PropertyState>) -> Option<String> {
        match property.map(PropertyState::into_value) {
            Some(Value::Name(s)) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn names(property: Option<PropertyState>) -> Vec<String> {
        match property.map(PropertyState::into_value) {
            Some(Value::Array(values)) => values
                .into_iter()
                .filter_map(|v| match v {
                    Value::Name(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

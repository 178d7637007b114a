//! Typed values produced by document validation
//!
//! A validated document is a tree of [`TypedValue`]s: scalar leaves coerced
//! by the built-in types, arrays for multi-valued children and [`Record`]s
//! for structured elements.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// A coerced XML value
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// String value
    String(String),
    /// Integer value
    Integer(i64),
    /// Exact decimal value
    Decimal(Decimal),
    /// Floating point value (float and double)
    Double(f64),
    /// Boolean value
    Boolean(bool),
    /// Point in time, normalized to UTC
    DateTime(DateTime<Utc>),
    /// Binary value (hexBinary, base64Binary)
    Binary(Vec<u8>),
    /// Sequence of values (repeated children, list types)
    Array(Vec<TypedValue>),
    /// Structured element
    Record(Record),
}

impl TypedValue {
    /// Get as string slice if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64 if this is an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as bool if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the items if this is an array
    pub fn as_array(&self) -> Option<&[TypedValue]> {
        match self {
            TypedValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get the record if this is a structured value
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            TypedValue::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Look up a child of a record by output key
    pub fn get(&self, key: &str) -> Option<&TypedValue> {
        self.as_record().and_then(|record| record.children.get(key))
    }

    /// Short name of the value kind
    pub fn kind(&self) -> &'static str {
        match self {
            TypedValue::String(_) => "string",
            TypedValue::Integer(_) => "integer",
            TypedValue::Decimal(_) => "decimal",
            TypedValue::Double(_) => "double",
            TypedValue::Boolean(_) => "boolean",
            TypedValue::DateTime(_) => "dateTime",
            TypedValue::Binary(_) => "binary",
            TypedValue::Array(_) => "array",
            TypedValue::Record(_) => "record",
        }
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::String(value.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        TypedValue::String(value)
    }
}

impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        TypedValue::Integer(value)
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        TypedValue::Boolean(value)
    }
}

/// Structured element value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// Coerced attributes keyed by output name
    pub attributes: IndexMap<String, TypedValue>,
    /// Character content, for simple-content and mixed elements
    pub text: Option<Box<TypedValue>>,
    /// Children keyed by output name
    pub children: IndexMap<String, TypedValue>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether the record carries nothing at all
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.text.is_none() && self.children.is_empty()
    }
}

impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use crate::converters::{Converter, JsonConverter};
        JsonConverter::default().decode(self)
            .serialize(serializer)
    }
}

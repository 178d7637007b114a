//! JSON converter

use super::{Converter, DEFAULT_ATTR_KEY, DEFAULT_CHAR_KEY};
use crate::values::{Record, TypedValue};
use base64::Engine;
use chrono::SecondsFormat;
use serde_json::{Map, Number, Value as JsonValue};

/// Converter producing plain JSON values
#[derive(Debug, Clone)]
pub struct JsonConverter {
    attr_key: String,
    char_key: String,
}

impl Default for JsonConverter {
    fn default() -> Self {
        Self {
            attr_key: DEFAULT_ATTR_KEY.to_string(),
            char_key: DEFAULT_CHAR_KEY.to_string(),
        }
    }
}

impl JsonConverter {
    /// Create a converter with the default keys
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key used for grouped attributes
    pub fn with_attr_key(mut self, key: impl Into<String>) -> Self {
        self.attr_key = key.into();
        self
    }

    /// Set the key used for character content
    pub fn with_char_key(mut self, key: impl Into<String>) -> Self {
        self.char_key = key.into();
        self
    }

    /// Get the attribute key
    pub fn attr_key(&self) -> &str {
        &self.attr_key
    }

    /// Get the character content key
    pub fn char_key(&self) -> &str {
        &self.char_key
    }

    fn decode_record(&self, record: &Record) -> JsonValue {
        let mut map = Map::new();
        if !record.attributes.is_empty() {
            let attributes = record
                .attributes
                .iter()
                .map(|(name, value)| (name.clone(), self.decode(value)))
                .collect();
            map.insert(self.attr_key.clone(), JsonValue::Object(attributes));
        }
        if let Some(ref text) = record.text {
            map.insert(self.char_key.clone(), self.decode(text));
        }
        for (name, value) in &record.children {
            map.insert(name.clone(), self.decode(value));
        }
        JsonValue::Object(map)
    }
}

fn decode_double(value: f64) -> JsonValue {
    if value.is_nan() {
        JsonValue::String("NaN".to_string())
    } else if value.is_infinite() {
        let text = if value > 0.0 { "INF" } else { "-INF" };
        JsonValue::String(text.to_string())
    } else {
        Number::from_f64(value)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}

impl Converter for JsonConverter {
    fn decode(&self, value: &TypedValue) -> JsonValue {
        match value {
            TypedValue::String(s) => JsonValue::String(s.clone()),
            TypedValue::Integer(i) => JsonValue::Number((*i).into()),
            TypedValue::Decimal(d) => {
                let text = d.normalize().to_string();
                text.parse::<Number>()
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::String(text))
            }
            TypedValue::Double(f) => decode_double(*f),
            TypedValue::Boolean(b) => JsonValue::Bool(*b),
            TypedValue::DateTime(dt) => {
                JsonValue::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            TypedValue::Binary(bytes) => {
                JsonValue::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            TypedValue::Array(items) => {
                JsonValue::Array(items.iter().map(|item| self.decode(item)).collect())
            }
            TypedValue::Record(record) => self.decode_record(record),
        }
    }
}

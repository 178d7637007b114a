//! Converters from typed values to JSON
//!
//! The output convention follows the common xml2js layout: attributes are
//! grouped under an attribute key, character content lives under a
//! character key and children appear under their own names.

mod json;

pub use json::JsonConverter;

use crate::values::TypedValue;
use serde_json::Value as JsonValue;

/// Default key for grouped attributes
pub const DEFAULT_ATTR_KEY: &str = "$";

/// Default key for character content
pub const DEFAULT_CHAR_KEY: &str = "_";

/// Trait for converters that can decode typed values
pub trait Converter {
    /// Decode a typed value to a JSON value
    fn decode(&self, value: &TypedValue) -> JsonValue;

    /// Decode a document root, wrapping the value under the root's name
    fn decode_document(&self, root: &str, value: &TypedValue) -> JsonValue {
        let mut map = serde_json::Map::new();
        map.insert(root.to_string(), self.decode(value));
        JsonValue::Object(map)
    }
}

//! XSD built-in types
//!
//! This module defines the fixed table of built-in XSD types and the
//! coercion function each one applies to lexical content. Every built-in
//! lives in the XML Schema namespace, whichever prefix a schema document
//! uses to refer to it.

use crate::error::{Error, Result, ValidationError};
use crate::namespaces::{QName, XSD_NAMESPACE};
use crate::validators::helpers::{
    base64_binary_validator, big_int_to_rust, boolean_to_rust, byte_validator, date_to_rust,
    datetime_to_rust, decimal_validator, float_to_rust, hex_binary_validator, int_to_rust,
    int_validator, negative_int_validator, non_negative_int_validator,
    non_positive_int_validator, positive_int_validator, qname_validator, short_validator,
    unsigned_byte_validator, unsigned_int_validator, unsigned_short_validator, WhiteSpace,
};
use crate::values::TypedValue;
use once_cell::sync::Lazy;
use regex::Regex;

// =============================================================================
// Type Names
// =============================================================================

/// XSD string type name
pub const XSD_STRING: &str = "string";
/// XSD normalizedString type name
pub const XSD_NORMALIZED_STRING: &str = "normalizedString";
/// XSD token type name
pub const XSD_TOKEN: &str = "token";
/// XSD language type name
pub const XSD_LANGUAGE: &str = "language";
/// XSD Name type name
pub const XSD_NAME: &str = "Name";
/// XSD NCName type name
pub const XSD_NCNAME: &str = "NCName";
/// XSD ID type name
pub const XSD_ID: &str = "ID";
/// XSD IDREF type name
pub const XSD_IDREF: &str = "IDREF";
/// XSD IDREFS type name
pub const XSD_IDREFS: &str = "IDREFS";
/// XSD ENTITY type name
pub const XSD_ENTITY: &str = "ENTITY";
/// XSD ENTITIES type name
pub const XSD_ENTITIES: &str = "ENTITIES";
/// XSD NMTOKEN type name
pub const XSD_NMTOKEN: &str = "NMTOKEN";
/// XSD NMTOKENS type name
pub const XSD_NMTOKENS: &str = "NMTOKENS";

/// XSD boolean type name
pub const XSD_BOOLEAN: &str = "boolean";

/// XSD decimal type name
pub const XSD_DECIMAL: &str = "decimal";
/// XSD integer type name
pub const XSD_INTEGER: &str = "integer";
/// XSD long type name
pub const XSD_LONG: &str = "long";
/// XSD int type name
pub const XSD_INT: &str = "int";
/// XSD short type name
pub const XSD_SHORT: &str = "short";
/// XSD byte type name
pub const XSD_BYTE: &str = "byte";
/// XSD nonNegativeInteger type name
pub const XSD_NON_NEGATIVE_INTEGER: &str = "nonNegativeInteger";
/// XSD positiveInteger type name
pub const XSD_POSITIVE_INTEGER: &str = "positiveInteger";
/// XSD unsignedLong type name
pub const XSD_UNSIGNED_LONG: &str = "unsignedLong";
/// XSD unsignedInt type name
pub const XSD_UNSIGNED_INT: &str = "unsignedInt";
/// XSD unsignedShort type name
pub const XSD_UNSIGNED_SHORT: &str = "unsignedShort";
/// XSD unsignedByte type name
pub const XSD_UNSIGNED_BYTE: &str = "unsignedByte";
/// XSD nonPositiveInteger type name
pub const XSD_NON_POSITIVE_INTEGER: &str = "nonPositiveInteger";
/// XSD negativeInteger type name
pub const XSD_NEGATIVE_INTEGER: &str = "negativeInteger";

/// XSD float type name
pub const XSD_FLOAT: &str = "float";
/// XSD double type name
pub const XSD_DOUBLE: &str = "double";

/// XSD duration type name
pub const XSD_DURATION: &str = "duration";
/// XSD dateTime type name
pub const XSD_DATETIME: &str = "dateTime";
/// XSD time type name
pub const XSD_TIME: &str = "time";
/// XSD date type name
pub const XSD_DATE: &str = "date";
/// XSD gYearMonth type name
pub const XSD_GYEAR_MONTH: &str = "gYearMonth";
/// XSD gYear type name
pub const XSD_GYEAR: &str = "gYear";
/// XSD gMonthDay type name
pub const XSD_GMONTH_DAY: &str = "gMonthDay";
/// XSD gDay type name
pub const XSD_GDAY: &str = "gDay";
/// XSD gMonth type name
pub const XSD_GMONTH: &str = "gMonth";

/// XSD hexBinary type name
pub const XSD_HEX_BINARY: &str = "hexBinary";
/// XSD base64Binary type name
pub const XSD_BASE64_BINARY: &str = "base64Binary";

/// XSD anyURI type name
pub const XSD_ANY_URI: &str = "anyURI";
/// XSD QName type name
pub const XSD_QNAME: &str = "QName";
/// XSD NOTATION type name
pub const XSD_NOTATION: &str = "NOTATION";

/// XSD anyType type name
pub const XSD_ANY_TYPE: &str = "anyType";
/// XSD anySimpleType type name
pub const XSD_ANY_SIMPLE_TYPE: &str = "anySimpleType";

// =============================================================================
// Built-in Type Definition
// =============================================================================

/// Definition of a built-in XSD type
#[derive(Debug, Clone)]
pub struct BuiltinType {
    /// Type name (local name without namespace)
    pub name: &'static str,
    /// White space handling
    pub white_space: WhiteSpace,
    /// Coercion function
    coerce: fn(&str) -> Result<TypedValue>,
}

impl PartialEq for BuiltinType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl BuiltinType {
    /// Coerce lexical content to a typed value
    pub fn coerce(&self, value: &str) -> Result<TypedValue> {
        let normalized = self.white_space.normalize(value);
        (self.coerce)(&normalized).map_err(|err| match err {
            Error::Validation(e) => Error::Validation(
                ValidationError::coercion(format!("'{}' is not a valid xs:{}", value, self.name))
                    .with_reason(e.message),
            ),
            other => other,
        })
    }

    /// Qualified name of this type
    pub fn qname(&self) -> QName {
        QName::new(XSD_NAMESPACE, self.name)
    }
}

// =============================================================================
// Coercion Functions
// =============================================================================

fn coerce_string(value: &str) -> Result<TypedValue> {
    Ok(TypedValue::String(value.to_string()))
}

fn coerce_string_list(value: &str) -> Result<TypedValue> {
    Ok(TypedValue::Array(
        value
            .split_whitespace()
            .map(|item| TypedValue::String(item.to_string()))
            .collect(),
    ))
}

fn coerce_boolean(value: &str) -> Result<TypedValue> {
    boolean_to_rust(value).map(TypedValue::Boolean)
}

fn coerce_decimal(value: &str) -> Result<TypedValue> {
    decimal_validator(value).map(TypedValue::Decimal)
}

fn coerce_integer(value: &str) -> Result<TypedValue> {
    match int_to_rust(value) {
        Ok(i) => Ok(TypedValue::Integer(i)),
        Err(_) => big_int_to_rust(value).map(TypedValue::Decimal),
    }
}

fn coerce_ranged(value: &str, check: fn(i64) -> Result<()>) -> Result<TypedValue> {
    let i = int_to_rust(value)?;
    check(i)?;
    Ok(TypedValue::Integer(i))
}

fn coerce_long(value: &str) -> Result<TypedValue> {
    int_to_rust(value).map(TypedValue::Integer)
}

fn coerce_int(value: &str) -> Result<TypedValue> {
    coerce_ranged(value, int_validator)
}

fn coerce_short(value: &str) -> Result<TypedValue> {
    coerce_ranged(value, short_validator)
}

fn coerce_byte(value: &str) -> Result<TypedValue> {
    coerce_ranged(value, byte_validator)
}

fn coerce_non_negative_integer(value: &str) -> Result<TypedValue> {
    match coerce_integer(value)? {
        TypedValue::Integer(i) => non_negative_int_validator(i).map(|_| TypedValue::Integer(i)),
        TypedValue::Decimal(d) if d.is_sign_positive() => Ok(TypedValue::Decimal(d)),
        _ => Err(Error::Validation(ValidationError::coercion(
            "value must be non-negative",
        ))),
    }
}

fn coerce_positive_integer(value: &str) -> Result<TypedValue> {
    match coerce_non_negative_integer(value)? {
        TypedValue::Integer(i) => positive_int_validator(i).map(|_| TypedValue::Integer(i)),
        other => Ok(other),
    }
}

fn coerce_non_positive_integer(value: &str) -> Result<TypedValue> {
    coerce_ranged(value, non_positive_int_validator)
}

fn coerce_negative_integer(value: &str) -> Result<TypedValue> {
    coerce_ranged(value, negative_int_validator)
}

fn coerce_unsigned_int(value: &str) -> Result<TypedValue> {
    coerce_ranged(value, unsigned_int_validator)
}

fn coerce_unsigned_short(value: &str) -> Result<TypedValue> {
    coerce_ranged(value, unsigned_short_validator)
}

fn coerce_unsigned_byte(value: &str) -> Result<TypedValue> {
    coerce_ranged(value, unsigned_byte_validator)
}

fn coerce_float(value: &str) -> Result<TypedValue> {
    float_to_rust(value).map(TypedValue::Double)
}

fn coerce_datetime(value: &str) -> Result<TypedValue> {
    datetime_to_rust(value).map(TypedValue::DateTime)
}

fn coerce_date(value: &str) -> Result<TypedValue> {
    date_to_rust(value).map(TypedValue::DateTime)
}

fn coerce_hex_binary(value: &str) -> Result<TypedValue> {
    hex_binary_validator(value).map(TypedValue::Binary)
}

fn coerce_base64_binary(value: &str) -> Result<TypedValue> {
    base64_binary_validator(value).map(TypedValue::Binary)
}

fn coerce_qname(value: &str) -> Result<TypedValue> {
    qname_validator(value)?;
    Ok(TypedValue::String(value.to_string()))
}

const TIMEZONE: &str = r"(Z|[+-]\d{2}:\d{2})?";

static DURATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?P(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?$").unwrap()
});

static TIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^\d{{2}}:\d{{2}}:\d{{2}}(\.\d+)?{}$", TIMEZONE)).unwrap());

static GYEAR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^-?\d{{4,}}{}$", TIMEZONE)).unwrap());

static GYEAR_MONTH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^-?\d{{4,}}-\d{{2}}{}$", TIMEZONE)).unwrap());

static GMONTH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^--\d{{2}}{}$", TIMEZONE)).unwrap());

static GDAY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^---\d{{2}}{}$", TIMEZONE)).unwrap());

static GMONTH_DAY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^--\d{{2}}-\d{{2}}{}$", TIMEZONE)).unwrap());

fn lexical(value: &str, regex: &Regex) -> Result<TypedValue> {
    if !regex.is_match(value) {
        return Err(Error::Validation(ValidationError::coercion(
            "invalid lexical form",
        )));
    }
    Ok(TypedValue::String(value.to_string()))
}

fn coerce_duration(value: &str) -> Result<TypedValue> {
    if value.ends_with('P') || value.ends_with('T') {
        return Err(Error::Validation(ValidationError::coercion(
            "duration has no components",
        )));
    }
    lexical(value, &DURATION_REGEX)
}

fn coerce_time(value: &str) -> Result<TypedValue> {
    lexical(value, &TIME_REGEX)
}

fn coerce_gyear(value: &str) -> Result<TypedValue> {
    lexical(value, &GYEAR_REGEX)
}

fn coerce_gyear_month(value: &str) -> Result<TypedValue> {
    lexical(value, &GYEAR_MONTH_REGEX)
}

fn coerce_gmonth(value: &str) -> Result<TypedValue> {
    lexical(value, &GMONTH_REGEX)
}

fn coerce_gday(value: &str) -> Result<TypedValue> {
    lexical(value, &GDAY_REGEX)
}

fn coerce_gmonth_day(value: &str) -> Result<TypedValue> {
    lexical(value, &GMONTH_DAY_REGEX)
}

// =============================================================================
// Built-in Type Registry
// =============================================================================

macro_rules! builtin {
    ($name:expr, $white_space:ident, $coerce:expr) => {
        BuiltinType {
            name: $name,
            white_space: WhiteSpace::$white_space,
            coerce: $coerce,
        }
    };
}

lazy_static::lazy_static! {
    /// Registry of all built-in simple XSD types
    ///
    /// `anyType` is not listed here: it is a complex type and is seeded into
    /// the type registry separately.
    pub static ref BUILTIN_TYPES: Vec<BuiltinType> = vec![
        builtin!(XSD_ANY_SIMPLE_TYPE, Preserve, coerce_string),

        // String types
        builtin!(XSD_STRING, Preserve, coerce_string),
        builtin!(XSD_NORMALIZED_STRING, Replace, coerce_string),
        builtin!(XSD_TOKEN, Collapse, coerce_string),
        builtin!(XSD_LANGUAGE, Collapse, coerce_string),
        builtin!(XSD_NAME, Collapse, coerce_string),
        builtin!(XSD_NCNAME, Collapse, coerce_string),
        builtin!(XSD_ID, Collapse, coerce_string),
        builtin!(XSD_IDREF, Collapse, coerce_string),
        builtin!(XSD_ENTITY, Collapse, coerce_string),
        builtin!(XSD_NMTOKEN, Collapse, coerce_string),
        builtin!(XSD_NMTOKENS, Collapse, coerce_string_list),
        builtin!(XSD_IDREFS, Collapse, coerce_string_list),
        builtin!(XSD_ENTITIES, Collapse, coerce_string_list),

        builtin!(XSD_BOOLEAN, Collapse, coerce_boolean),

        // Decimal types
        builtin!(XSD_DECIMAL, Collapse, coerce_decimal),
        builtin!(XSD_INTEGER, Collapse, coerce_integer),
        builtin!(XSD_LONG, Collapse, coerce_long),
        builtin!(XSD_INT, Collapse, coerce_int),
        builtin!(XSD_SHORT, Collapse, coerce_short),
        builtin!(XSD_BYTE, Collapse, coerce_byte),
        builtin!(XSD_NON_NEGATIVE_INTEGER, Collapse, coerce_non_negative_integer),
        builtin!(XSD_POSITIVE_INTEGER, Collapse, coerce_positive_integer),
        builtin!(XSD_UNSIGNED_LONG, Collapse, coerce_non_negative_integer),
        builtin!(XSD_UNSIGNED_INT, Collapse, coerce_unsigned_int),
        builtin!(XSD_UNSIGNED_SHORT, Collapse, coerce_unsigned_short),
        builtin!(XSD_UNSIGNED_BYTE, Collapse, coerce_unsigned_byte),
        builtin!(XSD_NON_POSITIVE_INTEGER, Collapse, coerce_non_positive_integer),
        builtin!(XSD_NEGATIVE_INTEGER, Collapse, coerce_negative_integer),

        // Float types
        builtin!(XSD_FLOAT, Collapse, coerce_float),
        builtin!(XSD_DOUBLE, Collapse, coerce_float),

        // Binary types
        builtin!(XSD_HEX_BINARY, Collapse, coerce_hex_binary),
        builtin!(XSD_BASE64_BINARY, Collapse, coerce_base64_binary),

        // URI, QName and NOTATION
        builtin!(XSD_ANY_URI, Collapse, coerce_string),
        builtin!(XSD_QNAME, Collapse, coerce_qname),
        builtin!(XSD_NOTATION, Collapse, coerce_qname),

        // Date/time types
        builtin!(XSD_DATETIME, Collapse, coerce_datetime),
        builtin!(XSD_DATE, Collapse, coerce_date),
        builtin!(XSD_DURATION, Collapse, coerce_duration),
        builtin!(XSD_TIME, Collapse, coerce_time),
        builtin!(XSD_GYEAR, Collapse, coerce_gyear),
        builtin!(XSD_GYEAR_MONTH, Collapse, coerce_gyear_month),
        builtin!(XSD_GMONTH, Collapse, coerce_gmonth),
        builtin!(XSD_GDAY, Collapse, coerce_gday),
        builtin!(XSD_GMONTH_DAY, Collapse, coerce_gmonth_day),
    ];
}

/// Get a built-in type by local name
pub fn get_builtin_type(name: &str) -> Option<&'static BuiltinType> {
    BUILTIN_TYPES.iter().find(|t| t.name == name)
}

/// Coerce a value with a built-in type by local name
pub fn coerce_builtin(type_name: &str, value: &str) -> Result<TypedValue> {
    match get_builtin_type(type_name) {
        Some(builtin) => builtin.coerce(value),
        None => Err(Error::TypeNotFound {
            name: QName::xsd(type_name).to_string(),
            path: None,
        }),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationErrorKind;
    use rust_decimal::Decimal;

    #[test]
    fn test_string_types() {
        assert_eq!(
            coerce_builtin(XSD_STRING, " Hello World ").unwrap(),
            TypedValue::from(" Hello World ")
        );
        assert_eq!(
            coerce_builtin(XSD_TOKEN, " Hello \n World ").unwrap(),
            TypedValue::from("Hello World")
        );
        assert_eq!(
            coerce_builtin(XSD_NMTOKENS, "a  b\nc").unwrap(),
            TypedValue::Array(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn test_boolean_type() {
        assert_eq!(coerce_builtin(XSD_BOOLEAN, "true").unwrap(), TypedValue::Boolean(true));
        assert_eq!(coerce_builtin(XSD_BOOLEAN, " 0 ").unwrap(), TypedValue::Boolean(false));
        let err = coerce_builtin(XSD_BOOLEAN, "yes").unwrap_err();
        assert_eq!(err.validation_kind(), Some(ValidationErrorKind::CoercionFailed));
        assert!(err.to_string().contains("'yes' is not a valid xs:boolean"));
    }

    #[test]
    fn test_numeric_types() {
        assert_eq!(coerce_builtin(XSD_INTEGER, "123").unwrap(), TypedValue::Integer(123));
        assert!(coerce_builtin(XSD_INTEGER, "abc").is_err());
        assert!(matches!(
            coerce_builtin(XSD_INTEGER, "123456789012345678901234").unwrap(),
            TypedValue::Decimal(_)
        ));

        assert!(coerce_builtin(XSD_BYTE, "127").is_ok());
        assert!(coerce_builtin(XSD_BYTE, "128").is_err());
        assert!(coerce_builtin(XSD_UNSIGNED_BYTE, "-1").is_err());
        assert!(coerce_builtin(XSD_POSITIVE_INTEGER, "0").is_err());
        assert!(coerce_builtin(XSD_NEGATIVE_INTEGER, "1").is_err());
        assert!(coerce_builtin(XSD_UNSIGNED_LONG, "18446744073709551615").is_ok());
        assert!(coerce_builtin(XSD_UNSIGNED_LONG, "-5").is_err());
    }

    #[test]
    fn test_decimal_and_float_types() {
        assert_eq!(
            coerce_builtin(XSD_DECIMAL, "3.50").unwrap(),
            TypedValue::Decimal(Decimal::new(350, 2))
        );
        assert_eq!(coerce_builtin(XSD_DOUBLE, "INF").unwrap(), TypedValue::Double(f64::INFINITY));
        assert_eq!(coerce_builtin(XSD_FLOAT, "1.5").unwrap(), TypedValue::Double(1.5));
        assert!(coerce_builtin(XSD_FLOAT, "one").is_err());
    }

    #[test]
    fn test_binary_types() {
        assert_eq!(
            coerce_builtin(XSD_HEX_BINARY, "0A1B").unwrap(),
            TypedValue::Binary(vec![0x0a, 0x1b])
        );
        assert_eq!(
            coerce_builtin(XSD_BASE64_BINARY, "SGVsbG8=").unwrap(),
            TypedValue::Binary(b"Hello".to_vec())
        );
    }

    #[test]
    fn test_datetime_types() {
        assert!(matches!(
            coerce_builtin(XSD_DATETIME, "2024-01-15T10:30:00Z").unwrap(),
            TypedValue::DateTime(_)
        ));
        assert!(matches!(
            coerce_builtin(XSD_DATE, "2024-01-15").unwrap(),
            TypedValue::DateTime(_)
        ));
        assert!(coerce_builtin(XSD_DATETIME, "invalid").is_err());

        assert!(coerce_builtin(XSD_TIME, "10:30:00.123").is_ok());
        assert!(coerce_builtin(XSD_DURATION, "P1Y2M3DT4H5M6S").is_ok());
        assert!(coerce_builtin(XSD_DURATION, "P").is_err());
        assert!(coerce_builtin(XSD_DURATION, "P1DT").is_err());
        assert!(coerce_builtin(XSD_GYEAR_MONTH, "2024-01").is_ok());
        assert!(coerce_builtin(XSD_GMONTH_DAY, "--12-25").is_ok());
        assert!(coerce_builtin(XSD_GDAY, "--25").is_err());
    }

    #[test]
    fn test_qname_type() {
        assert!(coerce_builtin(XSD_QNAME, "prefix:localName").is_ok());
        assert!(coerce_builtin(XSD_QNAME, "").is_err());
    }

    #[test]
    fn test_get_builtin_type() {
        let int_type = get_builtin_type(XSD_INTEGER).unwrap();
        assert_eq!(int_type.qname(), QName::xsd("integer"));

        assert!(get_builtin_type(XSD_ANY_TYPE).is_none());
        assert!(matches!(
            coerce_builtin("unknownType", "x"),
            Err(Error::TypeNotFound { .. })
        ));
    }
}

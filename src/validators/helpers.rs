//! Coercion helper functions
//!
//! Lexical checks and conversions shared by the built-in type table.

use crate::error::{Error, Result, ValidationError};
use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

lazy_static::lazy_static! {
    /// XSD boolean value mapping (lowercase lexical forms)
    pub static ref XSD_BOOLEAN_MAP: HashMap<&'static str, bool> = {
        let mut m = HashMap::new();
        m.insert("false", false);
        m.insert("0", false);
        m.insert("true", true);
        m.insert("1", true);
        m
    };
}

fn coercion_error(message: String, value: impl std::fmt::Display) -> Error {
    Error::Validation(
        ValidationError::coercion(message).with_reason(format!("Actual value: {}", value)),
    )
}

// =============================================================================
// White Space
// =============================================================================

/// White space handling applied before coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace and collapse multiple spaces
    Collapse,
}

impl WhiteSpace {
    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => s.replace(['\t', '\n', '\r'], " "),
            WhiteSpace::Collapse => s.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validate a decimal value
pub fn decimal_validator(value: &str) -> Result<Decimal> {
    value
        .parse::<Decimal>()
        .map_err(|_| coercion_error("value is not a valid xs:decimal".to_string(), value))
}

fn range_validator(value: i64, min: i64, max: i64) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(coercion_error(
            format!("value must be {} <= x <= {}", min, max),
            value,
        ));
    }
    Ok(())
}

/// Validate a byte value (-128 to 127)
pub fn byte_validator(value: i64) -> Result<()> {
    range_validator(value, i8::MIN.into(), i8::MAX.into())
}

/// Validate a short value (-32768 to 32767)
pub fn short_validator(value: i64) -> Result<()> {
    range_validator(value, i16::MIN.into(), i16::MAX.into())
}

/// Validate an int value (-2^31 to 2^31-1)
pub fn int_validator(value: i64) -> Result<()> {
    range_validator(value, i32::MIN.into(), i32::MAX.into())
}

/// Validate an unsigned byte value (0 to 255)
pub fn unsigned_byte_validator(value: i64) -> Result<()> {
    range_validator(value, 0, u8::MAX.into())
}

/// Validate an unsigned short value (0 to 65535)
pub fn unsigned_short_validator(value: i64) -> Result<()> {
    range_validator(value, 0, u16::MAX.into())
}

/// Validate an unsigned int value (0 to 2^32-1)
pub fn unsigned_int_validator(value: i64) -> Result<()> {
    range_validator(value, 0, u32::MAX.into())
}

/// Validate a negative integer value (< 0)
pub fn negative_int_validator(value: i64) -> Result<()> {
    if value >= 0 {
        return Err(coercion_error("value must be negative".to_string(), value));
    }
    Ok(())
}

/// Validate a positive integer value (> 0)
pub fn positive_int_validator(value: i64) -> Result<()> {
    if value <= 0 {
        return Err(coercion_error("value must be positive".to_string(), value));
    }
    Ok(())
}

/// Validate a non-positive integer value (<= 0)
pub fn non_positive_int_validator(value: i64) -> Result<()> {
    if value > 0 {
        return Err(coercion_error("value must be non-positive".to_string(), value));
    }
    Ok(())
}

/// Validate a non-negative integer value (>= 0)
pub fn non_negative_int_validator(value: i64) -> Result<()> {
    if value < 0 {
        return Err(coercion_error("value must be non-negative".to_string(), value));
    }
    Ok(())
}

// =============================================================================
// Binary Validators
// =============================================================================

lazy_static::lazy_static! {
    static ref HEX_BINARY_REGEX: regex::Regex = regex::Regex::new(r"^([0-9a-fA-F]{2})*$").unwrap();
}

/// Validate a hex binary value
pub fn hex_binary_validator(value: &str) -> Result<Vec<u8>> {
    if !HEX_BINARY_REGEX.is_match(value) {
        return Err(coercion_error(
            "not a valid hexadecimal encoding".to_string(),
            value,
        ));
    }

    (0..value.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&value[i..i + 2], 16)
                .map_err(|_| coercion_error("invalid hex byte".to_string(), &value[i..i + 2]))
        })
        .collect()
}

/// Validate a base64 binary value
pub fn base64_binary_validator(value: &str) -> Result<Vec<u8>> {
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }

    base64::engine::general_purpose::STANDARD
        .decode(&cleaned)
        .map_err(|_| coercion_error("not a valid base64 encoding".to_string(), value))
}

// =============================================================================
// QName Validator
// =============================================================================

/// Validate a QName value
pub fn qname_validator(value: &str) -> Result<()> {
    if !crate::names::is_valid_qname(value) {
        return Err(coercion_error(
            "value is not a valid xs:QName".to_string(),
            value,
        ));
    }
    Ok(())
}

// =============================================================================
// Boolean Conversions
// =============================================================================

/// Convert XSD boolean string to Rust bool
pub fn boolean_to_rust(value: &str) -> Result<bool> {
    XSD_BOOLEAN_MAP
        .get(value.to_ascii_lowercase().as_str())
        .copied()
        .ok_or_else(|| coercion_error("value is not a valid xs:boolean".to_string(), value))
}

// =============================================================================
// Float Conversions
// =============================================================================

/// Convert XSD float string to Rust float
pub fn float_to_rust(value: &str) -> Result<f64> {
    match value.to_ascii_uppercase().as_str() {
        "NAN" => Ok(f64::NAN),
        "INF" | "+INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        // Rust accepts "inf" and "infinity", XSD does not
        upper if upper.contains("INF") => Err(coercion_error(
            "value is not a valid xs:double".to_string(),
            value,
        )),
        _ => value.parse::<f64>().map_err(|_| {
            coercion_error("value is not a valid xs:double".to_string(), value)
        }),
    }
}

// =============================================================================
// Integer Conversions
// =============================================================================

/// Convert XSD integer string to Rust int
pub fn int_to_rust(value: &str) -> Result<i64> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    digits
        .parse::<i64>()
        .map_err(|_| coercion_error("value is not a valid xs:integer".to_string(), value))
}

/// Convert an XSD integer beyond the i64 range to an exact decimal
pub fn big_int_to_rust(value: &str) -> Result<Decimal> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    if digits.is_empty()
        || !digits
            .trim_start_matches('-')
            .chars()
            .all(|c| c.is_ascii_digit())
    {
        return Err(coercion_error(
            "value is not a valid xs:integer".to_string(),
            value,
        ));
    }
    decimal_validator(digits)
}

// =============================================================================
// Date Conversions
// =============================================================================

/// Convert an XSD dateTime to a UTC timestamp
///
/// Values without a timezone are taken as UTC.
pub fn datetime_to_rust(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| coercion_error("value is not a valid xs:dateTime".to_string(), value))
}

/// Convert an XSD date to a UTC timestamp at the start of that day
pub fn date_to_rust(value: &str) -> Result<DateTime<Utc>> {
    let invalid = || coercion_error("value is not a valid xs:date".to_string(), value);

    let (date_part, offset) = if let Some(date) = value.strip_suffix('Z') {
        (date, Some(0))
    } else if value.len() > 10 {
        let split = value.len() - 6;
        let date = value.get(..split).ok_or_else(invalid)?;
        let zone = value.get(split..).ok_or_else(invalid)?;
        (date, Some(parse_offset(zone).ok_or_else(invalid)?))
    } else {
        (value, None)
    };

    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| invalid())?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
    match offset {
        Some(seconds) => FixedOffset::east_opt(seconds)
            .and_then(|tz| tz.from_local_datetime(&midnight).single())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(invalid),
        None => Ok(Utc.from_utc_datetime(&midnight)),
    }
}

/// Parse a `+hh:mm` / `-hh:mm` zone into seconds east of UTC
fn parse_offset(zone: &str) -> Option<i32> {
    let sign = match zone.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let (hours, minutes) = zone[1..].split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_byte_validator() {
        assert!(byte_validator(0).is_ok());
        assert!(byte_validator(-128).is_ok());
        assert!(byte_validator(127).is_ok());
        assert!(byte_validator(-129).is_err());
        assert!(byte_validator(128).is_err());
    }

    #[test]
    fn test_int_validator() {
        assert!(int_validator(0).is_ok());
        assert!(int_validator(-2147483648).is_ok());
        assert!(int_validator(2147483647).is_ok());
        assert!(int_validator(2147483648).is_err());
    }

    #[test]
    fn test_unsigned_validators() {
        assert!(unsigned_byte_validator(255).is_ok());
        assert!(unsigned_byte_validator(256).is_err());
        assert!(unsigned_short_validator(-1).is_err());
        assert!(unsigned_int_validator(4294967295).is_ok());
    }

    #[test]
    fn test_sign_validators() {
        assert!(negative_int_validator(-1).is_ok());
        assert!(negative_int_validator(0).is_err());
        assert!(positive_int_validator(1).is_ok());
        assert!(positive_int_validator(0).is_err());
        assert!(non_positive_int_validator(0).is_ok());
        assert!(non_negative_int_validator(-1).is_err());
    }

    #[test]
    fn test_hex_binary_validator() {
        assert_eq!(hex_binary_validator("").unwrap(), Vec::<u8>::new());
        assert_eq!(hex_binary_validator("0a1B").unwrap(), vec![0x0a, 0x1b]);
        assert!(hex_binary_validator("0").is_err());
        assert!(hex_binary_validator("GH").is_err());
    }

    #[test]
    fn test_base64_binary_validator() {
        assert_eq!(base64_binary_validator("SGVs bG8=").unwrap(), b"Hello".to_vec());
        assert!(base64_binary_validator("!!!").is_err());
    }

    #[test]
    fn test_boolean_conversion() {
        assert!(boolean_to_rust("true").unwrap());
        assert!(boolean_to_rust("TRUE").unwrap());
        assert!(!boolean_to_rust("0").unwrap());
        assert!(boolean_to_rust("yes").is_err());
    }

    #[test]
    fn test_float_conversion() {
        assert!(float_to_rust("NaN").unwrap().is_nan());
        assert_eq!(float_to_rust("INF").unwrap(), f64::INFINITY);
        assert_eq!(float_to_rust("-inf").unwrap(), f64::NEG_INFINITY);
        assert_eq!(float_to_rust("1.5e2").unwrap(), 150.0);
        assert!(float_to_rust("infinity").is_err());
        assert!(float_to_rust("abc").is_err());
    }

    #[test]
    fn test_int_conversion() {
        assert_eq!(int_to_rust("+12").unwrap(), 12);
        assert_eq!(int_to_rust("-456").unwrap(), -456);
        assert!(int_to_rust("1.0").is_err());
        assert!(big_int_to_rust("18446744073709551615").is_ok());
        assert!(big_int_to_rust("12a").is_err());
    }

    #[test]
    fn test_datetime_conversion() {
        let dt = datetime_to_rust("2020-01-02T03:04:05+01:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2020-01-02T02:04:05+00:00");
        let naive = datetime_to_rust("2020-01-02T03:04:05.250").unwrap();
        assert_eq!(naive.timestamp_subsec_millis(), 250);
        assert!(datetime_to_rust("2020-01-02").is_err());
    }

    #[test]
    fn test_date_conversion() {
        let date = date_to_rust("2020-03-04").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2020, 3, 4));
        let shifted = date_to_rust("2020-03-04+02:00").unwrap();
        assert_eq!(shifted.to_rfc3339(), "2020-03-03T22:00:00+00:00");
        assert!(date_to_rust("2020-03-04Z").is_ok());
        assert!(date_to_rust("04/03/2020").is_err());
        assert!(date_to_rust("€€€€é").is_err());
        assert!(date_to_rust("2020-03-04+0€").is_err());
    }

    #[test]
    fn test_white_space() {
        assert_eq!(WhiteSpace::Collapse.normalize("  a \n b  "), "a b");
        assert_eq!(WhiteSpace::Replace.normalize("a\tb"), "a b");
        assert_eq!(WhiteSpace::Preserve.normalize(" a "), " a ");
    }
}

//! Error types for xmlxsd
//!
//! This module defines all error types used throughout the library.
//! Every error is fatal to the operation in progress: a schema compile,
//! a dependency-resolution round or a document validation.

use std::fmt;
use thiserror::Error;

/// Result type alias using xmlxsd Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xmlxsd operations
#[derive(Error, Debug)]
pub enum Error {
    /// A prefixed name used a prefix with no namespace binding
    #[error("unknown namespace prefix '{prefix}' in name '{name}'")]
    UnknownNamespacePrefix {
        /// The unbound prefix
        prefix: String,
        /// The full lexical name
        name: String,
    },

    /// An unprefixed name had no default namespace to qualify against
    #[error("unqualified name '{0}' and no default namespace")]
    UnqualifiedNameNoDefault(String),

    /// Schema document could not be compiled
    #[error("invalid schema: {0}")]
    InvalidSchema(#[from] ParseError),

    /// Dangling type reference
    #[error("type {name} not found{}", at_path(.path))]
    TypeNotFound {
        /// Qualified type name
        name: String,
        /// Document path being validated, if any
        path: Option<String>,
    },

    /// Dangling attribute reference
    #[error("referenced attribute {name} not found{}", at_path(.path))]
    AttributeNotFound {
        /// Qualified attribute name
        name: String,
        /// Document path being validated, if any
        path: Option<String>,
    },

    /// Dangling element reference
    #[error("referenced element {name} not found{}", at_path(.path))]
    ElementNotFound {
        /// Qualified element name
        name: String,
        /// Document path being validated, if any
        path: Option<String>,
    },

    /// Strict mode found a namespace without any compiled schema
    #[error(
        "schema {namespace} ({}) unavailable and automatic downloading not enabled",
        .locations.join(", ")
    )]
    SchemaUnavailable {
        /// Namespace required by the document
        namespace: String,
        /// Locations hinted by the document
        locations: Vec<String>,
    },

    /// Network error or non-200 status while fetching a schema
    #[error("error downloading {namespace} schema ({url}): {reason}")]
    DependencyFetchFailed {
        /// Namespace the schema was fetched for
        namespace: String,
        /// Location that was fetched
        url: String,
        /// Transport error or HTTP status
        reason: String,
    },

    /// Document does not match the compiled schemas
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

fn at_path(path: &Option<String>) -> String {
    match path {
        Some(path) => format!(", xpath: {}", path),
        None => String::new(),
    }
}

impl Error {
    /// Attach a document path to errors that carry one, unless already set
    pub fn at_path(self, xpath: &str) -> Self {
        match self {
            Error::TypeNotFound { name, path: None } => Error::TypeNotFound {
                name,
                path: Some(xpath.to_string()),
            },
            Error::AttributeNotFound { name, path: None } => Error::AttributeNotFound {
                name,
                path: Some(xpath.to_string()),
            },
            Error::ElementNotFound { name, path: None } => Error::ElementNotFound {
                name,
                path: Some(xpath.to_string()),
            },
            Error::Validation(err) if err.path.is_none() => {
                Error::Validation(err.with_path(xpath))
            }
            other => other,
        }
    }

    /// The validation kind, if this is a document validation error
    pub fn validation_kind(&self) -> Option<ValidationErrorKind> {
        match self {
            Error::Validation(err) => Some(err.kind),
            _ => None,
        }
    }

    /// Shorthand for an `InvalidSchema` error with only a message
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Error::InvalidSchema(ParseError::new(message))
    }
}

/// Kinds of structural and content mismatches found while walking a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    /// Element name not allowed at this position
    UnknownElement,
    /// Element declaration names no type
    TypeNotSpecified,
    /// Type declares neither children nor a wildcard
    TypeHasNoChildren,
    /// Attribute not declared on the effective type
    UnexpectedAttribute,
    /// Attribute value failed coercion
    InvalidAttributeValue,
    /// Element content where a scalar value was expected
    UnexpectedChildren,
    /// Singular child occurred more than once
    CardinalityMismatch,
    /// Every coercion candidate failed
    CoercionFailed,
}

impl ValidationErrorKind {
    /// Stable name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationErrorKind::UnknownElement => "UnknownElement",
            ValidationErrorKind::TypeNotSpecified => "TypeNotSpecified",
            ValidationErrorKind::TypeHasNoChildren => "TypeHasNoChildren",
            ValidationErrorKind::UnexpectedAttribute => "UnexpectedAttribute",
            ValidationErrorKind::InvalidAttributeValue => "InvalidAttributeValue",
            ValidationErrorKind::UnexpectedChildren => "UnexpectedChildren",
            ValidationErrorKind::CardinalityMismatch => "CardinalityMismatch",
            ValidationErrorKind::CoercionFailed => "CoercionFailed",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// XML document validation error with context
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// What went wrong
    pub kind: ValidationErrorKind,
    /// Error message
    pub message: String,
    /// Qualified path to the element that failed validation
    pub path: Option<String>,
    /// Registry excerpt relevant to the failure
    pub schema_component: Option<String>,
    /// XML instance snippet
    pub instance: Option<String>,
    /// Underlying reason
    pub reason: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: None,
            schema_component: None,
            instance: None,
            reason: None,
        }
    }

    /// Shorthand for a coercion failure
    pub fn coercion(message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::CoercionFailed, message)
    }

    /// Set the path where validation failed
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the schema component
    pub fn with_schema_component(mut self, component: impl Into<String>) -> Self {
        self.schema_component = Some(component.into());
        self
    }

    /// Set the instance snippet
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;

        if let Some(ref reason) = self.reason {
            write!(f, "\n\nReason: {}", reason)?;
        }

        if let Some(ref path) = self.path {
            write!(f, "\n\nPath: {}", path)?;
        }

        if let Some(ref schema) = self.schema_component {
            write!(f, "\n\nSchema:\n{}", schema)?;
        }

        if let Some(ref instance) = self.instance {
            write!(f, "\n\nInstance:\n{}", instance)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// XML Schema compilation error
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Namespace or location of the schema being compiled
    pub location: Option<String>,
    /// Schema source that caused the error
    pub source: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            source: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref loc) = self.location {
            write!(f, "\n\nLocation: {}", loc)?;
        }

        if let Some(ref src) = self.source {
            write!(f, "\n\nSource:\n{}", src)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new(
            ValidationErrorKind::UnknownElement,
            "Element ({urn:a}foo) does not match schema",
        )
        .with_reason("no declaration")
        .with_path("/{urn:a}root/{urn:a}foo")
        .with_schema_component("allowed elements: {urn:a}bar");

        let msg = format!("{}", err);
        assert!(msg.starts_with("UnknownElement: Element"));
        assert!(msg.contains("Reason:"));
        assert!(msg.contains("Path: /{urn:a}root/{urn:a}foo"));
        assert!(msg.contains("Schema:"));
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("unrecognized schema content")
            .with_location("urn:a")
            .with_source("xs:redefine");

        let msg = format!("{}", err);
        assert!(msg.contains("unrecognized schema content"));
        assert!(msg.contains("Location: urn:a"));
        assert!(msg.contains("Source:"));
    }

    #[test]
    fn test_error_conversion() {
        let val_err = ValidationError::coercion("test");
        let err: Error = val_err.into();
        assert_eq!(err.validation_kind(), Some(ValidationErrorKind::CoercionFailed));
    }

    #[test]
    fn test_at_path_fills_missing_path_only() {
        let err = Error::TypeNotFound {
            name: "{urn:a}T".to_string(),
            path: None,
        }
        .at_path("/{urn:a}root");
        assert_eq!(
            err.to_string(),
            "type {urn:a}T not found, xpath: /{urn:a}root"
        );

        let err = Error::Validation(
            ValidationError::coercion("bad").with_path("/first"),
        )
        .at_path("/second");
        match err {
            Error::Validation(e) => assert_eq!(e.path.as_deref(), Some("/first")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_schema_unavailable_lists_locations() {
        let err = Error::SchemaUnavailable {
            namespace: "urn:a".to_string(),
            locations: vec!["a.xsd".to_string(), "b.xsd".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "schema urn:a (a.xsd, b.xsd) unavailable and automatic downloading not enabled"
        );
    }
}

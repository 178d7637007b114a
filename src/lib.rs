//! # xmlxsd
//!
//! Compile XML Schema (XSD) documents into a type registry and turn XML
//! documents into typed values.
//!
//! ## Features
//!
//! - Schema compiler for the common XSD declarations (elements, attributes,
//!   simple and complex types, extension, restriction, lists, unions)
//! - Type resolution over derivation chains, with ordered backtracking over
//!   union members
//! - Document validation: unknown elements, undeclared attributes and
//!   cardinality mismatches are reported with their qualified path
//! - Typed output: integers, decimals, booleans, dates and binary values
//!   instead of strings; singular children collapsed out of sequences
//! - Schema dependency discovery from `xsi:schemaLocation`, `import` and
//!   `include`, fetched in parallel rounds (local files, or HTTP with the
//!   `http` feature)
//! - JSON conversion in the xml2js layout
//!
//! ## Example
//!
//! ```rust,ignore
//! use xmlxsd::{ParseOptions, SchemaParser};
//!
//! let parser = SchemaParser::new();
//! parser.add_schema("urn:order", &std::fs::read_to_string("order.xsd")?)?;
//!
//! let options = ParseOptions::default();
//! let parsed = parser.parse_document(&std::fs::read_to_string("order.xml")?, &options)?;
//! println!("{}", parsed.to_json(&options));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Utilities
pub mod namespaces;
pub mod names;
pub mod locations;

// Resource loading
pub mod loaders;
pub mod documents;

// Schema model, compilation and validation
pub mod validators;

// Output
pub mod values;
pub mod converters;

// Configuration and entry point
pub mod settings;
pub mod parser;

// Re-exports for convenience
pub use error::{Error, ParseError, Result, ValidationError, ValidationErrorKind};
pub use limits::Limits;
pub use loaders::{FetchResponse, Loader, MemoryFetcher, SchemaFetcher};
pub use namespaces::QName;
pub use parser::SchemaParser;
pub use settings::{ParseOptions, Settings};
pub use validators::{ParsedDocument, SchemaLocations, TypeRegistry};
pub use values::{Record, TypedValue};

/// Version of the xmlxsd library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use namespaces::{XML_NAMESPACE, XMLNS_NAMESPACE, XSD_NAMESPACE, XSI_NAMESPACE};

//! XML Schema validators
//!
//! This module contains the schema model, the schema compiler, type
//! resolution and the document validator.

// Type system
pub mod builtins;
pub mod helpers;
pub mod simple_types;
pub mod attributes;
pub mod elements;
pub mod complex_types;
pub mod globals;

// Registry and compilation
pub mod schemas;
pub mod parsing;
pub mod imports;

// Resolution and validation
pub mod resolution;
pub mod validation;

// Re-exports
pub use attributes::{AttributeDef, AttributeSet};
pub use builtins::{get_builtin_type, BuiltinType};
pub use complex_types::{ChildContent, ComplexType};
pub use elements::{ElementDef, ElementSet, ResolvedElement};
pub use globals::TypeDef;
pub use imports::{check_available, find_schema_locations, DependencyResolver, SchemaLocations};
pub use parsing::compile_schema;
pub use resolution::{try_parse, Coercer, ConcreteType, ElementScope};
pub use schemas::{SchemaComponents, TypeRegistry};
pub use simple_types::{SimpleBase, SimpleType};
pub use validation::{DocumentValidator, ParsedDocument};

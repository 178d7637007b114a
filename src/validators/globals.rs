//! Global type definitions
//!
//! Every named type in the registry is one of three shapes: a built-in
//! scalar type with its own coercion, a user simple type deriving from other
//! types, or a complex type with element and attribute content.

use super::builtins::BuiltinType;
use super::complex_types::ComplexType;
use super::simple_types::SimpleType;
use crate::namespaces::QName;

/// A named type in the registry
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    /// A built-in XSD scalar type
    BuiltIn(&'static BuiltinType),
    /// A user-defined simple type
    Simple(SimpleType),
    /// A complex type
    Complex(ComplexType),
}

impl TypeDef {
    /// Base types this type derives from, in declaration order
    ///
    /// Empty for built-ins and for complex types without a derivation.
    pub fn bases(&self) -> Vec<&QName> {
        match self {
            TypeDef::BuiltIn(_) => Vec::new(),
            TypeDef::Simple(simple) => simple.bases(),
            TypeDef::Complex(complex) => complex.base.iter().collect(),
        }
    }

    /// Get the complex type, if this is one
    pub fn as_complex(&self) -> Option<&ComplexType> {
        match self {
            TypeDef::Complex(complex) => Some(complex),
            _ => None,
        }
    }

    /// Short name of the type shape
    pub fn kind(&self) -> &'static str {
        match self {
            TypeDef::BuiltIn(_) => "builtin",
            TypeDef::Simple(_) => "simple",
            TypeDef::Complex(_) => "complex",
        }
    }
}

impl From<SimpleType> for TypeDef {
    fn from(simple: SimpleType) -> Self {
        TypeDef::Simple(simple)
    }
}

impl From<ComplexType> for TypeDef {
    fn from(complex: ComplexType) -> Self {
        TypeDef::Complex(complex)
    }
}

//! XSD attribute declarations

use crate::namespaces::QName;
use indexmap::IndexMap;

/// An attribute declaration, either a reference or typed inline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeDef {
    /// `attribute ref="..."` pointing at a global attribute
    Reference {
        /// Referenced global attribute
        target: QName,
    },
    /// `attribute name="..." type="..."` (or with an anonymous simple type)
    Typed {
        /// Type of the attribute value
        type_name: QName,
    },
}

impl AttributeDef {
    /// Reference to a global attribute
    pub fn reference(target: QName) -> Self {
        AttributeDef::Reference { target }
    }

    /// Attribute with a named value type
    pub fn typed(type_name: QName) -> Self {
        AttributeDef::Typed { type_name }
    }
}

/// Attributes declared on a type, keyed by qualified name
pub type AttributeSet = IndexMap<QName, AttributeDef>;

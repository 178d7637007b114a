//! XSD element declarations
//!
//! An element member of a content model is either a reference to a global
//! element or an inline definition. References carry the array-ness implied
//! by the position they occur at; definitions carry their own.

use crate::namespaces::QName;
use indexmap::IndexMap;

/// An element declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementDef {
    /// `element ref="..."`
    Reference {
        /// Referenced global element
        target: QName,
        /// Array-ness implied by the referencing position, if known
        array_default: Option<bool>,
    },
    /// `element name="..."` with a named or lifted anonymous type
    Definition {
        /// Declared type; `None` when the declaration names no type
        type_name: Option<QName>,
        /// Declared array-ness, if known
        is_array: Option<bool>,
    },
}

impl ElementDef {
    /// Inline definition of the given type
    pub fn definition(type_name: QName, is_array: Option<bool>) -> Self {
        ElementDef::Definition {
            type_name: Some(type_name),
            is_array,
        }
    }

    /// Reference to a global element
    pub fn reference(target: QName, array_default: Option<bool>) -> Self {
        ElementDef::Reference {
            target,
            array_default,
        }
    }
}

/// Element declarations keyed by qualified name, in declaration order
pub type ElementSet = IndexMap<QName, ElementDef>;

/// An element declaration with all references followed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedElement {
    /// Declared type, if any
    pub type_name: Option<QName>,
    /// Effective array-ness, if known
    pub is_array: Option<bool>,
}

impl ResolvedElement {
    /// Whether occurrences of this element are collected into a sequence
    pub fn is_multi_valued(&self) -> bool {
        self.is_array.unwrap_or(false)
    }
}

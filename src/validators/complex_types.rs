//! XSD complex type definitions

use super::attributes::AttributeSet;
use super::elements::ElementSet;
use crate::namespaces::QName;

/// Element content allowed by a complex type
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChildContent {
    /// No content model declared
    #[default]
    Empty,
    /// A fixed set of member elements
    Elements(ElementSet),
    /// An `any` wildcard, alongside any explicitly declared members
    Wildcard {
        /// Array-ness of the wildcard, applied to every child
        is_array: Option<bool>,
        /// Members declared next to the wildcard
        declared: ElementSet,
    },
}

impl ChildContent {
    /// Declared member elements, if any
    pub fn elements(&self) -> Option<&ElementSet> {
        match self {
            ChildContent::Empty => None,
            ChildContent::Elements(set) => Some(set),
            ChildContent::Wildcard { declared, .. } => Some(declared),
        }
    }

    /// Whether a wildcard is declared
    pub fn has_wildcard(&self) -> bool {
        matches!(self, ChildContent::Wildcard { .. })
    }

    /// Whether the content model admits any child element at all
    pub fn admits_children(&self) -> bool {
        match self {
            ChildContent::Empty => false,
            ChildContent::Elements(set) => !set.is_empty(),
            ChildContent::Wildcard { .. } => true,
        }
    }
}

/// A user-defined (or the built-in `anyType`) complex type
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComplexType {
    /// Base type of a `simpleContent` / `complexContent` derivation
    pub base: Option<QName>,
    /// Derived by restriction rather than extension
    pub is_restriction: bool,
    /// Element content
    pub content: ChildContent,
    /// Declared attributes
    pub attributes: AttributeSet,
    /// Undeclared attributes are accepted (`anyAttribute`)
    pub any_attributes: bool,
    /// Character content is allowed between children
    pub mixed: bool,
}

impl ComplexType {
    /// Create an empty complex type
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in `anyType`: any children, any attributes, mixed content
    pub fn any_type() -> Self {
        Self {
            content: ChildContent::Wildcard {
                is_array: None,
                declared: ElementSet::new(),
            },
            any_attributes: true,
            mixed: true,
            ..Self::default()
        }
    }

    /// Declared member elements, if any
    pub fn children(&self) -> Option<&ElementSet> {
        self.content.elements()
    }

    /// Whether a wildcard is declared
    pub fn any_children(&self) -> bool {
        self.content.has_wildcard()
    }

    /// Array-ness of the wildcard, if one is declared
    pub fn array_hint(&self) -> Option<bool> {
        match self.content {
            ChildContent::Wildcard { is_array, .. } => is_array,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::elements::ElementDef;

    #[test]
    fn test_any_type() {
        let any = ComplexType::any_type();
        assert!(any.any_children());
        assert!(any.any_attributes);
        assert!(any.content.admits_children());
        assert_eq!(any.array_hint(), None);
    }

    #[test]
    fn test_content_accessors() {
        let mut set = ElementSet::new();
        set.insert(QName::new("urn:a", "x"), ElementDef::definition(QName::xsd("string"), None));
        let content = ChildContent::Elements(set);
        assert_eq!(content.elements().map(|s| s.len()), Some(1));
        assert!(!content.has_wildcard());
        assert!(!ChildContent::Empty.admits_children());
        assert!(!ChildContent::Elements(ElementSet::new()).admits_children());
    }
}

//! XSD simple type definitions
//!
//! Facets are not enforced, so a simple type only records what it derives
//! from: a single base by restriction, several member types by union, or an
//! item type by list.

use crate::namespaces::QName;

/// How a simple type derives its value space
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleBase {
    /// `restriction base="..."`
    Restriction(QName),
    /// `union memberTypes="..."`, tried in declaration order
    Union(Vec<QName>),
    /// `list itemType="..."`
    List(QName),
}

/// A user-defined simple type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleType {
    /// Derivation of this type
    pub base: SimpleBase,
}

impl SimpleType {
    /// Simple type restricting a single base
    pub fn restriction(base: QName) -> Self {
        Self {
            base: SimpleBase::Restriction(base),
        }
    }

    /// Simple type accepting any of several member types
    pub fn union(members: Vec<QName>) -> Self {
        Self {
            base: SimpleBase::Union(members),
        }
    }

    /// Simple type holding a whitespace-separated list of items
    pub fn list(item_type: QName) -> Self {
        Self {
            base: SimpleBase::List(item_type),
        }
    }

    /// Names of the types this one derives from, in order
    pub fn bases(&self) -> Vec<&QName> {
        match &self.base {
            SimpleBase::Restriction(base) | SimpleBase::List(base) => vec![base],
            SimpleBase::Union(members) => members.iter().collect(),
        }
    }

    /// Check whether this is a list type
    pub fn is_list(&self) -> bool {
        matches!(self.base, SimpleBase::List(_))
    }
}

//! The type registry
//!
//! [`TypeRegistry`] owns every compiled declaration: named types, global
//! elements and global attributes, all keyed by qualified name. It starts
//! seeded with the built-in types and only grows: compiled schemas overlay
//! their declarations, nothing is ever removed.
//!
//! The registry also remembers which schema texts were compiled for each
//! namespace, and which (namespace, location) pairs were already fetched.

use indexmap::{IndexMap, IndexSet};

use super::attributes::{AttributeDef, AttributeSet};
use super::builtins::{BUILTIN_TYPES, XSD_ANY_TYPE};
use super::complex_types::ComplexType;
use super::elements::{ElementDef, ElementSet};
use super::globals::TypeDef;
use super::imports::SchemaLocations;
use crate::error::{Error, Result};
use crate::namespaces::QName;

/// Declarations produced by compiling one schema document
#[derive(Debug, Clone, Default)]
pub struct SchemaComponents {
    /// Named types, including lifted anonymous ones
    pub types: IndexMap<QName, TypeDef>,
    /// Global elements
    pub elements: ElementSet,
    /// Global attributes
    pub attributes: AttributeSet,
}

impl SchemaComponents {
    /// Create an empty set of components
    pub fn new() -> Self {
        Self::default()
    }
}

/// Registry of compiled schema declarations
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: IndexMap<QName, TypeDef>,
    elements: ElementSet,
    attributes: AttributeSet,
    /// Compiled schema texts per namespace
    parsed_schemas: IndexMap<String, IndexSet<String>>,
    /// Locations already fetched per namespace
    downloaded: SchemaLocations,
    anonymous_types: usize,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create a registry holding only the built-in types
    pub fn new() -> Self {
        let mut types = IndexMap::new();
        for builtin in BUILTIN_TYPES.iter() {
            types.insert(builtin.qname(), TypeDef::BuiltIn(builtin));
        }
        types.insert(
            QName::xsd(XSD_ANY_TYPE),
            TypeDef::Complex(ComplexType::any_type()),
        );

        Self {
            types,
            elements: ElementSet::new(),
            attributes: AttributeSet::new(),
            parsed_schemas: IndexMap::new(),
            downloaded: SchemaLocations::new(),
            anonymous_types: 0,
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Look up a type by qualified name
    pub fn lookup_type(&self, name: &QName) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Look up a global element by qualified name
    pub fn lookup_element(&self, name: &QName) -> Option<&ElementDef> {
        self.elements.get(name)
    }

    /// Look up a global attribute by qualified name
    pub fn lookup_attribute(&self, name: &QName) -> Option<&AttributeDef> {
        self.attributes.get(name)
    }

    /// Get a type, failing with `TypeNotFound`
    pub fn get_type(&self, name: &QName) -> Result<&TypeDef> {
        self.lookup_type(name).ok_or_else(|| Error::TypeNotFound {
            name: name.to_string(),
            path: None,
        })
    }

    /// Get a global element, failing with `ElementNotFound`
    pub fn get_element(&self, name: &QName) -> Result<&ElementDef> {
        self.lookup_element(name).ok_or_else(|| Error::ElementNotFound {
            name: name.to_string(),
            path: None,
        })
    }

    /// Get a global attribute, failing with `AttributeNotFound`
    pub fn get_attribute(&self, name: &QName) -> Result<&AttributeDef> {
        self.lookup_attribute(name)
            .ok_or_else(|| Error::AttributeNotFound {
                name: name.to_string(),
                path: None,
            })
    }

    /// All named types
    pub fn types(&self) -> &IndexMap<QName, TypeDef> {
        &self.types
    }

    /// All global elements
    pub fn elements(&self) -> &ElementSet {
        &self.elements
    }

    /// All global attributes
    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    /// Number of named types, built-ins included
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Number of global elements
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Number of global attributes
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    // =========================================================================
    // Compiled and fetched schemas
    // =========================================================================

    /// Check whether this exact schema text was compiled for `namespace`
    pub fn is_compiled(&self, namespace: &str, text: &str) -> bool {
        self.parsed_schemas
            .get(namespace)
            .is_some_and(|texts| texts.contains(text))
    }

    /// Check whether any schema was compiled for `namespace`
    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.parsed_schemas
            .get(namespace)
            .is_some_and(|texts| !texts.is_empty())
    }

    /// Compiled schema texts per namespace
    pub fn known_schemas(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.parsed_schemas
    }

    /// Total number of compiled schema documents
    pub fn schema_count(&self) -> usize {
        self.parsed_schemas.values().map(IndexSet::len).sum()
    }

    /// Record that `location` was fetched for `namespace`
    ///
    /// Returns `false` if the pair was already recorded.
    pub fn mark_downloaded(&mut self, namespace: &str, location: &str) -> bool {
        self.downloaded.add(namespace, location)
    }

    /// Check whether `location` was already fetched for `namespace`
    pub fn is_downloaded(&self, namespace: &str, location: &str) -> bool {
        self.downloaded.contains(namespace, location)
    }

    /// Fetched locations per namespace
    pub fn downloaded(&self) -> &SchemaLocations {
        &self.downloaded
    }

    // =========================================================================
    // Population
    // =========================================================================

    /// Synthesize a unique name for an anonymous type declared under `owner`
    pub fn next_anonymous_name(&mut self, owner: &QName) -> QName {
        self.anonymous_types += 1;
        QName::new(
            owner.namespace.clone(),
            format!("{}-type-{}", owner.local_name, self.anonymous_types),
        )
    }

    /// Overlay compiled components and record the schema text as compiled
    pub fn merge(&mut self, namespace: &str, text: &str, components: SchemaComponents) {
        self.types.extend(components.types);
        self.elements.extend(components.elements);
        self.attributes.extend(components.attributes);
        self.parsed_schemas
            .entry(namespace.to_string())
            .or_default()
            .insert(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::simple_types::SimpleType;

    #[test]
    fn test_seeded_builtins() {
        let registry = TypeRegistry::new();
        assert!(matches!(
            registry.lookup_type(&QName::xsd("string")),
            Some(TypeDef::BuiltIn(_))
        ));
        let any = registry.get_type(&QName::xsd("anyType")).unwrap();
        assert!(any.as_complex().is_some_and(|c| c.any_children()));
        assert_eq!(registry.element_count(), 0);
        assert_eq!(registry.schema_count(), 0);
    }

    #[test]
    fn test_missing_lookups() {
        let registry = TypeRegistry::new();
        let name = QName::new("urn:a", "missing");
        assert!(matches!(
            registry.get_type(&name),
            Err(Error::TypeNotFound { .. })
        ));
        assert!(matches!(
            registry.get_element(&name),
            Err(Error::ElementNotFound { .. })
        ));
        assert!(matches!(
            registry.get_attribute(&name),
            Err(Error::AttributeNotFound { .. })
        ));
    }

    #[test]
    fn test_merge_overlays() {
        let mut registry = TypeRegistry::new();
        let name = QName::new("urn:a", "Code");

        let mut first = SchemaComponents::new();
        first
            .types
            .insert(name.clone(), SimpleType::restriction(QName::xsd("string")).into());
        registry.merge("urn:a", "<first/>", first);

        let mut second = SchemaComponents::new();
        second
            .types
            .insert(name.clone(), SimpleType::restriction(QName::xsd("int")).into());
        registry.merge("urn:a", "<second/>", second);

        assert_eq!(
            registry.lookup_type(&name),
            Some(&TypeDef::Simple(SimpleType::restriction(QName::xsd("int"))))
        );
        assert!(registry.is_compiled("urn:a", "<first/>"));
        assert!(registry.has_namespace("urn:a"));
        assert!(!registry.has_namespace("urn:b"));
        assert_eq!(registry.schema_count(), 2);
    }

    #[test]
    fn test_downloaded() {
        let mut registry = TypeRegistry::new();
        assert!(registry.mark_downloaded("urn:a", "a.xsd"));
        assert!(!registry.mark_downloaded("urn:a", "a.xsd"));
        assert!(registry.is_downloaded("urn:a", "a.xsd"));
        assert!(!registry.is_downloaded("urn:a", "b.xsd"));
    }

    #[test]
    fn test_anonymous_names_are_unique() {
        let mut registry = TypeRegistry::new();
        let owner = QName::new("urn:a", "item");
        let first = registry.next_anonymous_name(&owner);
        let second = registry.next_anonymous_name(&owner);
        assert_ne!(first, second);
        assert_eq!(first.namespace, "urn:a");
        assert!(first.local_name.starts_with("item-type-"));
    }
}

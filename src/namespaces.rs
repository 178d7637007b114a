//! XML namespace handling
//!
//! This module provides the qualified name type used as the key of every
//! registry table, and the prefix table used to qualify lexical names.

use indexmap::IndexMap;
use std::fmt;

/// XML Schema namespace all built-in types live in
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema instance namespace (`xsi:type`, `xsi:schemaLocation`)
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML namespace, always bound to the `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Pre-recommendation XML Schema namespaces treated as the 2001 one
const LEGACY_XSD_NAMESPACES: &[&str] = &[
    "http://www.w3.org/1999/XMLSchema",
    "http://www.w3.org/2000/10/XMLSchema",
];

/// Map legacy XML Schema namespaces onto [`XSD_NAMESPACE`]
pub fn upgrade_xsd_namespace(namespace: &str) -> &str {
    if LEGACY_XSD_NAMESPACES.contains(&namespace) {
        XSD_NAMESPACE
    } else {
        namespace
    }
}

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Qualified name: a namespace URI plus a local name
///
/// Canonically serialized in Clark notation, `{uri}local`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI
    pub namespace: NamespaceUri,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// Create a QName in the XML Schema namespace
    pub fn xsd(local_name: impl Into<String>) -> Self {
        Self::new(XSD_NAMESPACE, local_name)
    }

    /// Parse a name in `{uri}local` form
    pub fn from_clark(name: &str) -> Option<Self> {
        let rest = name.strip_prefix('{')?;
        let (namespace, local) = rest.split_once('}')?;
        if namespace.is_empty() {
            return None;
        }
        Some(Self::new(namespace, local))
    }

    /// Check whether this name lives in the given namespace
    pub fn is_in(&self, namespace: &str) -> bool {
        self.namespace == namespace
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.local_name)
    }
}

/// Prefix table plus default namespace in effect at some point of a document
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceTable {
    /// Mapping from prefix to namespace URI
    prefixes: IndexMap<Prefix, NamespaceUri>,
    /// Default namespace (no prefix)
    default_namespace: Option<NamespaceUri>,
}

impl NamespaceTable {
    /// Create a table holding only the fixed `xml` binding
    pub fn new() -> Self {
        let mut prefixes = IndexMap::new();
        prefixes.insert("xml".to_string(), XML_NAMESPACE.to_string());
        Self {
            prefixes,
            default_namespace: None,
        }
    }

    /// Add a namespace prefix mapping
    ///
    /// The `xml` binding cannot be overridden.
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: &str) {
        let prefix = prefix.into();
        if prefix == "xml" {
            return;
        }
        self.prefixes
            .insert(prefix, upgrade_xsd_namespace(namespace).to_string());
    }

    /// Set the default namespace; an empty URI undeclares it
    pub fn set_default_namespace(&mut self, namespace: &str) {
        self.default_namespace = if namespace.is_empty() {
            None
        } else {
            Some(upgrade_xsd_namespace(namespace).to_string())
        };
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Get the default namespace
    pub fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Iterate over prefix bindings
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes
            .iter()
            .map(|(prefix, uri)| (prefix.as_str(), uri.as_str()))
    }

    /// Apply the `xmlns` / `xmlns:*` declarations of one element
    ///
    /// Returns true if any declaration was found.
    pub fn apply_declarations<'a>(
        &mut self,
        attributes: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> bool {
        let mut declared = false;
        for (name, value) in attributes {
            if name == "xmlns" {
                self.set_default_namespace(value);
                declared = true;
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                if !prefix.is_empty() {
                    self.add_prefix(prefix, value);
                    declared = true;
                }
            }
        }
        declared
    }
}

impl Default for NamespaceTable {
    fn default() -> Self {
        Self::new()
    }
}

//! XML document parsing
//!
//! Two views of an XML text are provided on top of quick-xml:
//!
//! - [`Document`], a namespace-aware element tree used for schema documents
//!   and for scanning `xsi:schemaLocation` hints;
//! - [`walk`], a streaming post-order traversal that hands every element to
//!   a visitor once all of its children have been visited. The visitor
//!   result for each child is collected into the parent's [`RawNode`].

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::namespaces::NamespaceTable;
use crate::names::split_qname;
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::hash::Hash;

/// XML Element in the document tree
#[derive(Debug, Clone)]
pub struct Element {
    /// Raw element name as written (`prefix:local` or `local`)
    pub name: String,
    /// Resolved namespace URI, if any
    pub namespace: Option<String>,
    /// Local part of the name
    pub local_name: String,
    /// Element attributes keyed by raw name, namespace declarations excluded
    pub attributes: IndexMap<String, String>,
    /// Text content (if any)
    pub text: Option<String>,
    /// Child elements
    pub children: Vec<Element>,
    /// Namespace bindings in scope for this element
    pub namespaces: NamespaceTable,
}

impl Element {
    /// Get an attribute value by raw name
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    /// Get an attribute value by namespace and local name
    ///
    /// Unprefixed attributes are in no namespace and never match.
    pub fn get_attribute_ns(&self, namespace: &str, local_name: &str) -> Option<&str> {
        self.attributes.iter().find_map(|(name, value)| {
            match split_qname(name) {
                (Some(prefix), local)
                    if local == local_name
                        && self.namespaces.get_namespace(prefix) == Some(namespace) =>
                {
                    Some(value.as_str())
                }
                _ => None,
            }
        })
    }

    /// Check whether this element has the given namespace and local name
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace.as_deref() == Some(namespace)
    }

    /// All elements of this subtree, breadth first, starting with this one
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = vec![self];
        let mut index = 0;
        while index < out.len() {
            let current = out[index];
            out.extend(current.children.iter());
            index += 1;
        }
        out
    }
}

/// XML Document representation
#[derive(Debug, Clone)]
pub struct Document {
    /// Root element of the document
    pub root: Element,
}

impl Document {
    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse_with_limits(xml, &Limits::default())
    }

    /// Parse an XML document, enforcing the given limits
    pub fn parse_with_limits(xml: &str, limits: &Limits) -> Result<Self> {
        let (_, root) = walk(xml, limits, |_, node: RawNode<usize, Element>, _| {
            let local_name = split_qname(&node.name).1.to_string();
            let children = node.children.into_values().flatten().collect();
            Ok((
                node.order,
                Element {
                    name: node.name,
                    namespace: node.namespace,
                    local_name,
                    attributes: node.attributes,
                    text: node.text,
                    children,
                    namespaces: node.namespaces,
                },
            ))
        })?;
        Ok(Self { root })
    }

    /// Get the root element
    pub fn root(&self) -> &Element {
        &self.root
    }
}

/// An element still open while its descendants are being visited
#[derive(Debug, Clone)]
pub struct OpenElement {
    /// Raw element name
    pub name: String,
    /// Resolved namespace URI of the element, if any
    pub namespace: Option<String>,
    /// Raw attributes, namespace declarations excluded
    pub attributes: IndexMap<String, String>,
    /// Namespace bindings in scope for this element
    pub namespaces: NamespaceTable,
}

/// A closed element as handed to the visitor of [`walk`]
#[derive(Debug, Clone)]
pub struct RawNode<K, V> {
    /// Raw element name
    pub name: String,
    /// Resolved namespace URI of the element, if any
    pub namespace: Option<String>,
    /// Position of the element among its siblings
    pub order: usize,
    /// Raw attributes, namespace declarations excluded
    pub attributes: IndexMap<String, String>,
    /// Concatenated character content; whitespace-only content is dropped
    pub text: Option<String>,
    /// Visitor results of the children, grouped by key in document order
    pub children: IndexMap<K, Vec<V>>,
    /// Namespace bindings in scope for this element
    pub namespaces: NamespaceTable,
}

struct Pending<K, V> {
    order: usize,
    text: String,
    children: IndexMap<K, Vec<V>>,
    next_child: usize,
}

/// Stream `xml` and call `visit` for each element in post-order
///
/// The visitor receives the raw slash-separated path of the element, the
/// element itself and the stack of still-open ancestors (outermost first).
/// It returns the key and value under which the element is collected into
/// its parent. The root's result is returned.
pub fn walk<K, V, F>(xml: &str, limits: &Limits, mut visit: F) -> Result<(K, V)>
where
    K: Hash + Eq,
    F: FnMut(&str, RawNode<K, V>, &[OpenElement]) -> Result<(K, V)>,
{
    limits.check_xml_size(xml.len())?;

    let mut reader = Reader::from_str(xml);
    reader.expand_empty_elements(true);

    let mut open: Vec<OpenElement> = Vec::new();
    let mut pending: Vec<Pending<K, V>> = Vec::new();
    let mut root: Option<(K, V)> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::Xml(format!(
                "error parsing XML at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(Error::Xml("multiple root elements".to_string()));
                }
                let inherited = open
                    .last()
                    .map(|parent| parent.namespaces.clone())
                    .unwrap_or_default();
                let element = open_element(&start, inherited, limits)?;
                limits.check_xml_depth(open.len() + 1)?;

                let order = match pending.last_mut() {
                    Some(parent) => {
                        parent.next_child += 1;
                        parent.next_child - 1
                    }
                    None => 0,
                };
                open.push(element);
                pending.push(Pending {
                    order,
                    text: String::new(),
                    children: IndexMap::new(),
                    next_child: 0,
                });
            }
            Event::End(_) => {
                let path = open
                    .iter()
                    .map(|e| e.name.as_str())
                    .fold(String::new(), |acc, name| acc + "/" + name);
                let (Some(element), Some(state)) = (open.pop(), pending.pop()) else {
                    return Err(Error::Xml("unbalanced end tag".to_string()));
                };

                let text = if state.text.trim().is_empty() {
                    None
                } else {
                    Some(state.text)
                };
                let node = RawNode {
                    name: element.name,
                    namespace: element.namespace,
                    order: state.order,
                    attributes: element.attributes,
                    text,
                    children: state.children,
                    namespaces: element.namespaces,
                };

                let (key, value) = visit(&path, node, &open)?;
                match pending.last_mut() {
                    Some(parent) => parent.children.entry(key).or_default().push(value),
                    None => root = Some((key, value)),
                }
            }
            Event::Text(text) => {
                if let Some(current) = pending.last_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| Error::Xml(format!("failed to unescape text: {}", e)))?;
                    current.text.push_str(&text);
                }
            }
            Event::CData(cdata) => {
                if let Some(current) = pending.last_mut() {
                    let bytes = cdata.into_inner();
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|e| Error::Xml(format!("invalid CDATA content: {}", e)))?;
                    current.text.push_str(text);
                }
            }
            Event::Eof => break,
            _ => {} // Comments, processing instructions, doctype
        }
    }

    if !open.is_empty() {
        return Err(Error::Xml("unexpected end of document".to_string()));
    }
    root.ok_or_else(|| Error::Xml("document has no root element".to_string()))
}

fn open_element(
    start: &BytesStart,
    mut namespaces: NamespaceTable,
    limits: &Limits,
) -> Result<OpenElement> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| Error::Xml(format!("invalid element name: {}", e)))?
        .to_string();

    let mut attributes = IndexMap::new();
    let mut declarations = Vec::new();
    for attr_result in start.attributes() {
        let attr =
            attr_result.map_err(|e| Error::Xml(format!("failed to parse attribute: {}", e)))?;
        let attr_name = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::Xml(format!("invalid attribute name: {}", e)))?
            .to_string();
        let attr_value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(format!("failed to unescape attribute value: {}", e)))?
            .to_string();

        if attr_name == "xmlns" || attr_name.starts_with("xmlns:") {
            declarations.push((attr_name, attr_value));
        } else {
            attributes.insert(attr_name, attr_value);
        }
    }
    limits.check_attributes(attributes.len())?;

    namespaces.apply_declarations(
        declarations
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str())),
    );
    let (namespace, _) = resolve_element_name(&name, &namespaces)?;

    Ok(OpenElement {
        name,
        namespace,
        attributes,
        namespaces,
    })
}

/// Resolve a raw element name to (namespace, local name)
fn resolve_element_name(
    name: &str,
    namespaces: &NamespaceTable,
) -> Result<(Option<String>, String)> {
    match split_qname(name) {
        (Some(prefix), local) => match namespaces.get_namespace(prefix) {
            Some(uri) => Ok((Some(uri.to_string()), local.to_string())),
            None => Err(Error::UnknownNamespacePrefix {
                prefix: prefix.to_string(),
                name: name.to_string(),
            }),
        },
        (None, local) => Ok((
            namespaces.default_namespace().map(str::to_string),
            local.to_string(),
        )),
    }
}

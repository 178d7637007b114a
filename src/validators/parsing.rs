//! XSD Document Parsing
//!
//! Compiles one schema document into the [`TypeRegistry`]. Declarations are
//! collected into a staging set of [`SchemaComponents`] and only merged once
//! the whole document compiled, so a failed compile leaves the registry as
//! it was.
//!
//! Every child element and unprefixed attribute of the schema tree must be
//! recognized. Anything left over fails with `InvalidSchema` instead of
//! being silently ignored.

use indexmap::IndexSet;
use tracing::{debug, warn};

use super::attributes::AttributeDef;
use super::builtins::{XSD_ANY_SIMPLE_TYPE, XSD_ANY_TYPE};
use super::complex_types::{ChildContent, ComplexType};
use super::elements::{ElementDef, ElementSet};
use super::globals::TypeDef;
use super::helpers::boolean_to_rust;
use super::imports::SchemaLocations;
use super::schemas::{SchemaComponents, TypeRegistry};
use super::simple_types::SimpleType;

use crate::documents::{Document, Element};
use crate::error::{Error, ParseError, Result};
use crate::names::{qualify, qualify_target};
use crate::namespaces::{QName, XSD_NAMESPACE};

/// XSD element local names
mod xsd_elements {
    pub const SCHEMA: &str = "schema";
    pub const ELEMENT: &str = "element";
    pub const COMPLEX_TYPE: &str = "complexType";
    pub const SIMPLE_TYPE: &str = "simpleType";
    pub const ATTRIBUTE: &str = "attribute";
    pub const ATTRIBUTE_GROUP: &str = "attributeGroup";
    pub const GROUP: &str = "group";
    pub const SEQUENCE: &str = "sequence";
    pub const CHOICE: &str = "choice";
    pub const ALL: &str = "all";
    pub const ANNOTATION: &str = "annotation";
    pub const IMPORT: &str = "import";
    pub const INCLUDE: &str = "include";
    pub const REDEFINE: &str = "redefine";
    pub const RESTRICTION: &str = "restriction";
    pub const EXTENSION: &str = "extension";
    pub const LIST: &str = "list";
    pub const UNION: &str = "union";
    pub const COMPLEX_CONTENT: &str = "complexContent";
    pub const SIMPLE_CONTENT: &str = "simpleContent";
    pub const ANY: &str = "any";
    pub const ANY_ATTRIBUTE: &str = "anyAttribute";
    pub const NOTATION: &str = "notation";
    pub const UNIQUE: &str = "unique";
    pub const KEY: &str = "key";
    pub const KEYREF: &str = "keyref";
}

/// XSD attribute names
mod xsd_attrs {
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const REF: &str = "ref";
    pub const TARGET_NAMESPACE: &str = "targetNamespace";
    pub const BASE: &str = "base";
    pub const MIXED: &str = "mixed";
    pub const NAMESPACE: &str = "namespace";
    pub const SCHEMA_LOCATION: &str = "schemaLocation";
    pub const ITEM_TYPE: &str = "itemType";
    pub const MEMBER_TYPES: &str = "memberTypes";
    pub const MAX_OCCURS: &str = "maxOccurs";
}

/// Value facets, accepted and not enforced
const FACETS: &[&str] = &[
    "enumeration",
    "pattern",
    "length",
    "minLength",
    "maxLength",
    "minInclusive",
    "maxInclusive",
    "minExclusive",
    "maxExclusive",
    "totalDigits",
    "fractionDigits",
    "whiteSpace",
    "assertion",
];

const ELEMENT_ATTRS: &[&str] = &[
    "name",
    "ref",
    "type",
    "id",
    "minOccurs",
    "maxOccurs",
    "form",
    "nillable",
    "default",
    "fixed",
    "abstract",
    "block",
    "final",
    "substitutionGroup",
];
const ATTRIBUTE_ATTRS: &[&str] = &["name", "ref", "type", "id", "use", "default", "fixed", "form"];
const COMPLEX_TYPE_ATTRS: &[&str] = &["name", "id", "mixed", "abstract", "block", "final"];
const SIMPLE_TYPE_ATTRS: &[&str] = &["name", "id", "final"];
const GROUP_ATTRS: &[&str] = &["id", "minOccurs", "maxOccurs"];
const ANY_ATTRS: &[&str] = &["id", "minOccurs", "maxOccurs", "namespace", "processContents"];
const ANY_ATTRIBUTE_ATTRS: &[&str] = &["id", "namespace", "processContents"];
const CONTENT_ATTRS: &[&str] = &["id", "mixed"];
const DERIVATION_ATTRS: &[&str] = &["id", "base"];
const LIST_ATTRS: &[&str] = &["id", "itemType"];
const UNION_ATTRS: &[&str] = &["id", "memberTypes"];
const IMPORT_ATTRS: &[&str] = &["id", "namespace", "schemaLocation"];
const INCLUDE_ATTRS: &[&str] = &["id", "schemaLocation"];

/// Compile a schema document for `namespace` into the registry
///
/// Returns the (namespace, location) pairs the schema depends on through
/// `import` and `include`. Compiling the same text for the same namespace
/// twice is a no-op returning no dependencies.
pub fn compile_schema(
    registry: &mut TypeRegistry,
    namespace: &str,
    text: &str,
) -> Result<SchemaLocations> {
    if registry.is_compiled(namespace, text) {
        debug!(namespace, "schema already compiled");
        return Ok(SchemaLocations::new());
    }

    let document = Document::from_string(text)?;
    let root = document.root();
    if !root.is(XSD_NAMESPACE, xsd_elements::SCHEMA) {
        return Err(Error::InvalidSchema(
            ParseError::new(format!("expected xs:schema root element, found '{}'", root.name))
                .with_location(namespace),
        ));
    }
    if let Some(target) = root.get_attribute(xsd_attrs::TARGET_NAMESPACE) {
        if target != namespace {
            return Err(Error::InvalidSchema(
                ParseError::new(format!(
                    "schema does not have expected target namespace {} (declares {})",
                    namespace, target
                ))
                .with_location(namespace),
            ));
        }
    }

    let mut compiler = SchemaCompiler::new(registry, namespace);
    compiler.compile(root)?;
    let SchemaCompiler {
        components,
        dependencies,
        ..
    } = compiler;

    check_circular_derivations(registry, &components, namespace)?;
    check_circular_references(registry, &components, namespace)?;

    debug!(
        namespace,
        types = components.types.len(),
        elements = components.elements.len(),
        attributes = components.attributes.len(),
        dependencies = dependencies.len(),
        "compiled schema"
    );
    registry.merge(namespace, text, components);
    Ok(dependencies)
}

/// Group members collected while walking nested model groups
#[derive(Default)]
struct ContentModel {
    elements: ElementSet,
    /// Array-ness of the `any` wildcard, when one was declared
    wildcard: Option<Option<bool>>,
    declared: bool,
}

impl ContentModel {
    fn into_content(self) -> ChildContent {
        match self.wildcard {
            Some(is_array) => ChildContent::Wildcard {
                is_array,
                declared: self.elements,
            },
            None if self.declared => ChildContent::Elements(self.elements),
            None => ChildContent::Empty,
        }
    }
}

struct SchemaCompiler<'a> {
    registry: &'a mut TypeRegistry,
    namespace: String,
    components: SchemaComponents,
    dependencies: SchemaLocations,
}

impl<'a> SchemaCompiler<'a> {
    fn new(registry: &'a mut TypeRegistry, namespace: &str) -> Self {
        Self {
            registry,
            namespace: namespace.to_string(),
            components: SchemaComponents::new(),
            dependencies: SchemaLocations::new(),
        }
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    fn invalid(&self, message: impl Into<String>, elem: &Element) -> Error {
        Error::InvalidSchema(
            ParseError::new(message)
                .with_location(self.namespace.clone())
                .with_source(describe(elem)),
        )
    }

    fn leftover(&self, elem: &Element, parent: &Element) -> Error {
        self.invalid(
            format!("unsupported declaration '{}' in '{}'", elem.name, parent.name),
            elem,
        )
    }

    /// Fail on unprefixed attributes not in `allowed`
    ///
    /// Attributes from other namespaces are annotations and always pass.
    fn check_attributes(&self, elem: &Element, allowed: &[&str]) -> Result<()> {
        for name in elem.attributes.keys() {
            if name.contains(':') || allowed.contains(&name.as_str()) {
                continue;
            }
            return Err(self.invalid(
                format!("unsupported attribute '{}' on '{}'", name, elem.name),
                elem,
            ));
        }
        Ok(())
    }

    /// XSD children of `elem`, annotations skipped
    fn children<'e>(&self, elem: &'e Element) -> Result<Vec<&'e Element>> {
        let mut out = Vec::with_capacity(elem.children.len());
        for child in &elem.children {
            if child.namespace.as_deref() != Some(XSD_NAMESPACE) {
                return Err(self.leftover(child, elem));
            }
            if child.local_name != xsd_elements::ANNOTATION {
                out.push(child);
            }
        }
        Ok(out)
    }

    // =========================================================================
    // Names
    // =========================================================================

    fn qualify(&self, elem: &Element, name: &str) -> Result<QName> {
        qualify(&elem.namespaces, None, name)
    }

    fn target_name(&self, name: &str) -> QName {
        qualify_target(&self.namespace, name)
    }

    fn required<'e>(&self, elem: &'e Element, attr: &str) -> Result<&'e str> {
        elem.get_attribute(attr).ok_or_else(|| {
            self.invalid(format!("'{}' is missing the '{}' attribute", elem.name, attr), elem)
        })
    }

    /// Array-ness from `maxOccurs`, or `default` when not declared
    fn parse_is_array(&self, elem: &Element, default: Option<bool>) -> Result<Option<bool>> {
        match elem.get_attribute(xsd_attrs::MAX_OCCURS) {
            None => Ok(default),
            Some("unbounded") => Ok(Some(true)),
            Some(value) => match value.trim().parse::<u64>() {
                Ok(max) if max > 1 => Ok(Some(true)),
                Ok(_) => Ok(default.or(Some(false))),
                Err(_) => Err(self.invalid(format!("invalid maxOccurs '{}'", value), elem)),
            },
        }
    }

    // =========================================================================
    // Schema
    // =========================================================================

    fn compile(&mut self, schema: &Element) -> Result<()> {
        for child in self.children(schema)? {
            match child.local_name.as_str() {
                xsd_elements::ELEMENT => {
                    let (name, element) = self.parse_element(child, None)?;
                    self.components.elements.insert(name, element);
                }
                xsd_elements::ATTRIBUTE => {
                    let (name, attribute) = self.parse_attribute(child)?;
                    self.components.attributes.insert(name, attribute);
                }
                xsd_elements::COMPLEX_TYPE => {
                    let name = self.target_name(self.required(child, xsd_attrs::NAME)?);
                    self.parse_complex_type(child, name)?;
                }
                xsd_elements::SIMPLE_TYPE => {
                    let name = self.target_name(self.required(child, xsd_attrs::NAME)?);
                    self.parse_simple_type(child, name)?;
                }
                xsd_elements::IMPORT => self.parse_import(child)?,
                xsd_elements::INCLUDE => self.parse_include(child)?,
                xsd_elements::GROUP | xsd_elements::ATTRIBUTE_GROUP => {
                    warn!(
                        namespace = %self.namespace,
                        name = child.get_attribute(xsd_attrs::NAME).unwrap_or_default(),
                        "skipping top-level {}, groups are not supported",
                        child.local_name
                    );
                }
                xsd_elements::NOTATION => {}
                xsd_elements::REDEFINE => {
                    return Err(self.invalid("redefine is not supported", child));
                }
                _ => return Err(self.leftover(child, schema)),
            }
        }
        Ok(())
    }

    fn parse_import(&mut self, elem: &Element) -> Result<()> {
        self.check_attributes(elem, IMPORT_ATTRS)?;
        self.children(elem)?;
        let location = elem.get_attribute(xsd_attrs::SCHEMA_LOCATION);
        match (elem.get_attribute(xsd_attrs::NAMESPACE), location) {
            (Some(namespace), Some(location)) => {
                self.dependencies.add(namespace, location);
            }
            (namespace, _) => {
                warn!(
                    namespace = %self.namespace,
                    imported = namespace.unwrap_or_default(),
                    location = location.unwrap_or_default(),
                    "skipping import without namespace or schemaLocation"
                );
            }
        }
        Ok(())
    }

    fn parse_include(&mut self, elem: &Element) -> Result<()> {
        self.check_attributes(elem, INCLUDE_ATTRS)?;
        self.children(elem)?;
        let location = self.required(elem, xsd_attrs::SCHEMA_LOCATION)?;
        let namespace = self.namespace.clone();
        self.dependencies.add(&namespace, location);
        Ok(())
    }

    // =========================================================================
    // Elements and attributes
    // =========================================================================

    fn parse_element(
        &mut self,
        elem: &Element,
        array_default: Option<bool>,
    ) -> Result<(QName, ElementDef)> {
        self.check_attributes(elem, ELEMENT_ATTRS)?;
        let is_array = self.parse_is_array(elem, array_default)?;

        if let Some(reference) = elem.get_attribute(xsd_attrs::REF) {
            self.children(elem)?;
            let target = self.qualify(elem, reference)?;
            return Ok((target.clone(), ElementDef::reference(target, is_array)));
        }

        let name = self.target_name(self.required(elem, xsd_attrs::NAME)?);
        let nested = self.nested_type(elem, &name, true)?;
        let type_name = match (elem.get_attribute(xsd_attrs::TYPE), nested) {
            (Some(_), Some(_)) => {
                return Err(self.invalid("element declares both a type and an inline type", elem));
            }
            (Some(type_name), None) => Some(self.qualify(elem, type_name)?),
            (None, nested) => nested,
        };

        Ok((name, ElementDef::Definition { type_name, is_array }))
    }

    fn parse_attribute(&mut self, elem: &Element) -> Result<(QName, AttributeDef)> {
        self.check_attributes(elem, ATTRIBUTE_ATTRS)?;

        if let Some(reference) = elem.get_attribute(xsd_attrs::REF) {
            self.children(elem)?;
            let target = self.qualify(elem, reference)?;
            return Ok((target.clone(), AttributeDef::reference(target)));
        }

        let name = self.target_name(self.required(elem, xsd_attrs::NAME)?);
        let nested = self.nested_type(elem, &name, false)?;
        let type_name = match (elem.get_attribute(xsd_attrs::TYPE), nested) {
            (Some(_), Some(_)) => {
                return Err(self.invalid("attribute declares both a type and an inline type", elem));
            }
            (Some(type_name), None) => self.qualify(elem, type_name)?,
            (None, Some(nested)) => nested,
            (None, None) => QName::xsd(XSD_ANY_SIMPLE_TYPE),
        };

        Ok((name, AttributeDef::typed(type_name)))
    }

    /// Lift an anonymous type declared inside `elem`, returning its new name
    fn nested_type(
        &mut self,
        elem: &Element,
        owner: &QName,
        allow_complex: bool,
    ) -> Result<Option<QName>> {
        let mut found = None;
        for child in self.children(elem)? {
            let complex = match child.local_name.as_str() {
                xsd_elements::SIMPLE_TYPE => false,
                xsd_elements::COMPLEX_TYPE if allow_complex => true,
                xsd_elements::UNIQUE | xsd_elements::KEY | xsd_elements::KEYREF
                    if allow_complex =>
                {
                    continue
                }
                _ => return Err(self.leftover(child, elem)),
            };
            if found.is_some() {
                return Err(self.invalid("more than one inline type", elem));
            }
            if child.get_attribute(xsd_attrs::NAME).is_some() {
                return Err(self.invalid("inline type must not be named", child));
            }

            let name = self.registry.next_anonymous_name(owner);
            if complex {
                self.parse_complex_type(child, name.clone())?;
            } else {
                self.parse_simple_type(child, name.clone())?;
            }
            found = Some(name);
        }
        Ok(found)
    }

    // =========================================================================
    // Complex types
    // =========================================================================

    fn parse_complex_type(&mut self, elem: &Element, name: QName) -> Result<()> {
        self.check_attributes(elem, COMPLEX_TYPE_ATTRS)?;

        let mut complex = ComplexType::new();
        complex.mixed = self.parse_mixed(elem)?;
        let mut model = ContentModel::default();
        let mut derived = false;

        for child in self.children(elem)? {
            match child.local_name.as_str() {
                xsd_elements::SEQUENCE | xsd_elements::CHOICE | xsd_elements::ALL => {
                    if model.declared || derived {
                        return Err(self.invalid("more than one content model", elem));
                    }
                    self.parse_model_group(child, None, &mut model)?;
                }
                xsd_elements::SIMPLE_CONTENT | xsd_elements::COMPLEX_CONTENT => {
                    if derived {
                        return Err(self.invalid(
                            "simpleContent and complexContent are mutually exclusive",
                            elem,
                        ));
                    }
                    if model.declared {
                        return Err(self.invalid("more than one content model", elem));
                    }
                    derived = true;
                    self.parse_derivation(child, &mut complex, &mut model)?;
                }
                xsd_elements::ATTRIBUTE => {
                    let (attr_name, attribute) = self.parse_attribute(child)?;
                    complex.attributes.insert(attr_name, attribute);
                }
                xsd_elements::ANY_ATTRIBUTE => {
                    self.check_attributes(child, ANY_ATTRIBUTE_ATTRS)?;
                    complex.any_attributes = true;
                }
                xsd_elements::GROUP | xsd_elements::ATTRIBUTE_GROUP => {
                    return Err(self.invalid(
                        format!("{} references are not supported", child.local_name),
                        child,
                    ));
                }
                _ => return Err(self.leftover(child, elem)),
            }
        }

        complex.content = model.into_content();
        self.components.types.insert(name, TypeDef::Complex(complex));
        Ok(())
    }

    fn parse_mixed(&self, elem: &Element) -> Result<bool> {
        match elem.get_attribute(xsd_attrs::MIXED) {
            Some(value) => boolean_to_rust(value)
                .map_err(|_| self.invalid(format!("invalid mixed value '{}'", value), elem)),
            None => Ok(false),
        }
    }

    /// `simpleContent` / `complexContent` with one `extension` or `restriction`
    fn parse_derivation(
        &mut self,
        content: &Element,
        complex: &mut ComplexType,
        model: &mut ContentModel,
    ) -> Result<()> {
        self.check_attributes(content, CONTENT_ATTRS)?;
        if self.parse_mixed(content)? {
            complex.mixed = true;
        }

        let children = self.children(content)?;
        let derivation = match children.as_slice() {
            [derivation]
                if derivation.local_name == xsd_elements::EXTENSION
                    || derivation.local_name == xsd_elements::RESTRICTION =>
            {
                *derivation
            }
            _ => {
                return Err(self.invalid(
                    format!("'{}' needs exactly one extension or restriction", content.name),
                    content,
                ));
            }
        };
        self.check_attributes(derivation, DERIVATION_ATTRS)?;

        let base = self.qualify(derivation, self.required(derivation, xsd_attrs::BASE)?)?;
        if base != QName::xsd(XSD_ANY_TYPE) {
            complex.base = Some(base);
            complex.is_restriction = derivation.local_name == xsd_elements::RESTRICTION;
        }

        let simple_content = content.local_name == xsd_elements::SIMPLE_CONTENT;
        for child in self.children(derivation)? {
            match child.local_name.as_str() {
                xsd_elements::SEQUENCE | xsd_elements::CHOICE | xsd_elements::ALL
                    if !simple_content =>
                {
                    if model.declared {
                        return Err(self.invalid("more than one content model", derivation));
                    }
                    self.parse_model_group(child, None, model)?;
                }
                xsd_elements::ATTRIBUTE => {
                    let (name, attribute) = self.parse_attribute(child)?;
                    complex.attributes.insert(name, attribute);
                }
                xsd_elements::ANY_ATTRIBUTE => {
                    self.check_attributes(child, ANY_ATTRIBUTE_ATTRS)?;
                    complex.any_attributes = true;
                }
                // Value restrictions of simple content are not enforced
                xsd_elements::SIMPLE_TYPE if simple_content => {}
                facet if simple_content && FACETS.contains(&facet) => {}
                xsd_elements::GROUP | xsd_elements::ATTRIBUTE_GROUP => {
                    return Err(self.invalid(
                        format!("{} references are not supported", child.local_name),
                        child,
                    ));
                }
                _ => return Err(self.leftover(child, derivation)),
            }
        }
        Ok(())
    }

    /// `sequence`, `choice` or `all`, nested groups included
    ///
    /// The group's own `maxOccurs` becomes the array default of its members.
    fn parse_model_group(
        &mut self,
        group: &Element,
        inherited: Option<bool>,
        model: &mut ContentModel,
    ) -> Result<()> {
        self.check_attributes(group, GROUP_ATTRS)?;
        model.declared = true;
        let array_default = self.parse_is_array(group, inherited)?;

        for child in self.children(group)? {
            match child.local_name.as_str() {
                xsd_elements::ELEMENT => {
                    let (name, element) = self.parse_element(child, array_default)?;
                    model.elements.insert(name, element);
                }
                xsd_elements::SEQUENCE | xsd_elements::CHOICE | xsd_elements::ALL => {
                    self.parse_model_group(child, array_default, model)?;
                }
                xsd_elements::ANY => {
                    self.check_attributes(child, ANY_ATTRS)?;
                    self.children(child)?;
                    if model.wildcard.is_some() {
                        return Err(self.invalid("only one 'any' wildcard per type is supported", child));
                    }
                    model.wildcard = Some(self.parse_is_array(child, array_default)?);
                }
                xsd_elements::GROUP => {
                    return Err(self.invalid("group references are not supported", child));
                }
                _ => return Err(self.leftover(child, group)),
            }
        }
        Ok(())
    }

    // =========================================================================
    // Simple types
    // =========================================================================

    fn parse_simple_type(&mut self, elem: &Element, name: QName) -> Result<()> {
        self.check_attributes(elem, SIMPLE_TYPE_ATTRS)?;

        let children = self.children(elem)?;
        let [derivation] = children.as_slice() else {
            return Err(self.invalid("simpleType needs exactly one restriction, list or union", elem));
        };

        let simple = match derivation.local_name.as_str() {
            xsd_elements::RESTRICTION => self.parse_simple_restriction(derivation, &name)?,
            xsd_elements::LIST => self.parse_list(derivation, &name)?,
            xsd_elements::UNION => self.parse_union(derivation, &name)?,
            _ => return Err(self.leftover(derivation, elem)),
        };
        self.components.types.insert(name, TypeDef::Simple(simple));
        Ok(())
    }

    fn parse_simple_restriction(&mut self, elem: &Element, owner: &QName) -> Result<SimpleType> {
        self.check_attributes(elem, DERIVATION_ATTRS)?;

        let mut nested = None;
        for child in self.children(elem)? {
            match child.local_name.as_str() {
                xsd_elements::SIMPLE_TYPE if nested.is_none() => {
                    nested = Some(self.lift_simple_type(child, owner)?);
                }
                facet if FACETS.contains(&facet) => {}
                _ => return Err(self.leftover(child, elem)),
            }
        }

        let base = match (elem.get_attribute(xsd_attrs::BASE), nested) {
            (Some(base), None) => self.qualify(elem, base)?,
            (None, Some(nested)) => nested,
            _ => {
                return Err(self.invalid(
                    "restriction needs either a base or an inline simpleType",
                    elem,
                ));
            }
        };
        Ok(SimpleType::restriction(base))
    }

    fn parse_list(&mut self, elem: &Element, owner: &QName) -> Result<SimpleType> {
        self.check_attributes(elem, LIST_ATTRS)?;

        let mut nested = None;
        for child in self.children(elem)? {
            match child.local_name.as_str() {
                xsd_elements::SIMPLE_TYPE if nested.is_none() => {
                    nested = Some(self.lift_simple_type(child, owner)?);
                }
                _ => return Err(self.leftover(child, elem)),
            }
        }

        let item_type = match (elem.get_attribute(xsd_attrs::ITEM_TYPE), nested) {
            (Some(item_type), None) => self.qualify(elem, item_type)?,
            (None, Some(nested)) => nested,
            _ => {
                return Err(self.invalid("list needs either an itemType or an inline simpleType", elem));
            }
        };
        Ok(SimpleType::list(item_type))
    }

    fn parse_union(&mut self, elem: &Element, owner: &QName) -> Result<SimpleType> {
        self.check_attributes(elem, UNION_ATTRS)?;

        let mut members = Vec::new();
        if let Some(member_types) = elem.get_attribute(xsd_attrs::MEMBER_TYPES) {
            for member in member_types.split_whitespace() {
                members.push(self.qualify(elem, member)?);
            }
        }
        for child in self.children(elem)? {
            match child.local_name.as_str() {
                xsd_elements::SIMPLE_TYPE => members.push(self.lift_simple_type(child, owner)?),
                _ => return Err(self.leftover(child, elem)),
            }
        }

        if members.is_empty() {
            return Err(self.invalid("union declares no member types", elem));
        }
        Ok(SimpleType::union(members))
    }

    fn lift_simple_type(&mut self, elem: &Element, owner: &QName) -> Result<QName> {
        let name = self.registry.next_anonymous_name(owner);
        self.parse_simple_type(elem, name.clone())?;
        Ok(name)
    }
}

/// Short rendering of a declaration for diagnostics
fn describe(elem: &Element) -> String {
    let mut out = format!("<{}", elem.name);
    for (name, value) in &elem.attributes {
        out.push_str(&format!(" {}=\"{}\"", name, value));
    }
    if elem.children.is_empty() {
        out.push_str("/>");
    } else {
        out.push_str(&format!("> ({} children)", elem.children.len()));
    }
    out
}

// =============================================================================
// Cycle checks
// =============================================================================

fn check_circular_derivations(
    registry: &TypeRegistry,
    components: &SchemaComponents,
    namespace: &str,
) -> Result<()> {
    fn visit<'a>(
        name: &'a QName,
        lookup: &impl Fn(&QName) -> Option<&'a TypeDef>,
        path: &mut Vec<&'a QName>,
        done: &mut IndexSet<&'a QName>,
    ) -> std::result::Result<(), String> {
        if done.contains(name) {
            return Ok(());
        }
        if path.contains(&name) {
            return Err(name.to_string());
        }
        path.push(name);
        if let Some(def) = lookup(name) {
            for base in def.bases() {
                visit(base, lookup, path, done)?;
            }
        }
        path.pop();
        done.insert(name);
        Ok(())
    }

    let lookup = |name: &QName| {
        components
            .types
            .get(name)
            .or_else(|| registry.lookup_type(name))
    };
    let mut done = IndexSet::new();
    for name in components.types.keys() {
        visit(name, &lookup, &mut Vec::new(), &mut done).map_err(|cycle| {
            Error::InvalidSchema(
                ParseError::new(format!("circular derivation of type {}", cycle))
                    .with_location(namespace),
            )
        })?;
    }
    Ok(())
}

fn check_circular_references(
    registry: &TypeRegistry,
    components: &SchemaComponents,
    namespace: &str,
) -> Result<()> {
    let lookup = |name: &QName| {
        components
            .elements
            .get(name)
            .or_else(|| registry.lookup_element(name))
    };
    for start in components.elements.keys() {
        let mut seen = IndexSet::new();
        let mut current = start;
        while let Some(ElementDef::Reference { target, .. }) = lookup(current) {
            if !seen.insert(current) {
                return Err(Error::InvalidSchema(
                    ParseError::new(format!("circular reference of element {}", start))
                        .with_location(namespace),
                ));
            }
            current = target;
        }
    }
    Ok(())
}

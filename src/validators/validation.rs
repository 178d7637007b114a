//! Document validation and transformation
//!
//! [`DocumentValidator`] consumes the post-order stream of
//! [`walk`](crate::documents::walk): every element arrives after its children
//! were already turned into [`TypedValue`]s. For each element the validator
//!
//! 1. qualifies the element path from the open ancestors,
//! 2. walks that path from the global elements down to the element's
//!    declaration,
//! 3. picks the effective type (`xsi:type` overrides the declared one),
//! 4. coerces attributes against the effective type,
//! 5. coerces scalar content, or normalizes structured content by collapsing
//!    singular children out of their sequences.
//!
//! The first error aborts the whole document.

use indexmap::IndexMap;
use tracing::trace;

use super::attributes::AttributeSet;
use super::complex_types::ChildContent;
use super::resolution::{try_parse, ConcreteType, ElementScope};
use super::schemas::TypeRegistry;
use crate::converters::{Converter, JsonConverter};
use crate::documents::{walk, RawNode};
use crate::error::{Error, Result, ValidationError, ValidationErrorKind};
use crate::limits::Limits;
use crate::names::{qualify, split_qname, strip};
use crate::namespaces::{NamespaceTable, QName, XSI_NAMESPACE};
use crate::settings::ParseOptions;
use crate::values::{Record, TypedValue};

/// A validated document
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// Output name of the root element
    pub root: String,
    /// Typed value of the root element
    pub value: TypedValue,
}

impl ParsedDocument {
    /// Convert to JSON, wrapping the value under the root's name
    pub fn to_json(&self, options: &ParseOptions) -> serde_json::Value {
        JsonConverter::new()
            .with_attr_key(options.attr_key.as_str())
            .with_char_key(options.char_key.as_str())
            .decode_document(&self.root, &self.value)
    }
}

/// Validates and types documents against a populated registry
#[derive(Debug, Clone, Copy)]
pub struct DocumentValidator<'a> {
    registry: &'a TypeRegistry,
    options: &'a ParseOptions,
    limits: &'a Limits,
}

/// One segment of a qualified element path
struct Segment<'n> {
    name: QName,
    attributes: &'n IndexMap<String, String>,
    namespaces: &'n NamespaceTable,
}

fn invalid(kind: ValidationErrorKind, message: impl Into<String>) -> Error {
    Error::Validation(ValidationError::new(kind, message))
}

fn xpath(segments: &[Segment<'_>]) -> String {
    segments
        .iter()
        .map(|segment| format!("/{}", segment.name))
        .collect()
}

/// Find an attribute in the XML Schema instance namespace
fn xsi_attribute<'v>(
    attributes: &'v IndexMap<String, String>,
    namespaces: &NamespaceTable,
    local_name: &str,
) -> Option<&'v str> {
    attributes.iter().find_map(|(name, value)| match split_qname(name) {
        (Some(prefix), local)
            if local == local_name && namespaces.get_namespace(prefix) == Some(XSI_NAMESPACE) =>
        {
            Some(value.as_str())
        }
        _ => None,
    })
}

fn is_reserved(name: &str, namespaces: &NamespaceTable) -> bool {
    if name == "xmlns" || name.starts_with("xmlns:") {
        return true;
    }
    match split_qname(name) {
        (Some(prefix), _) => namespaces.get_namespace(prefix) == Some(XSI_NAMESPACE),
        (None, _) => false,
    }
}

impl<'a> DocumentValidator<'a> {
    /// Create a validator over a registry that will not change while it runs
    pub fn new(registry: &'a TypeRegistry, options: &'a ParseOptions, limits: &'a Limits) -> Self {
        Self {
            registry,
            options,
            limits,
        }
    }

    /// Validate `xml` and return its typed value tree
    pub fn validate(&self, xml: &str) -> Result<ParsedDocument> {
        let (root, value) = walk::<QName, TypedValue, _>(xml, self.limits, |_, node, open| {
            let ancestors = open
                .iter()
                .map(|element| {
                    Ok(Segment {
                        name: qualify(
                            &element.namespaces,
                            element.namespace.as_deref(),
                            &element.name,
                        )?,
                        attributes: &element.attributes,
                        namespaces: &element.namespaces,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            self.visit(ancestors, &node)
        })?;
        Ok(ParsedDocument {
            root: self.output_key(&root),
            value,
        })
    }

    fn output_key(&self, name: &QName) -> String {
        let clark = name.to_string();
        if self.options.output_with_namespace {
            clark
        } else {
            strip(&clark).to_string()
        }
    }

    fn visit<'n>(
        &self,
        mut segments: Vec<Segment<'n>>,
        node: &'n RawNode<QName, TypedValue>,
    ) -> Result<(QName, TypedValue)> {
        let name = qualify(&node.namespaces, node.namespace.as_deref(), &node.name)?;
        segments.push(Segment {
            name: name.clone(),
            attributes: &node.attributes,
            namespaces: &node.namespaces,
        });
        let path = xpath(&segments);

        let value = self
            .validate_node(&segments, &name, node)
            .map_err(|e| e.at_path(&path))?;
        trace!(path = %path, kind = value.kind(), "validated element");
        Ok((name, value))
    }

    fn validate_node(
        &self,
        segments: &[Segment<'_>],
        name: &QName,
        node: &RawNode<QName, TypedValue>,
    ) -> Result<TypedValue> {
        let Some((terminal, ancestors)) = segments.split_last() else {
            return Err(Error::Other("empty element path".to_string()));
        };

        let mut scope = ElementScope::Global;
        for segment in ancestors {
            let type_name = self.declared_type(&scope, segment)?;
            let candidates = self.registry.resolve_type(&type_name)?;
            scope = self.registry.try_children(&candidates)?;
        }
        let type_name = self.declared_type(&scope, terminal)?;

        let candidates = self.registry.resolve_type(&type_name)?;
        let (attributes, declares_attributes) =
            self.validate_attributes(name, &type_name, &candidates, node)?;

        let coercers = self.registry.resolve_to_parse(&type_name)?;
        if !coercers.is_empty() {
            if !node.children.is_empty() {
                let found: Vec<String> = node.children.keys().map(ToString::to_string).collect();
                return Err(Error::Validation(
                    ValidationError::new(
                        ValidationErrorKind::UnexpectedChildren,
                        format!("type {} holds a simple value", type_name),
                    )
                    .with_instance(format!("children: [{}]", found.join(", "))),
                ));
            }
            let value = try_parse(&coercers, node.text.as_deref().unwrap_or(""))?;
            if !declares_attributes && attributes.is_empty() {
                return Ok(value);
            }
            return Ok(TypedValue::Record(Record {
                attributes,
                text: Some(Box::new(value)),
                children: IndexMap::new(),
            }));
        }

        let children = self.collapse_children(&type_name, &candidates, node)?;
        let text = match node.text {
            Some(ref text) if candidates.iter().any(|c| c.mixed) => {
                Some(Box::new(TypedValue::String(text.clone())))
            }
            Some(ref text) => {
                return Err(Error::Validation(
                    ValidationError::new(
                        ValidationErrorKind::UnexpectedChildren,
                        format!("type {} does not allow character content", type_name),
                    )
                    .with_instance(text.trim().to_string()),
                ));
            }
            None => None,
        };
        Ok(TypedValue::Record(Record {
            attributes,
            text,
            children,
        }))
    }

    /// Look a segment up in `scope` and find its effective type
    fn declared_type(
        &self,
        scope: &ElementScope,
        segment: &Segment<'_>,
    ) -> Result<QName> {
        let def = scope.get(self.registry, &segment.name).ok_or_else(|| {
            Error::Validation(
                ValidationError::new(
                    ValidationErrorKind::UnknownElement,
                    format!("element {} is not allowed here", segment.name),
                )
                .with_schema_component(scope.describe(self.registry)),
            )
        })?;
        let resolved = self.registry.resolve_element(def)?;

        let override_type = xsi_attribute(segment.attributes, segment.namespaces, "type")
            .map(|value| qualify(segment.namespaces, Some(segment.name.namespace.as_str()), value))
            .transpose()?;
        override_type.or(resolved.type_name).ok_or_else(|| {
            invalid(
                ValidationErrorKind::TypeNotSpecified,
                format!("element {} declares no type", segment.name),
            )
        })
    }

    /// Coerce the attributes of `node`, also reporting whether the type declares any
    fn validate_attributes(
        &self,
        element: &QName,
        type_name: &QName,
        candidates: &[ConcreteType],
        node: &RawNode<QName, TypedValue>,
    ) -> Result<(IndexMap<String, TypedValue>, bool)> {
        let mut declared: AttributeSet = self.registry.resolve_to_attributes(type_name)?;
        for candidate in candidates {
            for (name, def) in &candidate.attributes {
                declared.entry(name.clone()).or_insert_with(|| def.clone());
            }
        }
        let any_attributes = candidates.iter().any(|c| c.any_attributes);

        let mut out = IndexMap::new();
        for (raw_name, raw_value) in &node.attributes {
            if is_reserved(raw_name, &node.namespaces) {
                continue;
            }
            let name = qualify(&node.namespaces, Some(element.namespace.as_str()), raw_name)?;
            let value = match declared.get(&name) {
                Some(def) => {
                    let attribute_type = self.registry.resolve_attribute_type(def)?;
                    let coercers = self.registry.resolve_to_parse(&attribute_type)?;
                    try_parse(&coercers, raw_value).map_err(|e| {
                        Error::Validation(
                            ValidationError::new(
                                ValidationErrorKind::InvalidAttributeValue,
                                format!("invalid value for attribute {}", name),
                            )
                            .with_instance(raw_value.clone())
                            .with_reason(e.to_string()),
                        )
                    })?
                }
                None if any_attributes => TypedValue::String(raw_value.clone()),
                None => {
                    let allowed: Vec<String> = declared.keys().map(ToString::to_string).collect();
                    return Err(Error::Validation(
                        ValidationError::new(
                            ValidationErrorKind::UnexpectedAttribute,
                            format!("attribute {} is not declared on type {}", name, type_name),
                        )
                        .with_schema_component(format!("attributes: [{}]", allowed.join(", "))),
                    ));
                }
            };
            out.insert(self.output_key(&name), value);
        }
        Ok((out, !declared.is_empty()))
    }

    /// Collapse singular children out of their sequences
    ///
    /// Candidates are tried in order; the error of the last one surfaces.
    fn collapse_children(
        &self,
        type_name: &QName,
        candidates: &[ConcreteType],
        node: &RawNode<QName, TypedValue>,
    ) -> Result<IndexMap<String, TypedValue>> {
        if node.children.is_empty() {
            return Ok(IndexMap::new());
        }
        let mut last_error = None;
        for candidate in candidates {
            match self.collapse_with(candidate, node) {
                Ok(children) => return Ok(children),
                Err(err) => last_error = Some(err),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            invalid(
                ValidationErrorKind::TypeHasNoChildren,
                format!("type {} does not expect children", type_name),
            )
        }))
    }

    fn collapse_with(
        &self,
        candidate: &ConcreteType,
        node: &RawNode<QName, TypedValue>,
    ) -> Result<IndexMap<String, TypedValue>> {
        let mut out = IndexMap::new();
        for (name, values) in &node.children {
            let multi_valued = match &candidate.content {
                ChildContent::Wildcard { is_array, .. } => is_array.unwrap_or(false),
                ChildContent::Elements(set) => {
                    let def = set.get(name).ok_or_else(|| {
                        invalid(
                            ValidationErrorKind::UnknownElement,
                            format!("element {} is not a member of type {}", name, candidate.name),
                        )
                    })?;
                    self.registry.resolve_element(def)?.is_multi_valued()
                }
                ChildContent::Empty => {
                    return Err(Error::Validation(
                        ValidationError::new(
                            ValidationErrorKind::TypeHasNoChildren,
                            format!("type {} does not expect children", candidate.name),
                        )
                        .with_schema_component(format!("candidate: {}", candidate.name)),
                    ));
                }
            };

            let value = if multi_valued {
                TypedValue::Array(values.clone())
            } else {
                match values.as_slice() {
                    [single] => single.clone(),
                    _ => {
                        return Err(Error::Validation(
                            ValidationError::new(
                                ValidationErrorKind::CardinalityMismatch,
                                format!(
                                    "element {} occurs {} times but is singular",
                                    name,
                                    values.len()
                                ),
                            )
                            .with_schema_component(format!("candidate: {}", candidate.name)),
                        ));
                    }
                }
            };
            out.insert(self.output_key(name), value);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::parsing::compile_schema;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const NS: &str = "urn:test";

    const SCHEMA: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   xmlns:t="urn:test" targetNamespace="urn:test">
          <xs:element name="root" type="t:Root"/>
          <xs:complexType name="Root">
            <xs:sequence>
              <xs:element name="count" type="xs:integer"/>
              <xs:element name="item" type="xs:string" maxOccurs="unbounded"/>
              <xs:element name="price" type="t:Price" minOccurs="0"/>
              <xs:element name="shape" type="t:Shape" minOccurs="0"/>
            </xs:sequence>
            <xs:attribute name="id" type="xs:int"/>
          </xs:complexType>
          <xs:complexType name="Price">
            <xs:simpleContent>
              <xs:extension base="xs:decimal">
                <xs:attribute name="currency" type="xs:string"/>
              </xs:extension>
            </xs:simpleContent>
          </xs:complexType>
          <xs:complexType name="Shape">
            <xs:sequence>
              <xs:element name="name" type="xs:string"/>
            </xs:sequence>
          </xs:complexType>
          <xs:complexType name="Circle">
            <xs:complexContent>
              <xs:extension base="t:Shape">
                <xs:sequence>
                  <xs:element name="radius" type="xs:double"/>
                </xs:sequence>
                <xs:attribute name="filled" type="xs:boolean"/>
              </xs:extension>
            </xs:complexContent>
          </xs:complexType>
          <xs:element name="note">
            <xs:complexType mixed="true">
              <xs:sequence>
                <xs:element name="b" type="xs:string" minOccurs="0" maxOccurs="unbounded"/>
              </xs:sequence>
            </xs:complexType>
          </xs:element>
          <xs:element name="untyped"/>
        </xs:schema>"#;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        compile_schema(&mut registry, NS, SCHEMA).unwrap();
        registry
    }

    fn validate(xml: &str) -> Result<serde_json::Value> {
        let registry = registry();
        let options = ParseOptions::default();
        let limits = Limits::default();
        let parsed = DocumentValidator::new(&registry, &options, &limits).validate(xml)?;
        Ok(serde_json::to_value(&parsed.value).unwrap())
    }

    fn kind_of(result: Result<serde_json::Value>) -> Option<ValidationErrorKind> {
        result.unwrap_err().validation_kind()
    }

    #[test]
    fn test_cardinality_collapse() {
        let value = validate(
            r#"<root xmlns="urn:test"><count>3</count><item>a</item><item>b</item></root>"#,
        )
        .unwrap();
        assert_eq!(value, json!({"count": 3, "item": ["a", "b"]}));

        let single =
            validate(r#"<root xmlns="urn:test"><count>3</count><item>a</item></root>"#).unwrap();
        assert_eq!(single, json!({"count": 3, "item": ["a"]}));
    }

    #[test]
    fn test_repeated_singular_child() {
        let result = validate(
            r#"<root xmlns="urn:test"><count>1</count><count>2</count><item>a</item></root>"#,
        );
        assert_eq!(kind_of(result), Some(ValidationErrorKind::CardinalityMismatch));
    }

    #[test]
    fn test_attributes() {
        let value = validate(r#"<root xmlns="urn:test" id="7"><count>1</count></root>"#).unwrap();
        assert_eq!(value, json!({"$": {"id": 7}, "count": 1}));

        let result = validate(r#"<root xmlns="urn:test" color="red"><count>1</count></root>"#);
        assert_eq!(kind_of(result), Some(ValidationErrorKind::UnexpectedAttribute));

        let result = validate(r#"<root xmlns="urn:test" id="x"><count>1</count></root>"#);
        assert_eq!(kind_of(result), Some(ValidationErrorKind::InvalidAttributeValue));
    }

    #[test]
    fn test_reserved_attributes_are_dropped() {
        let value = validate(
            r#"<root xmlns="urn:test" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
                     xsi:schemaLocation="urn:test root.xsd"><count>1</count></root>"#,
        )
        .unwrap();
        assert_eq!(value, json!({"count": 1}));
    }

    #[test]
    fn test_simple_content_with_attributes() {
        let value = validate(
            r#"<root xmlns="urn:test"><count>1</count><price currency="EUR">9.50</price></root>"#,
        )
        .unwrap();
        assert_eq!(
            value,
            json!({"count": 1, "price": {"$": {"currency": "EUR"}, "_": 9.5}})
        );

        let bare = validate(r#"<root xmlns="urn:test"><count>1</count><price>9.50</price></root>"#)
            .unwrap();
        assert_eq!(bare, json!({"count": 1, "price": {"_": 9.5}}));
    }

    #[test]
    fn test_polymorphic_dispatch() {
        let xml = r#"<root xmlns="urn:test" xmlns:t="urn:test"
                           xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
                       <count>1</count>
                       <shape xsi:type="t:Circle" filled="true"><name>c</name><radius>2.5</radius></shape>
                     </root>"#;
        let value = validate(xml).unwrap();
        assert_eq!(
            value["shape"],
            json!({"$": {"filled": true}, "name": "c", "radius": 2.5})
        );

        let without = r#"<root xmlns="urn:test">
                           <count>1</count>
                           <shape><name>c</name><radius>2.5</radius></shape>
                         </root>"#;
        assert_eq!(kind_of(validate(without)), Some(ValidationErrorKind::UnknownElement));
    }

    #[test]
    fn test_scalar_with_children() {
        let result = validate(r#"<root xmlns="urn:test"><count><item>a</item></count></root>"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_root() {
        assert_eq!(
            kind_of(validate(r#"<other xmlns="urn:test"/>"#)),
            Some(ValidationErrorKind::UnknownElement)
        );
    }

    #[test]
    fn test_unqualified_root() {
        assert!(matches!(
            validate("<root/>"),
            Err(Error::UnqualifiedNameNoDefault(_))
        ));
    }

    #[test]
    fn test_type_not_specified() {
        assert_eq!(
            kind_of(validate(r#"<untyped xmlns="urn:test"/>"#)),
            Some(ValidationErrorKind::TypeNotSpecified)
        );
    }

    #[test]
    fn test_text_in_element_only_content() {
        let result = validate(r#"<root xmlns="urn:test">stray<count>1</count></root>"#);
        assert_eq!(kind_of(result), Some(ValidationErrorKind::UnexpectedChildren));
    }

    #[test]
    fn test_mixed_content() {
        let value = validate(r#"<note xmlns="urn:test">Hello <b>world</b></note>"#).unwrap();
        assert_eq!(value, json!({"_": "Hello ", "b": ["world"]}));
    }

    #[test]
    fn test_coercion_failure_carries_path() {
        let err = validate(r#"<root xmlns="urn:test"><count>many</count></root>"#).unwrap_err();
        match err {
            Error::Validation(err) => {
                assert_eq!(err.kind, ValidationErrorKind::CoercionFailed);
                assert_eq!(err.path.as_deref(), Some("/{urn:test}root/{urn:test}count"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    const WILDCARDS: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="urn:test">
          <xs:element name="one">
            <xs:complexType>
              <xs:sequence><xs:any/></xs:sequence>
            </xs:complexType>
          </xs:element>
          <xs:element name="box">
            <xs:complexType>
              <xs:sequence><xs:any maxOccurs="unbounded"/></xs:sequence>
              <xs:anyAttribute/>
            </xs:complexType>
          </xs:element>
          <xs:element name="memo" type="xs:string"/>
        </xs:schema>"#;

    fn validate_wildcards(xml: &str) -> Result<serde_json::Value> {
        let mut registry = TypeRegistry::new();
        compile_schema(&mut registry, NS, WILDCARDS).unwrap();
        let options = ParseOptions::default();
        let limits = Limits::default();
        let parsed = DocumentValidator::new(&registry, &options, &limits).validate(xml)?;
        Ok(serde_json::to_value(&parsed.value).unwrap())
    }

    #[test]
    fn test_singular_wildcard_collapses() {
        let value = validate_wildcards(r#"<one xmlns="urn:test"><memo>x</memo></one>"#).unwrap();
        assert_eq!(value, json!({"memo": "x"}));

        let result =
            validate_wildcards(r#"<one xmlns="urn:test"><memo>x</memo><memo>y</memo></one>"#);
        assert_eq!(kind_of(result), Some(ValidationErrorKind::CardinalityMismatch));
    }

    #[test]
    fn test_unbounded_wildcard_and_any_attribute() {
        let value =
            validate_wildcards(r#"<box xmlns="urn:test" k="v"><memo>x</memo></box>"#).unwrap();
        assert_eq!(value, json!({"$": {"k": "v"}, "memo": ["x"]}));

        let result = validate_wildcards(r#"<one xmlns="urn:test" k="v"><memo>x</memo></one>"#);
        assert_eq!(kind_of(result), Some(ValidationErrorKind::UnexpectedAttribute));
    }

    #[test]
    fn test_namespaced_output() {
        let registry = registry();
        let options = ParseOptions::default().with_output_with_namespace(true);
        let limits = Limits::default();
        let parsed = DocumentValidator::new(&registry, &options, &limits)
            .validate(r#"<root xmlns="urn:test" id="1"><count>3</count></root>"#)
            .unwrap();
        assert_eq!(parsed.root, "{urn:test}root");
        assert_eq!(
            parsed.to_json(&options.clone().with_attr_key("@")),
            json!({"{urn:test}root": {"@": {"{urn:test}id": 1}, "{urn:test}count": 3}})
        );
        assert_eq!(
            serde_json::to_value(&parsed.value).unwrap(),
            json!({"$": {"{urn:test}id": 1}, "{urn:test}count": 3})
        );
    }
}

//! End-to-end tests: compile schemas, parse documents, check the typed output

use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::PathBuf;
use xmlxsd::{Error, ParseOptions, SchemaParser, TypedValue, ValidationErrorKind};

const NS: &str = "urn:example";

fn fixtures_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixtures_dir().join(name)).unwrap()
}

fn schema(body: &str) -> String {
    format!(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                      xmlns:e="urn:example" targetNamespace="urn:example">{}</xs:schema>"#,
        body
    )
}

const ROOT_SCHEMA: &str = r#"
    <xs:element name="root">
      <xs:complexType>
        <xs:sequence>
          <xs:element name="count" type="xs:integer"/>
          <xs:element name="item" type="xs:string" maxOccurs="unbounded"/>
        </xs:sequence>
      </xs:complexType>
    </xs:element>"#;

fn parser_with(body: &str) -> SchemaParser {
    let parser = SchemaParser::new();
    parser.add_schema(NS, &schema(body)).unwrap();
    parser
}

fn to_json(parser: &SchemaParser, xml: &str) -> xmlxsd::Result<serde_json::Value> {
    let options = ParseOptions::default();
    Ok(parser.parse_document(xml, &options)?.to_json(&options))
}

// ============================================================================
// Document shape
// ============================================================================

#[test]
fn test_end_to_end_example() {
    let parser = parser_with(ROOT_SCHEMA);
    let value = to_json(
        &parser,
        r#"<root xmlns="urn:example"><count>3</count><item>a</item><item>b</item></root>"#,
    )
    .unwrap();
    assert_eq!(value, json!({"root": {"count": 3, "item": ["a", "b"]}}));
}

#[test]
fn test_repeated_singular_element_fails() {
    let parser = parser_with(ROOT_SCHEMA);
    let err = to_json(
        &parser,
        r#"<root xmlns="urn:example"><count>3</count><count>4</count><item>a</item></root>"#,
    )
    .unwrap_err();
    assert_eq!(err.validation_kind(), Some(ValidationErrorKind::CardinalityMismatch));
}

#[test]
fn test_undeclared_attribute_fails() {
    let parser = parser_with(ROOT_SCHEMA);
    let err = to_json(
        &parser,
        r#"<root xmlns="urn:example" extra="1"><count>3</count><item>a</item></root>"#,
    )
    .unwrap_err();
    assert_eq!(err.validation_kind(), Some(ValidationErrorKind::UnexpectedAttribute));
}

#[test]
fn test_unbounded_element_stays_a_sequence() {
    let parser = parser_with(ROOT_SCHEMA);
    let options = ParseOptions::default();
    let parsed = parser
        .parse_document(
            r#"<root xmlns="urn:example"><count>1</count><item>only</item></root>"#,
            &options,
        )
        .unwrap();
    assert_eq!(
        parsed.value.get("item"),
        Some(&TypedValue::Array(vec![TypedValue::from("only")]))
    );
    assert_eq!(parsed.value.get("count"), Some(&TypedValue::Integer(1)));
}

// ============================================================================
// Type resolution
// ============================================================================

#[test]
fn test_polymorphic_dispatch() {
    let parser = parser_with(
        r#"
        <xs:element name="zoo">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="animal" type="e:Animal" maxOccurs="unbounded"/>
            </xs:sequence>
          </xs:complexType>
        </xs:element>
        <xs:complexType name="Animal">
          <xs:sequence>
            <xs:element name="name" type="xs:string"/>
          </xs:sequence>
        </xs:complexType>
        <xs:complexType name="Bird">
          <xs:complexContent>
            <xs:extension base="e:Animal">
              <xs:sequence>
                <xs:element name="wingspan" type="xs:decimal"/>
              </xs:sequence>
              <xs:attribute name="flies" type="xs:boolean"/>
            </xs:extension>
          </xs:complexContent>
        </xs:complexType>"#,
    );
    let value = to_json(
        &parser,
        r#"<zoo xmlns="urn:example" xmlns:e="urn:example"
                xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
             <animal><name>cat</name></animal>
             <animal xsi:type="e:Bird" flies="1"><name>owl</name><wingspan>1.2</wingspan></animal>
           </zoo>"#,
    )
    .unwrap();
    assert_eq!(
        value,
        json!({"zoo": {"animal": [
            {"name": "cat"},
            {"$": {"flies": true}, "name": "owl", "wingspan": 1.2}
        ]}})
    );

    let err = to_json(
        &parser,
        r#"<zoo xmlns="urn:example"><animal flies="1"><name>owl</name></animal></zoo>"#,
    )
    .unwrap_err();
    assert_eq!(err.validation_kind(), Some(ValidationErrorKind::UnexpectedAttribute));
}

#[test]
fn test_union_backtracking() {
    let parser = parser_with(
        r#"
        <xs:simpleType name="IntOrString">
          <xs:union memberTypes="xs:integer xs:string"/>
        </xs:simpleType>
        <xs:element name="value" type="e:IntOrString"/>"#,
    );
    assert_eq!(
        to_json(&parser, r#"<value xmlns="urn:example">42</value>"#).unwrap(),
        json!({"value": 42})
    );
    assert_eq!(
        to_json(&parser, r#"<value xmlns="urn:example">hello</value>"#).unwrap(),
        json!({"value": "hello"})
    );
}

#[test]
fn test_restriction_narrows_children() {
    let parser = parser_with(
        r#"
        <xs:complexType name="Base">
          <xs:sequence>
            <xs:element name="x" type="xs:string"/>
            <xs:element name="y" type="xs:string" minOccurs="0"/>
          </xs:sequence>
        </xs:complexType>
        <xs:complexType name="Narrow">
          <xs:complexContent>
            <xs:restriction base="e:Base">
              <xs:sequence>
                <xs:element name="x" type="xs:string"/>
              </xs:sequence>
            </xs:restriction>
          </xs:complexContent>
        </xs:complexType>
        <xs:element name="narrow" type="e:Narrow"/>"#,
    );
    assert_eq!(
        to_json(&parser, r#"<narrow xmlns="urn:example"><x>1</x></narrow>"#).unwrap(),
        json!({"narrow": {"x": "1"}})
    );
    let err = to_json(&parser, r#"<narrow xmlns="urn:example"><x>1</x><y>2</y></narrow>"#)
        .unwrap_err();
    assert_eq!(err.validation_kind(), Some(ValidationErrorKind::UnknownElement));
}

#[test]
fn test_list_type() {
    let parser = parser_with(
        r#"
        <xs:simpleType name="Sizes">
          <xs:list itemType="xs:int"/>
        </xs:simpleType>
        <xs:element name="sizes" type="e:Sizes"/>"#,
    );
    assert_eq!(
        to_json(&parser, r#"<sizes xmlns="urn:example">1 2  3</sizes>"#).unwrap(),
        json!({"sizes": [1, 2, 3]})
    );
}

// ============================================================================
// Fixtures
// ============================================================================

#[test]
fn test_order_fixture() {
    let parser = SchemaParser::new();
    parser
        .add_schema("http://example.com/common", &fixture("common.xsd"))
        .unwrap();
    let pending = parser
        .add_schema("http://example.com/order", &fixture("order.xsd"))
        .unwrap();
    assert!(pending.contains("http://example.com/common", "common.xsd"));

    let value = to_json(&parser, &fixture("order.xml")).unwrap();
    assert_eq!(
        value,
        json!({"order": {
            "$": {"rush": true},
            "code": "A-17",
            "placed": "2024-03-01T09:30:00.000Z",
            "total": {"$": {"currency": "EUR"}, "_": 12.5},
            "line": [{"sku": "pen", "quantity": 2}]
        }})
    );
}

#[test]
fn test_namespaced_output() {
    let parser = parser_with(ROOT_SCHEMA);
    let options = ParseOptions::default().with_output_with_namespace(true);
    let parsed = parser
        .parse_document(
            r#"<e:root xmlns:e="urn:example"><e:count>3</e:count><e:item>a</e:item></e:root>"#,
            &options,
        )
        .unwrap();
    assert_eq!(
        parsed.to_json(&options),
        json!({"{urn:example}root": {"{urn:example}count": 3, "{urn:example}item": ["a"]}})
    );
}

#[test]
fn test_invalid_schema_is_rejected() {
    let parser = SchemaParser::new();
    let err = parser
        .add_schema(
            NS,
            &schema(
                r#"<xs:complexType name="Both">
                     <xs:simpleContent><xs:extension base="xs:string"/></xs:simpleContent>
                     <xs:complexContent><xs:extension base="xs:anyType"/></xs:complexContent>
                   </xs:complexType>"#,
            ),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSchema(_)));
    assert!(parser.known_schemas().unwrap().is_empty());
}

#[test]
fn test_malformed_document() {
    let parser = parser_with(ROOT_SCHEMA);
    assert!(matches!(
        to_json(&parser, r#"<root xmlns="urn:example"><count>1</root>"#),
        Err(Error::Xml(_))
    ));
}

//! Schema dependency resolution tests
//!
//! Auto-discovery runs against in-memory and on-disk fetchers; no network.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::PathBuf;
use xmlxsd::{Error, Loader, MemoryFetcher, ParseOptions, SchemaParser, Settings};

fn fixtures_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path
}

fn schema(namespace: &str, body: &str) -> String {
    format!(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                      targetNamespace="{}">{}</xs:schema>"#,
        namespace, body
    )
}

fn cyclic_fetcher() -> MemoryFetcher {
    MemoryFetcher::new()
        .with_document(
            "http://example.com/a.xsd",
            schema(
                "urn:a",
                r#"<xs:import namespace="urn:b" schemaLocation="b.xsd"/>
                   <xs:element name="a" type="xs:string"/>"#,
            ),
        )
        .with_document(
            "http://example.com/b.xsd",
            schema(
                "urn:b",
                r#"<xs:import namespace="urn:a" schemaLocation="a.xsd"/>
                   <xs:element name="b" type="xs:int"/>"#,
            ),
        )
}

const DOCUMENT: &str = r#"<a xmlns="urn:a"
        xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
        xsi:schemaLocation="urn:a http://example.com/a.xsd">text</a>"#;

#[test]
fn test_import_cycle_terminates() {
    let parser = SchemaParser::new().with_fetcher(cyclic_fetcher());
    let options = ParseOptions::default().with_download_schemas(true);
    let parsed = parser.parse_document(DOCUMENT, &options).unwrap();
    assert_eq!(parsed.to_json(&options), json!({"a": "text"}));

    let known = parser.known_schemas().unwrap();
    assert_eq!(known.len(), 2);
    assert_eq!(known["urn:a"].len(), 1);
    assert_eq!(known["urn:b"].len(), 1);

    let registry = parser.registry().unwrap();
    assert!(registry.is_downloaded("urn:b", "http://example.com/b.xsd"));
}

#[test]
fn test_download_is_memoized() {
    let parser = SchemaParser::new().with_fetcher(cyclic_fetcher());
    let first = parser
        .download_and_add_schema("urn:a", "http://example.com/a.xsd")
        .unwrap();
    assert_eq!(
        first.iter().collect::<Vec<_>>(),
        vec![("urn:b", "http://example.com/b.xsd")]
    );
    let second = parser
        .download_and_add_schema("urn:a", "http://example.com/a.xsd")
        .unwrap();
    assert!(second.is_empty());
}

#[test]
fn test_strict_mode_without_schema() {
    let parser = SchemaParser::new().with_fetcher(cyclic_fetcher());
    let err = parser
        .parse_document(DOCUMENT, &ParseOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::SchemaUnavailable { ref namespace, .. } if namespace == "urn:a"
    ));
    assert!(parser.known_schemas().unwrap().is_empty());
}

#[test]
fn test_missing_dependency_fails() {
    let fetcher = MemoryFetcher::new().with_document(
        "http://example.com/a.xsd",
        schema("urn:a", r#"<xs:import namespace="urn:b" schemaLocation="gone.xsd"/>"#),
    );
    let parser = SchemaParser::new().with_fetcher(fetcher);
    let options = ParseOptions::default().with_download_schemas(true);
    let err = parser.parse_document(DOCUMENT, &options).unwrap_err();
    assert_eq!(
        err.to_string(),
        "error downloading urn:b schema (http://example.com/gone.xsd): HTTP status code 404"
    );
}

#[test]
fn test_target_namespace_mismatch() {
    let fetcher = MemoryFetcher::new()
        .with_document("http://example.com/a.xsd", schema("urn:other", ""));
    let parser = SchemaParser::new().with_fetcher(fetcher);
    let err = parser
        .download_and_add_schema("urn:a", "http://example.com/a.xsd")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSchema(_)));
    assert!(!parser
        .registry()
        .unwrap()
        .is_downloaded("urn:a", "http://example.com/a.xsd"));
}

#[test]
fn test_local_files_with_relative_imports() {
    let parser = SchemaParser::new().with_fetcher(Loader::new().with_allow_remote(false));
    let order = fixtures_dir().join("order.xsd");
    let pending = parser
        .download_and_add_schema("http://example.com/order", &order.to_string_lossy())
        .unwrap();
    let common = fixtures_dir().join("common.xsd");
    assert!(pending.contains("http://example.com/common", &common.to_string_lossy()));
}

#[test]
fn test_settings_preload_with_discovery() {
    let settings = Settings::from_file(fixtures_dir().join("xmlxsd.toml")).unwrap();
    assert!(settings.options.download_schemas);

    let parser = SchemaParser::from_settings(&settings).unwrap();
    let known = parser.known_schemas().unwrap();
    assert!(known.contains_key("http://example.com/order"));
    assert!(known.contains_key("http://example.com/common"));
}

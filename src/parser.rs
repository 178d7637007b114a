//! Schema-aware document parser
//!
//! [`SchemaParser`] owns a [`TypeRegistry`] and exposes the operations a
//! caller needs: compile schemas, fetch schemas, and parse documents into
//! typed values.
//!
//! ```rust,ignore
//! use xmlxsd::{ParseOptions, SchemaParser};
//!
//! let parser = SchemaParser::new();
//! parser.add_schema("urn:order", &std::fs::read_to_string("order.xsd")?)?;
//! let parsed = parser.parse_document(&xml, &ParseOptions::default())?;
//! println!("{}", parsed.to_json(&ParseOptions::default()));
//! ```
//!
//! Schemas are compiled before a document is validated, never while it is:
//! validation holds a read lock on the registry for its whole duration.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::documents::Document;
use crate::error::Result;
use crate::limits::Limits;
use crate::loaders::{Loader, SchemaFetcher};
use crate::settings::{ParseOptions, Settings};
use crate::validators::imports::{
    check_available, download_and_add, find_schema_locations, read_registry, write_registry,
    DependencyResolver, SchemaLocations,
};
use crate::validators::parsing::compile_schema;
use crate::validators::schemas::TypeRegistry;
use crate::validators::validation::{DocumentValidator, ParsedDocument};

/// Compiles schemas and parses documents against them
pub struct SchemaParser {
    registry: RwLock<TypeRegistry>,
    fetcher: Arc<dyn SchemaFetcher>,
    limits: Limits,
    max_parallel_fetches: usize,
}

impl fmt::Debug for SchemaParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaParser")
            .field("limits", &self.limits)
            .field("max_parallel_fetches", &self.max_parallel_fetches)
            .finish_non_exhaustive()
    }
}

impl Default for SchemaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaParser {
    /// Create a parser with an empty registry and the default [`Loader`]
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(TypeRegistry::new()),
            fetcher: Arc::new(Loader::new()),
            limits: Limits::default(),
            max_parallel_fetches: 4,
        }
    }

    /// Use another schema source
    pub fn with_fetcher(mut self, fetcher: impl SchemaFetcher + 'static) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    /// Set the resource limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Bound concurrent fetches during auto-discovery
    pub fn with_max_parallel_fetches(mut self, max: usize) -> Self {
        self.max_parallel_fetches = max.max(1);
        self
    }

    /// Build a parser from a configuration file and preload its schemas
    ///
    /// Dependencies of preloaded schemas are fetched too when the settings
    /// enable schema downloads.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let loader = Loader::new()
            .with_limits(settings.limits.clone())
            .with_allow_remote(settings.http.allow_remote)
            .with_timeout(settings.http.timeout());
        let parser = Self::new()
            .with_fetcher(loader)
            .with_limits(settings.limits.clone())
            .with_max_parallel_fetches(settings.http.max_parallel_fetches);

        let mut pending = SchemaLocations::new();
        for (namespace, path) in &settings.schemas {
            let location = path.to_string_lossy();
            pending.extend(&parser.download_and_add_schema(namespace, &location)?);
        }
        if settings.options.download_schemas && !pending.is_empty() {
            parser.resolver().resolve(pending)?;
        }
        Ok(parser)
    }

    fn resolver(&self) -> DependencyResolver<'_> {
        DependencyResolver::new(&self.registry, self.fetcher.as_ref(), &self.limits)
            .with_max_parallel_fetches(self.max_parallel_fetches)
    }

    /// Compile one schema document into the registry
    ///
    /// Returns the `import`/`include` targets it names. Adding the same text
    /// twice for the same namespace is a no-op.
    pub fn add_schema(&self, namespace: &str, text: &str) -> Result<SchemaLocations> {
        let mut registry = write_registry(&self.registry)?;
        if registry.is_compiled(namespace, text) {
            return Ok(SchemaLocations::new());
        }
        self.limits.check_schema_documents(registry.schema_count() + 1)?;
        compile_schema(&mut registry, namespace, text)
    }

    /// Fetch a schema and compile it, once per (namespace, location)
    pub fn download_and_add_schema(&self, namespace: &str, location: &str) -> Result<SchemaLocations> {
        download_and_add(
            &self.registry,
            self.fetcher.as_ref(),
            &self.limits,
            namespace,
            location,
        )
    }

    /// Schema-location hints declared by a document
    pub fn find_schemas(&self, xml: &str) -> Result<SchemaLocations> {
        let document = Document::parse_with_limits(xml, &self.limits)?;
        find_schema_locations(document.root())
    }

    /// Parse a document into its typed value tree
    ///
    /// With `download_schemas` the document's schema hints are fetched along
    /// with everything they import; otherwise every hinted namespace must
    /// already be compiled.
    pub fn parse_document(&self, xml: &str, options: &ParseOptions) -> Result<ParsedDocument> {
        let found = self.find_schemas(xml)?;
        if options.download_schemas {
            self.resolver().resolve(found)?;
        } else {
            check_available(&*read_registry(&self.registry)?, &found)?;
        }

        let registry = read_registry(&self.registry)?;
        debug!(types = registry.type_count(), "validating document");
        DocumentValidator::new(&registry, options, &self.limits).validate(xml)
    }

    /// Compiled schema texts per namespace
    pub fn known_schemas(&self) -> Result<IndexMap<String, IndexSet<String>>> {
        Ok(read_registry(&self.registry)?.known_schemas().clone())
    }

    /// Read access to the registry
    pub fn registry(&self) -> Result<RwLockReadGuard<'_, TypeRegistry>> {
        read_registry(&self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::loaders::MemoryFetcher;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const ORDER: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="urn:order" elementFormDefault="qualified">
          <xs:element name="order">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="id" type="xs:int"/>
              </xs:sequence>
            </xs:complexType>
          </xs:element>
        </xs:schema>"#;

    const DOCUMENT: &str = r#"<order xmlns="urn:order"
            xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
            xsi:schemaLocation="urn:order order.xsd"><id>5</id></order>"#;

    #[test]
    fn test_add_schema_is_idempotent() {
        let parser = SchemaParser::new();
        parser.add_schema("urn:order", ORDER).unwrap();
        assert!(parser.add_schema("urn:order", ORDER).unwrap().is_empty());
        assert_eq!(parser.known_schemas().unwrap()["urn:order"].len(), 1);
    }

    #[test]
    fn test_parse_with_preloaded_schema() {
        let parser = SchemaParser::new();
        parser.add_schema("urn:order", ORDER).unwrap();
        let options = ParseOptions::default();
        let parsed = parser.parse_document(DOCUMENT, &options).unwrap();
        assert_eq!(parsed.to_json(&options), json!({"order": {"id": 5}}));
    }

    #[test]
    fn test_strict_mode_requires_schema() {
        let parser = SchemaParser::new();
        let err = parser
            .parse_document(DOCUMENT, &ParseOptions::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "schema urn:order (order.xsd) unavailable and automatic downloading not enabled"
        );
    }

    #[test]
    fn test_parse_with_download() {
        let parser = SchemaParser::new()
            .with_fetcher(MemoryFetcher::new().with_document("order.xsd", ORDER));
        let options = ParseOptions::default().with_download_schemas(true);
        let parsed = parser.parse_document(DOCUMENT, &options).unwrap();
        assert_eq!(parsed.root, "order");
        assert!(parser.registry().unwrap().is_downloaded("urn:order", "order.xsd"));
    }

    #[test]
    fn test_find_schemas() {
        let parser = SchemaParser::new();
        let found = parser.find_schemas(DOCUMENT).unwrap();
        assert!(found.contains("urn:order", "order.xsd"));
        assert!(parser.known_schemas().unwrap().is_empty());
    }

    #[test]
    fn test_schema_limit() {
        let parser = SchemaParser::new().with_limits(Limits {
            max_schema_documents: 0,
            ..Limits::default()
        });
        assert!(matches!(
            parser.add_schema("urn:order", ORDER),
            Err(Error::LimitExceeded(_))
        ));
    }
}

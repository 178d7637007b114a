//! Schema dependency resolution
//!
//! A document names the schemas it needs through `xsi:schemaLocation`
//! hints, and every schema names further ones through `import` and
//! `include`. Two policies decide what happens with them:
//!
//! - strict: every hinted namespace must already have a compiled schema
//! - auto-discovery: hinted schemas are fetched and compiled breadth-first,
//!   round by round, until a round discovers nothing new
//!
//! Already fetched (namespace, location) pairs are never queued again, so
//! import cycles terminate.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use super::parsing::compile_schema;
use super::schemas::TypeRegistry;
use crate::documents::Element;
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::loaders::SchemaFetcher;
use crate::locations::resolve_location;
use crate::namespaces::XSI_NAMESPACE;

/// Schema locations grouped by namespace, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SchemaLocations {
    entries: IndexMap<String, IndexSet<String>>,
}

impl SchemaLocations {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a location for a namespace; returns `false` if already present
    pub fn add(&mut self, namespace: &str, location: &str) -> bool {
        self.entries
            .entry(namespace.to_string())
            .or_default()
            .insert(location.to_string())
    }

    /// Check for a (namespace, location) pair
    pub fn contains(&self, namespace: &str, location: &str) -> bool {
        self.entries
            .get(namespace)
            .is_some_and(|locations| locations.contains(location))
    }

    /// Locations of a namespace
    pub fn get(&self, namespace: &str) -> Option<&IndexSet<String>> {
        self.entries.get(namespace)
    }

    /// Namespaces with at least one location
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All (namespace, location) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(namespace, locations)| {
            locations
                .iter()
                .map(move |location| (namespace.as_str(), location.as_str()))
        })
    }

    /// Number of (namespace, location) pairs
    pub fn len(&self) -> usize {
        self.entries.values().map(IndexSet::len).sum()
    }

    /// Check whether there are no pairs
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add every pair of `other`
    pub fn extend(&mut self, other: &SchemaLocations) {
        for (namespace, location) in other.iter() {
            self.add(namespace, location);
        }
    }
}

pub(crate) fn read_registry(lock: &RwLock<TypeRegistry>) -> Result<RwLockReadGuard<'_, TypeRegistry>> {
    lock.read()
        .map_err(|_| Error::Other("type registry lock poisoned".to_string()))
}

pub(crate) fn write_registry(
    lock: &RwLock<TypeRegistry>,
) -> Result<RwLockWriteGuard<'_, TypeRegistry>> {
    lock.write()
        .map_err(|_| Error::Other("type registry lock poisoned".to_string()))
}

/// Collect the `xsi:schemaLocation` hints of a document tree
pub fn find_schema_locations(root: &Element) -> Result<SchemaLocations> {
    let mut found = SchemaLocations::new();
    for element in root.descendants() {
        let Some(hint) = element.get_attribute_ns(XSI_NAMESPACE, "schemaLocation") else {
            continue;
        };
        let tokens: Vec<&str> = hint.split_whitespace().collect();
        if tokens.len() % 2 != 0 {
            return Err(Error::Xml(format!(
                "xsi:schemaLocation of '{}' must hold namespace and location pairs: '{}'",
                element.name, hint
            )));
        }
        for pair in tokens.chunks(2) {
            found.add(pair[0], pair[1]);
        }
    }
    Ok(found)
}

/// Strict policy: every hinted namespace needs a compiled schema
///
/// Only presence is checked, not whether the hinted location is the one
/// that was compiled.
pub fn check_available(registry: &TypeRegistry, found: &SchemaLocations) -> Result<()> {
    for namespace in found.namespaces() {
        if !registry.has_namespace(namespace) {
            return Err(Error::SchemaUnavailable {
                namespace: namespace.to_string(),
                locations: found
                    .get(namespace)
                    .map(|locations| locations.iter().cloned().collect())
                    .unwrap_or_default(),
            });
        }
    }
    Ok(())
}

/// Fetch a schema and compile it, memoized per (namespace, location)
///
/// Returned dependencies are resolved against `location`.
pub fn download_and_add(
    registry: &RwLock<TypeRegistry>,
    fetcher: &dyn SchemaFetcher,
    limits: &Limits,
    namespace: &str,
    location: &str,
) -> Result<SchemaLocations> {
    if read_registry(registry)?.is_downloaded(namespace, location) {
        return Ok(SchemaLocations::new());
    }

    debug!(namespace, location, "fetching schema");
    let failed = |reason: String| Error::DependencyFetchFailed {
        namespace: namespace.to_string(),
        url: location.to_string(),
        reason,
    };
    let response = fetcher.fetch(location).map_err(|e| failed(e.to_string()))?;
    if response.status != 200 {
        return Err(failed(format!("HTTP status code {}", response.status)));
    }

    let dependencies = {
        let mut registry = write_registry(registry)?;
        if !registry.is_compiled(namespace, &response.body) {
            limits.check_schema_documents(registry.schema_count() + 1)?;
        }
        let dependencies = compile_schema(&mut registry, namespace, &response.body)?;
        registry.mark_downloaded(namespace, location);
        dependencies
    };

    let mut resolved = SchemaLocations::new();
    for (dependency, dependency_location) in dependencies.iter() {
        resolved.add(dependency, &resolve_location(Some(location), dependency_location));
    }
    Ok(resolved)
}

/// Breadth-first auto-discovery of schema dependencies
pub struct DependencyResolver<'a> {
    registry: &'a RwLock<TypeRegistry>,
    fetcher: &'a dyn SchemaFetcher,
    limits: &'a Limits,
    max_parallel_fetches: usize,
}

impl<'a> DependencyResolver<'a> {
    /// Create a resolver over a shared registry
    pub fn new(
        registry: &'a RwLock<TypeRegistry>,
        fetcher: &'a dyn SchemaFetcher,
        limits: &'a Limits,
    ) -> Self {
        Self {
            registry,
            fetcher,
            limits,
            max_parallel_fetches: 4,
        }
    }

    /// Bound the number of concurrent fetches per round
    pub fn with_max_parallel_fetches(mut self, max: usize) -> Self {
        self.max_parallel_fetches = max.max(1);
        self
    }

    /// Fetch and compile `initial` and everything it transitively depends on
    ///
    /// The first failing fetch or compile aborts the resolution.
    pub fn resolve(&self, initial: SchemaLocations) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_parallel_fetches)
            .build()
            .map_err(|e| Error::Other(format!("failed to start fetch pool: {}", e)))?;

        let mut frontier = self.unfetched(&initial)?;
        let mut round = 0;
        while !frontier.is_empty() {
            round += 1;
            info!(round, schemas = frontier.len(), "resolving schema dependencies");

            let pairs: Vec<(&str, &str)> = frontier.iter().collect();
            let results: Vec<Result<SchemaLocations>> = pool.install(|| {
                pairs
                    .par_iter()
                    .map(|(namespace, location)| {
                        download_and_add(
                            self.registry,
                            self.fetcher,
                            self.limits,
                            namespace,
                            location,
                        )
                    })
                    .collect()
            });

            let mut discovered = SchemaLocations::new();
            for result in results {
                discovered.extend(&result?);
            }
            frontier = self.unfetched(&discovered)?;
        }
        Ok(())
    }

    fn unfetched(&self, candidates: &SchemaLocations) -> Result<SchemaLocations> {
        let registry = read_registry(self.registry)?;
        let mut out = SchemaLocations::new();
        for (namespace, location) in candidates.iter() {
            if !registry.is_downloaded(namespace, location) {
                out.add(namespace, location);
            }
        }
        Ok(out)
    }
}

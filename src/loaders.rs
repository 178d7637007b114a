//! Schema fetching
//!
//! The dependency resolver talks to the outside world only through the
//! [`SchemaFetcher`] trait. [`Loader`] reads local files and, with the
//! `http` feature, remote URLs; [`MemoryFetcher`] serves a fixed map and is
//! used for offline setups and tests.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::Location;
use indexmap::IndexMap;
use std::fs;
use std::io::ErrorKind;
use std::time::Duration;

/// Outcome of one fetch: a status code and the response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP-style status code (200 on success)
    pub status: u16,
    /// Response body
    pub body: String,
}

impl FetchResponse {
    /// Successful response with a body
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// Response carrying only a status
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

/// Source of schema documents
///
/// Any status other than 200, or an `Err`, is treated as a failed
/// dependency by the caller.
pub trait SchemaFetcher: Send + Sync {
    /// Fetch the document at `location`
    fn fetch(&self, location: &str) -> Result<FetchResponse>;
}

/// Resource loader for schema files and URLs
#[derive(Debug)]
pub struct Loader {
    /// Resource limits
    limits: Limits,
    /// Whether to allow remote resources
    allow_remote: bool,
    /// Timeout for remote requests
    timeout: Duration,
    #[cfg(feature = "http")]
    client: once_cell::sync::OnceCell<reqwest::blocking::Client>,
}

impl Loader {
    /// Create a new loader with default settings
    pub fn new() -> Self {
        Self {
            limits: Limits::default(),
            allow_remote: true,
            timeout: Duration::from_secs(30),
            #[cfg(feature = "http")]
            client: once_cell::sync::OnceCell::new(),
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set whether to allow remote resources
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }

    /// Set the timeout for remote requests
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn load_file(&self, path: &std::path::Path) -> Result<FetchResponse> {
        match fs::read_to_string(path) {
            Ok(content) => {
                self.limits.check_xml_size(content.len())?;
                Ok(FetchResponse::ok(content))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FetchResponse::status(404)),
            Err(e) => Err(Error::Io(e)),
        }
    }

    #[cfg(feature = "http")]
    fn load_url(&self, url: &url::Url) -> Result<FetchResponse> {
        let client = self.client.get_or_try_init(|| {
            reqwest::blocking::Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| Error::Other(format!("failed to build HTTP client: {}", e)))
        })?;

        let response = client
            .get(url.clone())
            .send()
            .map_err(|e| Error::Other(format!("request failed: {}", e)))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| Error::Other(format!("failed to read response body: {}", e)))?;
        self.limits.check_xml_size(body.len())?;
        Ok(FetchResponse { status, body })
    }

    #[cfg(not(feature = "http"))]
    fn load_url(&self, url: &url::Url) -> Result<FetchResponse> {
        Err(Error::Other(format!(
            "cannot fetch {}: built without the `http` feature",
            url
        )))
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaFetcher for Loader {
    fn fetch(&self, location: &str) -> Result<FetchResponse> {
        match location.parse::<Location>()? {
            Location::Path(path) => self.load_file(&path),
            Location::Url(url) => {
                if !self.allow_remote {
                    return Err(Error::Other(format!(
                        "remote resources are not allowed: {}",
                        url
                    )));
                }
                tracing::debug!(%url, "fetching remote schema");
                self.load_url(&url)
            }
            Location::String(s) => self.load_file(std::path::Path::new(&s)),
        }
    }
}

/// Fetcher serving schema documents from memory
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    documents: IndexMap<String, String>,
}

impl MemoryFetcher {
    /// Create an empty fetcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document, builder style
    pub fn with_document(mut self, location: impl Into<String>, body: impl Into<String>) -> Self {
        self.insert(location, body);
        self
    }

    /// Add a document
    pub fn insert(&mut self, location: impl Into<String>, body: impl Into<String>) {
        self.documents.insert(location.into(), body.into());
    }
}

impl SchemaFetcher for MemoryFetcher {
    fn fetch(&self, location: &str) -> Result<FetchResponse> {
        Ok(match self.documents.get(location) {
            Some(body) => FetchResponse::ok(body.clone()),
            None => FetchResponse::status(404),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "<root>test</root>").unwrap();

        let loader = Loader::new();
        let response = loader.fetch(&file.path().to_string_lossy()).unwrap();

        assert_eq!(response.status, 200);
        assert!(response.body.contains("<root>test</root>"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.xsd");
        let response = Loader::new().fetch(&missing.to_string_lossy()).unwrap();
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_size_limit() {
        let mut file = NamedTempFile::new().unwrap();
        let large_content = "x".repeat(11 * 1024 * 1024); // 11 MB
        write!(file, "{}", large_content).unwrap();

        let loader = Loader::new().with_limits(Limits::strict());
        let result = loader.fetch(&file.path().to_string_lossy());

        assert!(matches!(result, Err(Error::LimitExceeded(_))));
    }

    #[test]
    fn test_remote_disabled() {
        let loader = Loader::new().with_allow_remote(false);
        assert!(loader.fetch("http://example.com/a.xsd").is_err());
    }

    #[test]
    fn test_memory_fetcher() {
        let fetcher = MemoryFetcher::new().with_document("a.xsd", "<schema/>");
        assert_eq!(fetcher.fetch("a.xsd").unwrap(), FetchResponse::ok("<schema/>"));
        assert_eq!(fetcher.fetch("b.xsd").unwrap().status, 404);
    }
}

//! Configuration
//!
//! [`ParseOptions`] controls one `parse_document` call. [`Settings`] is the
//! file-level configuration read by the command line tool.
//!
//! ## Example config file (xmlxsd.toml):
//! ```toml
//! [options]
//! download_schemas = true
//! output_with_namespace = false
//!
//! [schemas]
//! "http://example.com/order" = "schemas/order.xsd"
//!
//! [http]
//! timeout_secs = 10
//! allow_remote = true
//! max_parallel_fetches = 4
//!
//! [limits]
//! max_xml_depth = 200
//! ```

use crate::converters::{DEFAULT_ATTR_KEY, DEFAULT_CHAR_KEY};
use crate::error::{Error, Result};
use crate::limits::Limits;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options recognized by document parsing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParseOptions {
    /// Fetch missing schemas from their `schemaLocation` hints
    #[serde(default)]
    pub download_schemas: bool,

    /// Keep namespace qualification (`{uri}local`) on output keys
    #[serde(default)]
    pub output_with_namespace: bool,

    /// Key grouping attributes in JSON output
    #[serde(default = "default_attr_key")]
    pub attr_key: String,

    /// Key holding character content in JSON output
    #[serde(default = "default_char_key")]
    pub char_key: String,
}

fn default_attr_key() -> String {
    DEFAULT_ATTR_KEY.to_string()
}

fn default_char_key() -> String {
    DEFAULT_CHAR_KEY.to_string()
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            download_schemas: false,
            output_with_namespace: false,
            attr_key: default_attr_key(),
            char_key: default_char_key(),
        }
    }
}

impl ParseOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable automatic schema downloads
    pub fn with_download_schemas(mut self, download: bool) -> Self {
        self.download_schemas = download;
        self
    }

    /// Enable or disable namespace-qualified output keys
    pub fn with_output_with_namespace(mut self, namespaced: bool) -> Self {
        self.output_with_namespace = namespaced;
        self
    }

    /// Set the attribute key
    pub fn with_attr_key(mut self, key: impl Into<String>) -> Self {
        self.attr_key = key.into();
        self
    }

    /// Set the character content key
    pub fn with_char_key(mut self, key: impl Into<String>) -> Self {
        self.char_key = key.into();
        self
    }
}

/// Remote fetching configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Whether remote (http/https) locations may be fetched
    #[serde(default = "default_true")]
    pub allow_remote: bool,

    /// Upper bound on concurrent fetches within one discovery round
    #[serde(default = "default_parallel_fetches")]
    pub max_parallel_fetches: usize,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_parallel_fetches() -> usize {
    4
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            allow_remote: true,
            max_parallel_fetches: default_parallel_fetches(),
        }
    }
}

impl HttpConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Document parsing options
    #[serde(default)]
    pub options: ParseOptions,

    /// Schemas to preload, namespace URI to file path
    #[serde(default)]
    pub schemas: IndexMap<String, PathBuf>,

    /// Remote fetching
    #[serde(default)]
    pub http: HttpConfig,

    /// Resource limits
    #[serde(default)]
    pub limits: Limits,
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load settings from a TOML file
    ///
    /// Relative schema paths are resolved against the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        let mut settings = Self::from_toml_str(&text)?;
        if let Some(dir) = path.parent() {
            for schema_path in settings.schemas.values_mut() {
                if schema_path.is_relative() {
                    *schema_path = dir.join(&*schema_path);
                }
            }
        }
        Ok(settings)
    }
}

//! Schema location classification and resolution
//!
//! `schemaLocation` values found in documents and schemas may be absolute
//! URLs, file paths or relative references. Relative references are
//! resolved against the location of the schema that declared them.

use crate::error::Result;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// Resource location - can be a URL, file path, or string identifier
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// Remote URL (http, https)
    Url(Url),
    /// String identifier (for in-memory resources)
    String(String),
}

impl FromStr for Location {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(url) = Url::parse(s) {
            match url.scheme() {
                "file" => {
                    if let Ok(path) = url.to_file_path() {
                        return Ok(Location::Path(path));
                    }
                }
                "http" | "https" => return Ok(Location::Url(url)),
                _ => return Ok(Location::String(s.to_string())),
            }
        }

        let path = PathBuf::from(s);
        if path.exists() || s.starts_with('/') || s.starts_with('.') || s.ends_with(".xsd") {
            return Ok(Location::Path(path));
        }

        Ok(Location::String(s.to_string()))
    }
}

impl Location {
    /// Get the location as a string
    pub fn as_string(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::Url(u) => u.to_string(),
            Location::String(s) => s.clone(),
        }
    }

    /// Check if this is a remote location (URL)
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(_))
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }
}

/// Resolve `location` relative to the location `base` it was found in
///
/// Absolute URLs and absolute paths are returned unchanged, as is every
/// location when `base` is `None`.
pub fn resolve_location(base: Option<&str>, location: &str) -> String {
    let Some(base) = base else {
        return location.to_string();
    };
    if Url::parse(location).is_ok() || Path::new(location).is_absolute() {
        return location.to_string();
    }

    if let Ok(base_url) = Url::parse(base) {
        if matches!(base_url.scheme(), "http" | "https" | "file") {
            return match base_url.join(location) {
                Ok(joined) => joined.to_string(),
                Err(_) => location.to_string(),
            };
        }
    }

    match Path::new(base).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(location).to_string_lossy().to_string(),
        _ => location.to_string(),
    }
}

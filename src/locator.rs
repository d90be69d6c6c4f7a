//! Resource locators.
//!
//! A [`ResourceLocator`] identifies one knowledge source: either a web
//! address (`http://`, `https://`, or a bare `www.` prefix) or a filesystem
//! path. The locator is stored as an opaque string; equality is string
//! equality, so two different spellings of the same path are two distinct
//! resources.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Identifier for a single knowledge source (file, directory, or web page).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceLocator(String);

impl ResourceLocator {
    /// Wrap a raw locator string (a filesystem path or a web address).
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw locator string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this locator points at a web resource.
    pub fn is_web(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://") || self.0.starts_with("www")
    }

    /// Whether this locator currently points at a directory on disk.
    ///
    /// Web locators are never directories. A deleted directory stops being
    /// one; move detection runs before any check that depends on this.
    pub fn is_directory(&self) -> bool {
        !self.is_web() && Path::new(&self.0).is_dir()
    }

    /// The filesystem path behind this locator, `None` for web locators.
    pub fn path(&self) -> Option<&Path> {
        if self.is_web() {
            None
        } else {
            Some(Path::new(&self.0))
        }
    }

    /// Human-readable name: the full address for web locators, the last
    /// path segment otherwise.
    pub fn display_name(&self) -> String {
        if self.is_web() {
            self.0.clone()
        } else {
            self.last_segment().to_string()
        }
    }

    /// Name used for this resource's index file: the host for web locators,
    /// the last path segment otherwise.
    pub fn file_name(&self) -> String {
        if self.is_web() {
            self.host().unwrap_or(&self.0).to_string()
        } else {
            self.last_segment().to_string()
        }
    }

    /// Host portion of a web locator (scheme, path, and port stripped).
    fn host(&self) -> Option<&str> {
        if !self.is_web() {
            return None;
        }
        let rest = self
            .0
            .strip_prefix("https://")
            .or_else(|| self.0.strip_prefix("http://"))
            .unwrap_or(&self.0);
        let host = rest.split('/').next().unwrap_or(rest);
        let host = host.split(':').next().unwrap_or(host);
        if host.is_empty() {
            None
        } else {
            Some(host)
        }
    }

    fn last_segment(&self) -> &str {
        Path::new(&self.0)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Path> for ResourceLocator {
    fn from(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }
}

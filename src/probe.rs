//! Filesystem facts for the indexing engine.
//!
//! The engine never touches `std::fs` metadata directly; it asks this module
//! whether a path exists, when it was last modified, and what the immediate
//! children of a directory are. Listing is one level deep; deeper nesting
//! is discovered by the recursive pass into each child.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::locator::ResourceLocator;

/// Whether the path still exists on disk.
pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// Last modification time of the path, `None` when unavailable.
pub fn last_modified(path: &Path) -> Option<DateTime<Utc>> {
    let meta = std::fs::metadata(path).ok()?;
    let modified = meta.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}

/// Directory scanner with configurable exclusion patterns.
///
/// Hidden entries (dot-prefixed) are always skipped; `exclude_globs` adds
/// user patterns on top (matched against the entry file name).
#[derive(Debug, Clone)]
pub struct Probe {
    exclude: GlobSet,
}

impl Probe {
    pub fn new(exclude_globs: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in exclude_globs {
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self {
            exclude: builder.build()?,
        })
    }

    /// List the immediate children of `dir` as locators, in deterministic
    /// (sorted) order. Returns an empty list for non-directories and on
    /// unreadable entries.
    pub fn list_immediate_children(&self, dir: &Path) -> Vec<ResourceLocator> {
        if !dir.is_dir() {
            return Vec::new();
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
        {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let name = entry.file_name().to_string_lossy();
            if name.starts_with('.') {
                continue;
            }
            if self.exclude.is_match(name.as_ref()) {
                continue;
            }
            paths.push(entry.path().to_path_buf());
        }
        paths.sort();
        paths
            .iter()
            .map(|p| ResourceLocator::from(p.as_path()))
            .collect()
    }
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            exclude: GlobSet::empty(),
        }
    }
}

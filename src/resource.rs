//! The resource tree.
//!
//! A [`ResourceNode`] is one addressable knowledge source (a file, a
//! directory, or a web page) together with its child nodes and indexing
//! state. A [`ResourceTree`] is the ordered forest of top-level nodes the
//! application tracks, persisted as a whole to `resources.json` under the
//! index root.
//!
//! Each node owns a private on-disk index directory named by its `id`; the
//! id is assigned once at creation and never reused, so the directory name
//! is a stable storage key rather than a content hash.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::index::{self, IndexItem};
use crate::locator::ResourceLocator;
use crate::probe::{self, Probe};

/// Name of the whole-tree persistence file under the index root.
pub const TREE_FILE: &str = "resources.json";

/// Indexing lifecycle of a single node.
///
/// `Failed` marks a pass that died mid-extraction or mid-persist; the node's
/// timestamp is not advanced, so it stays stale and the next pass retries.
/// The state is a work-deduplication flag, not a lock; callers serialize
/// concurrent passes over the same node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    #[default]
    NotIndexed,
    Indexing,
    Indexed,
    Failed,
}

impl std::fmt::Display for IndexState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            IndexState::NotIndexed => "not_indexed",
            IndexState::Indexing => "indexing",
            IndexState::Indexed => "indexed",
            IndexState::Failed => "failed",
        };
        f.write_str(label)
    }
}

fn never_indexed() -> DateTime<Utc> {
    DateTime::<Utc>::MIN_UTC
}

/// One knowledge source in the tree, with its children and indexing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    pub id: Uuid,
    pub locator: ResourceLocator,
    #[serde(default)]
    pub children: Vec<ResourceNode>,
    /// Time of the last successful index pass; the minimum representable
    /// instant means "never indexed".
    #[serde(default = "never_indexed", with = "chrono::serde::ts_seconds")]
    pub prev_index_at: DateTime<Utc>,
    #[serde(default)]
    pub index_state: IndexState,
}

impl ResourceNode {
    pub fn new(locator: ResourceLocator) -> Self {
        Self {
            id: Uuid::new_v4(),
            locator,
            children: Vec::new(),
            prev_index_at: never_indexed(),
            index_state: IndexState::default(),
        }
    }

    /// A leaf has indexable content directly: no children and not a
    /// directory. A directory with zero discovered children is not a leaf;
    /// it is eligible for re-scan.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty() && !self.locator.is_directory()
    }

    /// Whether the backing path no longer exists. Web resources are never
    /// considered moved.
    pub fn was_moved(&self) -> bool {
        match self.locator.path() {
            Some(path) => !probe::exists(path),
            None => false,
        }
    }

    /// Whether the underlying content changed since the last successful
    /// pass. A missing modification time (web locators, unreadable
    /// metadata) always counts as stale.
    pub fn is_stale(&self) -> bool {
        let Some(path) = self.locator.path() else {
            return true;
        };
        match probe::last_modified(path) {
            Some(modified) => modified > self.prev_index_at,
            None => true,
        }
    }

    /// Append a child for `locator` unless one with an equal locator
    /// already exists. Returns whether a child was added.
    pub fn add_child(&mut self, locator: ResourceLocator) -> bool {
        if self.children.iter().any(|c| c.locator == locator) {
            return false;
        }
        debug!(child = %locator, "child discovered");
        self.children.push(ResourceNode::new(locator));
        true
    }

    /// Rescan one directory level and append any newly discovered entries.
    /// Existing children keep their position; nothing is ever removed here.
    pub fn refresh_children(&mut self, probe: &Probe) {
        let Some(path) = self.locator.path() else {
            return;
        };
        if !self.locator.is_directory() {
            return;
        }
        for child in probe.list_immediate_children(path) {
            self.add_child(child);
        }
    }

    /// This node's private index directory under `root`: a pure function of
    /// the node id.
    pub fn index_dir(&self, root: &Path) -> PathBuf {
        root.join(self.id.to_string())
    }

    /// Path of this node's index file inside [`index_dir`](Self::index_dir).
    pub fn index_file(&self, root: &Path) -> PathBuf {
        self.index_dir(root)
            .join(format!("{}.json", self.locator.file_name()))
    }

    /// Delete this node's on-disk index artifacts (index file and its
    /// containing directory). Best-effort: a failure is logged, not
    /// propagated.
    pub fn delete_index_artifacts(&self, root: &Path) {
        let dir = self.index_dir(root);
        if !dir.exists() {
            return;
        }
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => info!(resource = %self.locator, "removed from index"),
            Err(e) => warn!(resource = %self.locator, error = %e, "failed to remove index directory"),
        }
    }

    /// Delete index artifacts for this node and all descendants. Used for
    /// explicit user removal; the engine's move-detection only ever cleans
    /// one node at a time.
    pub fn delete_index_artifacts_recursive(&self, root: &Path) {
        self.delete_index_artifacts(root);
        for child in &self.children {
            child.delete_index_artifacts_recursive(root);
        }
    }

    /// Lazily iterate over this subtree's persisted index items: a leaf
    /// yields the items in its index file (none on load failure), a
    /// non-leaf yields its children's items in child order. Repeated calls
    /// are side-effect free.
    pub fn index_items<'a>(&'a self, root: &'a Path) -> IndexItems<'a> {
        IndexItems {
            root,
            stack: vec![self],
            current: Vec::new().into_iter(),
        }
    }
}

/// Iterator behind [`ResourceNode::index_items`]. Index files are loaded
/// one leaf at a time, as the iteration reaches them.
pub struct IndexItems<'a> {
    root: &'a Path,
    stack: Vec<&'a ResourceNode>,
    current: std::vec::IntoIter<IndexItem>,
}

impl Iterator for IndexItems<'_> {
    type Item = IndexItem;

    fn next(&mut self) -> Option<IndexItem> {
        loop {
            if let Some(item) = self.current.next() {
                return Some(item);
            }
            let node = self.stack.pop()?;
            if node.is_leaf() {
                self.current =
                    index::load_items(&node.index_dir(self.root), &node.locator.file_name())
                        .into_iter();
            } else {
                for child in node.children.iter().rev() {
                    self.stack.push(child);
                }
            }
        }
    }
}

/// The ordered forest of top-level resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceTree {
    #[serde(default)]
    pub resources: Vec<ResourceNode>,
}

impl ResourceTree {
    /// Add a top-level resource unless an equal locator is already tracked.
    /// Returns whether a node was added.
    pub fn add(&mut self, locator: ResourceLocator) -> bool {
        if self.resources.iter().any(|r| r.locator == locator) {
            return false;
        }
        self.resources.push(ResourceNode::new(locator));
        true
    }

    /// Remove the top-level resource with an equal locator, erasing its
    /// on-disk index artifacts (and its descendants'). Returns whether a
    /// node was removed.
    pub fn remove(&mut self, locator: &ResourceLocator, index_root: &Path) -> bool {
        let Some(pos) = self.resources.iter().position(|r| &r.locator == locator) else {
            return false;
        };
        let node = self.resources.remove(pos);
        node.delete_index_artifacts_recursive(index_root);
        true
    }

    pub fn find(&self, locator: &ResourceLocator) -> Option<&ResourceNode> {
        self.resources.iter().find(|r| &r.locator == locator)
    }

    /// Iterate over every persisted index item in the forest, in tree
    /// order.
    pub fn index_items<'a>(
        &'a self,
        index_root: &'a Path,
    ) -> impl Iterator<Item = IndexItem> + 'a {
        self.resources
            .iter()
            .flat_map(move |node| node.index_items(index_root))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| {
            format!(
                "failed to read resource tree {} (run `rix init` first?)",
                path.display()
            )
        })?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse resource tree {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write resource tree {}", path.display()))
    }
}

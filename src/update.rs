//! The incremental indexing engine.
//!
//! [`update_node`] is the recursive algorithm that keeps one resource
//! subtree's on-disk index fresh. Its policy checks run in a fixed order,
//! each short-circuiting the rest:
//!
//! 1. **Move/delete** — a non-web node whose backing path is gone has its
//!    index artifacts erased and is reported [`UpdateOutcome::Removed`];
//!    stale children are not visited.
//! 2. **Fan-out** — a non-leaf rescans one directory level (append-only
//!    discovery), recurses into every child sequentially, then stamps its
//!    own timestamp. A non-leaf's content is never chunked or embedded.
//! 3. **Freshness** — a leaf unmodified since its last successful pass is
//!    skipped outright; unchanged leaves cost zero extraction or embedding
//!    work.
//! 4. **Re-index** — extract, chunk, embed, persist, advance the state
//!    machine and the timestamp.
//!
//! The walk over one subtree is strictly sequential (one `&mut` borrow per
//! node); independent top-level resources are updated concurrently by
//! [`update_tree`], one task per root. Failures are isolated per node: a
//! bad extraction marks that node `Failed` and the pass moves on to
//! siblings.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::chunk::split_into_chunks;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::extract;
use crate::index::{ItemMetadata, SimilarityIndex};
use crate::probe::Probe;
use crate::resource::{IndexState, ResourceNode, ResourceTree};

/// Shared, read-only inputs for one update pass.
pub struct UpdateContext {
    pub index_root: PathBuf,
    pub probe: Probe,
    pub max_chunk_size: usize,
    pub embedder: Arc<dyn Embedder>,
    pub stats: UpdateStats,
}

impl UpdateContext {
    pub fn from_config(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        Ok(Self {
            index_root: config.index.root.clone(),
            probe: Probe::new(&config.scan.exclude_globs)?,
            max_chunk_size: config.chunking.max_chunk_size,
            embedder,
            stats: UpdateStats::default(),
        })
    }
}

/// Pass-wide counters, incremented from concurrently running root tasks.
#[derive(Debug, Default)]
pub struct UpdateStats {
    extractions: AtomicUsize,
    indexed: AtomicUsize,
    skipped: AtomicUsize,
    removed: AtomicUsize,
    failed: AtomicUsize,
    chunks: AtomicUsize,
}

impl UpdateStats {
    pub fn snapshot(&self) -> UpdateSummary {
        UpdateSummary {
            extractions: self.extractions.load(Ordering::Relaxed),
            indexed: self.indexed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            chunks: self.chunks.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`UpdateStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Extractor invocations (attempted, whether or not they succeeded).
    pub extractions: usize,
    /// Leaves re-indexed to completion.
    pub indexed: usize,
    /// Leaves skipped because their content was unchanged.
    pub skipped: usize,
    /// Nodes removed by move detection.
    pub removed: usize,
    /// Leaves whose pass failed (extraction, embedding, or persistence).
    pub failed: usize,
    /// Chunks written across all re-indexed leaves.
    pub chunks: usize,
}

/// What a completed [`update_node`] call tells the caller to do with the
/// node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The node stays in the tree.
    Kept,
    /// The backing path is gone; artifacts were erased and the caller must
    /// drop the node from its parent's children.
    Removed,
}

/// Update every top-level resource, one tokio task per root.
///
/// Roots share no mutable state, so they may run concurrently; each node is
/// moved into its task and the updated copy is put back in tree order.
/// Roots reported [`UpdateOutcome::Removed`] are dropped.
pub async fn update_tree(tree: &mut ResourceTree, cx: Arc<UpdateContext>) {
    let roots = std::mem::take(&mut tree.resources);
    let mut tasks: JoinSet<(usize, ResourceNode, UpdateOutcome)> = JoinSet::new();
    for (position, mut node) in roots.into_iter().enumerate() {
        let cx = Arc::clone(&cx);
        tasks.spawn(async move {
            let outcome = update_node(&mut node, &cx).await;
            (position, node, outcome)
        });
    }

    let mut kept: Vec<(usize, ResourceNode)> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((position, node, UpdateOutcome::Kept)) => kept.push((position, node)),
            Ok((_, _, UpdateOutcome::Removed)) => {}
            Err(e) => error!(error = %e, "resource update task failed"),
        }
    }
    kept.sort_by_key(|(position, _)| *position);
    tree.resources = kept.into_iter().map(|(_, node)| node).collect();
}

/// Recursively update one node's subtree. See the module docs for the
/// policy ordering; boxed because async recursion needs a nameable future
/// type.
pub fn update_node<'a>(
    node: &'a mut ResourceNode,
    cx: &'a UpdateContext,
) -> Pin<Box<dyn Future<Output = UpdateOutcome> + Send + 'a>> {
    Box::pin(async move {
        // Move detection takes priority over everything else; stale
        // children are not worth visiting once the parent path is gone.
        if node.was_moved() {
            node.delete_index_artifacts(&cx.index_root);
            cx.stats.removed.fetch_add(1, Ordering::Relaxed);
            return UpdateOutcome::Removed;
        }

        if !node.is_leaf() {
            node.refresh_children(&cx.probe);
            let children = std::mem::take(&mut node.children);
            let mut kept = Vec::with_capacity(children.len());
            for mut child in children {
                match update_node(&mut child, cx).await {
                    UpdateOutcome::Kept => kept.push(child),
                    UpdateOutcome::Removed => {}
                }
            }
            node.children = kept;
            // Stamped after all children: marks the fan-out pass complete.
            node.prev_index_at = Utc::now();
            return UpdateOutcome::Kept;
        }

        if !node.is_stale() {
            debug!(resource = %node.locator, "content unchanged, skipping");
            cx.stats.skipped.fetch_add(1, Ordering::Relaxed);
            return UpdateOutcome::Kept;
        }

        if let Err(e) = reindex_leaf(node, cx).await {
            node.index_state = IndexState::Failed;
            cx.stats.failed.fetch_add(1, Ordering::Relaxed);
            warn!(resource = %node.locator, error = %e, "index update failed");
        }
        UpdateOutcome::Kept
    })
}

/// Extract, chunk, embed, and persist one stale leaf.
///
/// Any error aborts this node's pass; the caller marks the node `Failed`.
/// The timestamp only advances on full success, so a failed leaf stays
/// stale and is retried on the next pass.
async fn reindex_leaf(node: &mut ResourceNode, cx: &UpdateContext) -> Result<()> {
    let index_dir = node.index_dir(&cx.index_root);
    std::fs::create_dir_all(&index_dir)
        .with_context(|| format!("failed to create index directory {}", index_dir.display()))?;

    node.index_state = IndexState::Indexing;

    cx.stats.extractions.fetch_add(1, Ordering::Relaxed);
    let text = extract::extract_text(&node.locator).await?;
    let chunks = split_into_chunks(&text, cx.max_chunk_size);

    let mut index = SimilarityIndex::new(Arc::clone(&cx.embedder));
    for (position, chunk) in chunks.iter().enumerate() {
        index
            .add_item(
                format!("{}_{}", node.id, position),
                chunk.clone(),
                ItemMetadata {
                    source: node.locator.as_str().to_string(),
                    item_index: position.to_string(),
                },
            )
            .await?;
    }
    index.save(&index_dir, &node.locator.file_name())?;

    node.index_state = IndexState::Indexed;
    node.prev_index_at = Utc::now();
    cx.stats.indexed.fetch_add(1, Ordering::Relaxed);
    cx.stats.chunks.fetch_add(chunks.len(), Ordering::Relaxed);
    info!(resource = %node.locator, chunks = chunks.len(), "index updated");
    Ok(())
}

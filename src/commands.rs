//! CLI command implementations.
//!
//! Each `run_*` function backs one `rix` subcommand: load the tree, do the
//! work, save the tree, print a short summary on stdout. Diagnostics go to
//! the tracing subscriber on stderr so stdout stays parseable.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::config::{load_config, Config, EXAMPLE_CONFIG};
use crate::embedding::create_embedder;
use crate::index::{IndexItem, SimilarityIndex};
use crate::locator::ResourceLocator;
use crate::resource::ResourceTree;
use crate::update::{update_tree, UpdateContext};

/// Create the index root and an empty resource tree; write a starter config
/// when none exists. Idempotent.
pub fn run_init(config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        std::fs::write(config_path, EXAMPLE_CONFIG)?;
        println!("Wrote starter config to {}", config_path.display());
    }
    let config = load_config(config_path)?;

    std::fs::create_dir_all(&config.index.root)?;
    let tree_path = config.tree_path();
    if !tree_path.exists() {
        ResourceTree::default().save(&tree_path)?;
    }
    println!(
        "Index root initialized at {}",
        config.index.root.display()
    );
    Ok(())
}

/// Track a new top-level resource.
pub fn run_add(config: &Config, raw_locator: &str) -> Result<()> {
    let tree_path = config.tree_path();
    let mut tree = ResourceTree::load(&tree_path)?;
    let locator = ResourceLocator::new(raw_locator);

    if tree.add(locator.clone()) {
        tree.save(&tree_path)?;
        println!("Added {}", locator);
    } else {
        println!("{} is already tracked", locator);
    }
    Ok(())
}

/// Stop tracking a resource and erase its on-disk index artifacts.
pub fn run_remove(config: &Config, raw_locator: &str) -> Result<()> {
    let tree_path = config.tree_path();
    let mut tree = ResourceTree::load(&tree_path)?;
    let locator = ResourceLocator::new(raw_locator);

    if tree.remove(&locator, &config.index.root) {
        tree.save(&tree_path)?;
        println!("Removed {}", locator);
    } else {
        println!("{} is not tracked", locator);
    }
    Ok(())
}

/// List tracked resources with their state and presence.
pub fn run_list(config: &Config) -> Result<()> {
    let tree = ResourceTree::load(&config.tree_path())?;
    if tree.resources.is_empty() {
        println!("No resources tracked. Add one with `rix add <path-or-url>`.");
        return Ok(());
    }

    println!("{:<12} {:<9} {:<8} RESOURCE", "STATE", "CHILDREN", "PRESENT");
    for node in &tree.resources {
        let present = if node.locator.is_web() {
            "-"
        } else if node.was_moved() {
            "missing"
        } else {
            "yes"
        };
        println!(
            "{:<12} {:<9} {:<8} {}",
            node.index_state.to_string(),
            node.children.len(),
            present,
            node.locator
        );
    }
    Ok(())
}

/// Run the incremental engine over every tracked resource and persist the
/// updated tree.
pub async fn run_update(config: &Config) -> Result<()> {
    let tree_path = config.tree_path();
    let mut tree = ResourceTree::load(&tree_path)?;

    let embedder = create_embedder(&config.embedding)?;
    let cx = Arc::new(UpdateContext::from_config(config, embedder)?);
    update_tree(&mut tree, Arc::clone(&cx)).await;
    tree.save(&tree_path)?;

    let summary = cx.stats.snapshot();
    println!("update");
    println!("  indexed: {}", summary.indexed);
    println!("  skipped: {}", summary.skipped);
    println!("  removed: {}", summary.removed);
    println!("  failed: {}", summary.failed);
    println!("  chunks written: {}", summary.chunks);
    println!("ok");
    Ok(())
}

/// Rank every persisted index item against `query` and print the top hits.
pub async fn run_search(config: &Config, query: &str, limit: usize) -> Result<()> {
    let tree = ResourceTree::load(&config.tree_path())?;
    let items: Vec<IndexItem> = tree.index_items(&config.index.root).collect();
    if items.is_empty() {
        println!("No index items found. Run `rix update` first.");
        return Ok(());
    }

    let embedder = create_embedder(&config.embedding)?;
    let index = SimilarityIndex::from_items(embedder, items).await?;
    let hits = index.search(query, limit).await?;

    for hit in hits {
        let snippet: String = hit
            .item
            .text
            .chars()
            .take(120)
            .collect::<String>()
            .replace('\n', " ");
        println!("{:>6.3}  {}  [{}]", hit.score, hit.item.metadata.source, hit.item.id);
        println!("        {}", snippet);
    }
    Ok(())
}

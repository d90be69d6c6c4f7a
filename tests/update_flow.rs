//! End-to-end tests for the incremental update engine against a real
//! temporary filesystem.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use resource_index::embedding::HashingEmbedder;
use resource_index::locator::ResourceLocator;
use resource_index::probe::Probe;
use resource_index::resource::{IndexState, ResourceNode, ResourceTree};
use resource_index::update::{
    update_node, update_tree, UpdateContext, UpdateOutcome, UpdateStats,
};

/// Fresh context (with zeroed counters) for one update pass.
fn context(index_root: &Path) -> Arc<UpdateContext> {
    Arc::new(UpdateContext {
        index_root: index_root.to_path_buf(),
        probe: Probe::default(),
        max_chunk_size: 1024,
        embedder: Arc::new(HashingEmbedder::new(64)),
        stats: UpdateStats::default(),
    })
}

fn setup() -> (TempDir, std::path::PathBuf) {
    let tmp = TempDir::new().unwrap();
    let index_root = tmp.path().join("index");
    fs::create_dir_all(&index_root).unwrap();
    (tmp, index_root)
}

#[tokio::test]
async fn first_pass_indexes_a_fresh_file() {
    let (tmp, index_root) = setup();
    let file = tmp.path().join("notes.txt");
    fs::write(&file, "hello world").unwrap();

    let mut node = ResourceNode::new(ResourceLocator::from(file.as_path()));
    let cx = context(&index_root);
    let outcome = update_node(&mut node, &cx).await;

    assert_eq!(outcome, UpdateOutcome::Kept);
    assert_eq!(node.index_state, IndexState::Indexed);

    let items: Vec<_> = node.index_items(&index_root).collect();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, format!("{}_0", node.id));
    assert_eq!(items[0].text, "hello world");
    assert_eq!(items[0].metadata.source, file.to_string_lossy().to_string());
    assert_eq!(items[0].metadata.item_index, "0");

    let summary = cx.stats.snapshot();
    assert_eq!(summary.extractions, 1);
    assert_eq!(summary.indexed, 1);
    assert_eq!(summary.chunks, 1);
}

#[tokio::test]
async fn second_pass_skips_unchanged_leaves() {
    let (tmp, index_root) = setup();
    let file = tmp.path().join("notes.txt");
    fs::write(&file, "hello world").unwrap();

    let mut node = ResourceNode::new(ResourceLocator::from(file.as_path()));
    update_node(&mut node, &context(&index_root)).await;

    let cx = context(&index_root);
    update_node(&mut node, &cx).await;

    let summary = cx.stats.snapshot();
    assert_eq!(summary.extractions, 0, "unchanged leaf must not be extracted");
    assert_eq!(summary.skipped, 1);
    assert_eq!(node.index_state, IndexState::Indexed);
}

#[tokio::test]
async fn modified_file_is_reindexed() {
    let (tmp, index_root) = setup();
    let file = tmp.path().join("notes.txt");
    fs::write(&file, "first version").unwrap();

    let mut node = ResourceNode::new(ResourceLocator::from(file.as_path()));
    update_node(&mut node, &context(&index_root)).await;

    // Coarse-grained filesystems store mtimes in whole seconds.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    fs::write(&file, "second version").unwrap();

    let cx = context(&index_root);
    update_node(&mut node, &cx).await;

    assert_eq!(cx.stats.snapshot().extractions, 1);
    let items: Vec<_> = node.index_items(&index_root).collect();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].text, "second version");
}

#[tokio::test]
async fn moved_file_is_cleaned_up() {
    let (tmp, index_root) = setup();
    let file = tmp.path().join("notes.txt");
    fs::write(&file, "hello world").unwrap();

    let mut tree = ResourceTree::default();
    tree.add(ResourceLocator::from(file.as_path()));
    update_tree(&mut tree, context(&index_root)).await;

    let node_dir = tree.resources[0].index_dir(&index_root);
    assert!(node_dir.exists());

    fs::remove_file(&file).unwrap();
    let cx = context(&index_root);
    update_tree(&mut tree, Arc::clone(&cx)).await;

    assert!(tree.resources.is_empty(), "moved node must leave the tree");
    assert!(!node_dir.exists(), "index directory must be erased");
    assert_eq!(cx.stats.snapshot().removed, 1);
}

#[tokio::test]
async fn directory_fan_out_indexes_children() {
    let (tmp, index_root) = setup();
    let dir = tmp.path().join("docs");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("alpha.txt"), "alpha content").unwrap();
    fs::write(dir.join("beta.txt"), "beta content").unwrap();

    let mut node = ResourceNode::new(ResourceLocator::from(dir.as_path()));
    let cx = context(&index_root);
    update_node(&mut node, &cx).await;

    assert_eq!(node.children.len(), 2);
    let names: Vec<String> = node
        .children
        .iter()
        .map(|c| c.locator.file_name())
        .collect();
    assert_eq!(names, vec!["alpha.txt", "beta.txt"]);
    for child in &node.children {
        assert_eq!(child.index_state, IndexState::Indexed);
    }

    // The directory's own content is never indexed.
    assert_eq!(node.index_state, IndexState::NotIndexed);
    assert!(!node.index_dir(&index_root).exists());
    assert_eq!(cx.stats.snapshot().indexed, 2);
}

#[tokio::test]
async fn rescans_only_append_children() {
    let (tmp, index_root) = setup();
    let dir = tmp.path().join("docs");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("b.txt"), "b content").unwrap();

    let mut node = ResourceNode::new(ResourceLocator::from(dir.as_path()));
    update_node(&mut node, &context(&index_root)).await;
    assert_eq!(node.children.len(), 1);

    fs::write(dir.join("a.txt"), "a content").unwrap();
    let cx = context(&index_root);
    update_node(&mut node, &cx).await;

    // Previously seen entries keep their position; new ones are appended.
    let names: Vec<String> = node
        .children
        .iter()
        .map(|c| c.locator.file_name())
        .collect();
    assert_eq!(names, vec!["b.txt", "a.txt"]);

    // Only the new file costs extraction work.
    let summary = cx.stats.snapshot();
    assert_eq!(summary.extractions, 1);
    assert_eq!(summary.skipped, 1);
}

#[tokio::test]
async fn moved_child_is_dropped_from_parent() {
    let (tmp, index_root) = setup();
    let dir = tmp.path().join("docs");
    fs::create_dir(&dir).unwrap();
    let keep = dir.join("keep.txt");
    let gone = dir.join("gone.txt");
    fs::write(&keep, "kept").unwrap();
    fs::write(&gone, "doomed").unwrap();

    let mut node = ResourceNode::new(ResourceLocator::from(dir.as_path()));
    update_node(&mut node, &context(&index_root)).await;
    assert_eq!(node.children.len(), 2);
    let gone_dir = node.children[0].index_dir(&index_root);

    fs::remove_file(&gone).unwrap();
    let cx = context(&index_root);
    update_node(&mut node, &cx).await;

    assert_eq!(node.children.len(), 1);
    assert_eq!(node.children[0].locator.file_name(), "keep.txt");
    assert!(!gone_dir.exists());
    assert_eq!(cx.stats.snapshot().removed, 1);
}

#[tokio::test]
async fn nested_directories_are_indexed_in_one_pass() {
    let (tmp, index_root) = setup();
    let dir = tmp.path().join("docs");
    let sub = dir.join("sub");
    fs::create_dir_all(&sub).unwrap();
    fs::write(sub.join("deep.txt"), "deep content").unwrap();

    let mut node = ResourceNode::new(ResourceLocator::from(dir.as_path()));
    update_node(&mut node, &context(&index_root)).await;

    // One level is discovered per node, but recursion reaches the bottom.
    assert_eq!(node.children.len(), 1);
    assert_eq!(node.children[0].children.len(), 1);

    let texts: Vec<String> = node
        .index_items(&index_root)
        .map(|item| item.text)
        .collect();
    assert_eq!(texts, vec!["deep content"]);
}

#[tokio::test]
async fn hidden_entries_are_not_discovered() {
    let (tmp, index_root) = setup();
    let dir = tmp.path().join("docs");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join(".hidden"), "secret").unwrap();
    fs::write(dir.join("visible.txt"), "visible").unwrap();

    let mut node = ResourceNode::new(ResourceLocator::from(dir.as_path()));
    update_node(&mut node, &context(&index_root)).await;

    assert_eq!(node.children.len(), 1);
    assert_eq!(node.children[0].locator.file_name(), "visible.txt");
}

#[tokio::test]
async fn failed_extraction_marks_node_and_retries_next_pass() {
    let (tmp, index_root) = setup();
    let file = tmp.path().join("broken.pdf");
    fs::write(&file, "this is not a pdf").unwrap();

    let mut node = ResourceNode::new(ResourceLocator::from(file.as_path()));
    let cx = context(&index_root);
    let outcome = update_node(&mut node, &cx).await;

    assert_eq!(outcome, UpdateOutcome::Kept);
    assert_eq!(node.index_state, IndexState::Failed);
    assert_eq!(cx.stats.snapshot().failed, 1);

    // The timestamp never advanced, so the next pass tries again.
    let cx2 = context(&index_root);
    update_node(&mut node, &cx2).await;
    assert_eq!(cx2.stats.snapshot().extractions, 1);
    assert_eq!(node.index_state, IndexState::Failed);
}

#[tokio::test]
async fn failure_in_one_sibling_does_not_abort_the_others() {
    let (tmp, index_root) = setup();
    let dir = tmp.path().join("docs");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("bad.pdf"), "garbage").unwrap();
    fs::write(dir.join("good.txt"), "good content").unwrap();

    let mut node = ResourceNode::new(ResourceLocator::from(dir.as_path()));
    let cx = context(&index_root);
    update_node(&mut node, &cx).await;

    let summary = cx.stats.snapshot();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.indexed, 1);

    let texts: Vec<String> = node
        .index_items(&index_root)
        .map(|item| item.text)
        .collect();
    assert_eq!(texts, vec!["good content"]);
}

#[tokio::test]
async fn tree_updates_roots_concurrently_and_preserves_order() {
    let (tmp, index_root) = setup();
    let one = tmp.path().join("one.txt");
    let two = tmp.path().join("two.txt");
    fs::write(&one, "one").unwrap();
    fs::write(&two, "two").unwrap();

    let mut tree = ResourceTree::default();
    tree.add(ResourceLocator::from(one.as_path()));
    tree.add(ResourceLocator::from(two.as_path()));

    let cx = context(&index_root);
    update_tree(&mut tree, Arc::clone(&cx)).await;

    assert_eq!(tree.resources.len(), 2);
    assert_eq!(tree.resources[0].locator.file_name(), "one.txt");
    assert_eq!(tree.resources[1].locator.file_name(), "two.txt");
    assert_eq!(cx.stats.snapshot().indexed, 2);

    let texts: Vec<String> = tree.index_items(&index_root).map(|i| i.text).collect();
    assert_eq!(texts, vec!["one", "two"]);
}

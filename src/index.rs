//! Persisted index items and the in-memory similarity index.
//!
//! One [`SimilarityIndex`] is built per leaf resource during a re-index pass
//! and saved as a JSON list of [`IndexItem`]s under the node's private index
//! directory. Items are immutable once written; a rebuild replaces the whole
//! file. Loading is deliberately forgiving: a missing or corrupt index file
//! yields an empty item list, never an error; the next update pass rebuilds
//! it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::{cosine_similarity, Embedder};

/// Metadata carried by every persisted index item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMetadata {
    /// Locator string of the resource this chunk came from.
    pub source: String,
    /// Chunk position within the resource, serialized as a string.
    pub item_index: String,
}

/// A single chunk's persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexItem {
    /// `"{node_id}_{chunk_index}"`.
    pub id: String,
    /// The chunk text.
    pub text: String,
    pub metadata: ItemMetadata,
}

/// Failure saving or loading a node's index file.
#[derive(Debug)]
pub enum PersistError {
    Io(PathBuf, String),
    Serialize(String),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Io(path, e) => write!(f, "index file {}: {}", path.display(), e),
            PersistError::Serialize(e) => write!(f, "index serialization failed: {}", e),
        }
    }
}

impl std::error::Error for PersistError {}

/// A scored hit returned from [`SimilarityIndex::search`].
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub score: f32,
    pub item: IndexItem,
}

/// In-memory similarity index over a set of [`IndexItem`]s.
///
/// Items are embedded as they are added; searching embeds the query and
/// ranks items by cosine similarity. Only the items themselves are
/// persisted; vectors are a property of the backend and are recomputed
/// after a load.
pub struct SimilarityIndex {
    embedder: Arc<dyn Embedder>,
    items: Vec<IndexItem>,
    vectors: Vec<Vec<f32>>,
}

impl SimilarityIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            items: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Build an index over already-persisted items, embedding them in one
    /// batch.
    pub async fn from_items(embedder: Arc<dyn Embedder>, items: Vec<IndexItem>) -> Result<Self> {
        let texts: Vec<String> = items.iter().map(|i| i.text.clone()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed_batch(&texts).await?
        };
        ensure!(
            vectors.len() == items.len(),
            "embedder returned {} vectors for {} items",
            vectors.len(),
            items.len()
        );
        Ok(Self {
            embedder,
            items,
            vectors,
        })
    }

    /// Embed `text` and append it as a new item.
    pub async fn add_item(
        &mut self,
        id: impl Into<String>,
        text: impl Into<String>,
        metadata: ItemMetadata,
    ) -> Result<()> {
        let text = text.into();
        let mut vectors = self
            .embedder
            .embed_batch(std::slice::from_ref(&text))
            .await?;
        ensure!(!vectors.is_empty(), "embedder returned no vector");
        self.vectors.push(vectors.remove(0));
        self.items.push(IndexItem {
            id: id.into(),
            text,
            metadata,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[IndexItem] {
        &self.items
    }

    /// Persist the item list to `dir/{name}.json`, replacing any prior
    /// contents.
    pub fn save(&self, dir: &Path, name: &str) -> Result<(), PersistError> {
        let path = index_file_path(dir, name);
        let json = serde_json::to_string_pretty(&self.items)
            .map_err(|e| PersistError::Serialize(e.to_string()))?;
        std::fs::write(&path, json).map_err(|e| PersistError::Io(path, e.to_string()))
    }

    /// Rank all items against `query` and return the top `limit` hits.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let query_vecs = self
            .embedder
            .embed_batch(std::slice::from_ref(&query.to_string()))
            .await?;
        let query_vec = query_vecs
            .first()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no query vector"))?;

        let mut hits: Vec<SearchHit> = self
            .items
            .iter()
            .zip(self.vectors.iter())
            .map(|(item, vec)| SearchHit {
                score: cosine_similarity(query_vec, vec),
                item: item.clone(),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Load the items persisted under `dir/{name}.json`.
///
/// Missing or unreadable files and malformed JSON all degrade to an empty
/// list: collection must never fail because one node's index is absent.
pub fn load_items(dir: &Path, name: &str) -> Vec<IndexItem> {
    let path = index_file_path(dir, name);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "index file not readable");
            return Vec::new();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "index file malformed");
            Vec::new()
        }
    }
}

fn index_file_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.json", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;

    fn embedder() -> Arc<dyn Embedder> {
        Arc::new(HashingEmbedder::new(64))
    }

    fn metadata(source: &str, index: usize) -> ItemMetadata {
        ItemMetadata {
            source: source.to_string(),
            item_index: index.to_string(),
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips_items() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut index = SimilarityIndex::new(embedder());
        index
            .add_item("node_0", "hello world", metadata("/tmp/notes.txt", 0))
            .await
            .unwrap();
        index
            .add_item("node_1", "second chunk", metadata("/tmp/notes.txt", 1))
            .await
            .unwrap();
        index.save(tmp.path(), "notes.txt").unwrap();

        let loaded = load_items(tmp.path(), "notes.txt");
        assert_eq!(loaded, index.items());
        assert_eq!(loaded[0].metadata.item_index, "0");
    }

    #[test]
    fn metadata_serializes_with_camel_case_item_index() {
        let item = IndexItem {
            id: "abc_0".to_string(),
            text: "hello".to_string(),
            metadata: metadata("/tmp/a.txt", 0),
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"itemIndex\":\"0\""));
        assert!(json.contains("\"source\":\"/tmp/a.txt\""));
    }

    #[test]
    fn missing_index_file_loads_as_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(load_items(tmp.path(), "nope").is_empty());
    }

    #[test]
    fn corrupt_index_file_loads_as_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("bad.json"), "{ not json").unwrap();
        assert!(load_items(tmp.path(), "bad").is_empty());
    }

    #[tokio::test]
    async fn search_ranks_matching_text_first() {
        let mut index = SimilarityIndex::new(embedder());
        index
            .add_item("a_0", "rust cargo crates", metadata("/a", 0))
            .await
            .unwrap();
        index
            .add_item("a_1", "gardening tulip bulbs", metadata("/a", 1))
            .await
            .unwrap();

        let hits = index.search("cargo crates", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].item.id, "a_0");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn from_items_embeds_loaded_records() {
        let items = vec![IndexItem {
            id: "x_0".to_string(),
            text: "alpha beta".to_string(),
            metadata: metadata("/x", 0),
        }];
        let index = SimilarityIndex::from_items(embedder(), items).await.unwrap();
        let hits = index.search("alpha", 1).await.unwrap();
        assert_eq!(hits[0].item.id, "x_0");
        assert!(hits[0].score > 0.0);
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::resource::TREE_FILE;

/// Starter configuration written by `rix init` when no config file exists.
pub const EXAMPLE_CONFIG: &str = r#"[index]
root = "./index"

[chunking]
max_chunk_size = 1024

[embedding]
provider = "hashing"
dims = 256

[scan]
exclude_globs = []
"#;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Root directory holding one index subdirectory per resource node,
    /// plus the resource tree file.
    #[serde(default = "default_index_root")]
    pub root: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: default_index_root(),
        }
    }
}

fn default_index_root() -> PathBuf {
    PathBuf::from("./index")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk size in bytes.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
        }
    }
}

fn default_max_chunk_size() -> usize {
    1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            dims: default_dims(),
        }
    }
}

fn default_provider() -> String {
    "hashing".to_string()
}

fn default_dims() -> usize {
    256
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScanConfig {
    /// Glob patterns excluded from directory rescans, matched against entry
    /// names. Hidden (dot-prefixed) entries are always excluded.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Config {
    /// Defaults for contexts without a config file.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Path of the whole-tree persistence file under the index root.
    pub fn tree_path(&self) -> PathBuf {
        self.index.root.join(TREE_FILE)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.max_chunk_size == 0 {
        anyhow::bail!("chunking.max_chunk_size must be > 0");
    }
    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }
    match config.embedding.provider.as_str() {
        "hashing" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be hashing.",
            other
        ),
    }

    Ok(config)
}

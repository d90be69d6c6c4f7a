//! # resource-index
//!
//! Incremental semantic indexing over a forest of knowledge sources: local
//! files, directories, and web pages. Each tracked resource keeps a private
//! on-disk similarity index that is refreshed only when the underlying
//! content changes: unchanged leaves cost zero extraction or embedding
//! work, moved or deleted files are cleaned up, and directories pick up new
//! entries one scan level at a time.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌───────────────┐
//! │ ResourceTree │──▶│  update engine   │──▶│  index root   │
//! │ files/dirs/  │   │ probe → extract  │   │ {id}/name.json│
//! │ web pages    │   │ → chunk → embed  │   │ per resource  │
//! └──────────────┘   └──────────────────┘   └───────┬───────┘
//!                                                   │
//!                                             ┌─────▼─────┐
//!                                             │ search /  │
//!                                             │ CLI (rix) │
//!                                             └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rix init                      # create the index root
//! rix add ~/notes               # track a directory
//! rix add https://example.com   # track a web page
//! rix update                    # incremental re-index
//! rix search "deployment"       # rank indexed chunks
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`locator`] | Web/file/directory resource locators |
//! | [`resource`] | Resource tree, nodes, and index state |
//! | [`probe`] | Filesystem facts: listing, existence, mtimes |
//! | [`extract`] | Text extraction (text, PDF, DOCX, web) |
//! | [`chunk`] | Content-preserving text splitting |
//! | [`embedding`] | Embedding backend abstraction |
//! | [`index`] | Persisted index items + similarity index |
//! | [`update`] | The recursive incremental indexing engine |
//! | [`config`] | TOML configuration |
//! | [`commands`] | CLI command implementations |

pub mod chunk;
pub mod commands;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod locator;
pub mod probe;
pub mod resource;
pub mod update;

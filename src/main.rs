//! # resource-index CLI (`rix`)
//!
//! The `rix` binary maintains an incrementally updated semantic index over
//! a user-chosen set of resources: files, directories, and web pages.
//!
//! ## Usage
//!
//! ```bash
//! rix --config ./rix.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rix init` | Create the index root (and a starter config if missing) |
//! | `rix add <locator>` | Track a file, directory, or web address |
//! | `rix remove <locator>` | Stop tracking a resource and erase its index |
//! | `rix list` | Show tracked resources and their indexing state |
//! | `rix update` | Incrementally re-index everything that changed |
//! | `rix search "<query>"` | Rank indexed content against a query |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use resource_index::commands;
use resource_index::config;

/// resource-index CLI — incremental semantic indexing over local files,
/// directories, and web pages.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; `rix init` writes a starter config when none exists.
#[derive(Parser)]
#[command(
    name = "rix",
    about = "Incremental semantic indexing over local files, directories, and web pages",
    version,
    long_about = "resource-index keeps a per-resource on-disk similarity index fresh as the \
    underlying content changes. Unchanged content is never re-processed, moved or deleted \
    files are cleaned up automatically, and directories are rescanned one level per pass."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./rix.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the index root.
    ///
    /// Creates the index directory and an empty resource tree, and writes a
    /// starter config file when none exists. Idempotent.
    Init,

    /// Track a new resource.
    ///
    /// The locator may be a file path, a directory path, or a web address
    /// (`http://`, `https://`, or `www.`-prefixed). Adding an
    /// already-tracked locator is a no-op.
    Add {
        /// File path, directory path, or web address.
        locator: String,
    },

    /// Stop tracking a resource.
    ///
    /// Removes the resource (and its children) from the tree and erases
    /// their on-disk index directories.
    Remove {
        /// Locator exactly as it was added.
        locator: String,
    },

    /// List tracked resources with state, child counts, and presence.
    List,

    /// Incrementally re-index all tracked resources.
    ///
    /// Walks each resource tree depth-first: moved files are cleaned up,
    /// directories are rescanned one level, and only stale leaves are
    /// extracted, chunked, embedded, and persisted. Independent top-level
    /// resources update concurrently.
    Update,

    /// Search indexed content.
    ///
    /// Embeds the query with the configured backend and ranks every
    /// persisted chunk by cosine similarity.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // init may run before any config file exists.
    if let Commands::Init = cli.command {
        return commands::run_init(&cli.config);
    }

    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => unreachable!(),
        Commands::Add { locator } => commands::run_add(&config, &locator)?,
        Commands::Remove { locator } => commands::run_remove(&config, &locator)?,
        Commands::List => commands::run_list(&config)?,
        Commands::Update => commands::run_update(&config).await?,
        Commands::Search { query, limit } => commands::run_search(&config, &query, limit).await?,
    }

    Ok(())
}

//! # Paper Harness CLI (`pch`)
//!
//! The `pch` binary is the primary interface for Paper Harness. It starts
//! the HTTP API and provides one-off commands for downloading papers,
//! condensing schema documents, and maintaining the extraction cache.
//!
//! ## Usage
//!
//! ```bash
//! pch --config ./config/pch.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pch serve` | Start the HTTP API server |
//! | `pch fetch <id>` | Download and validate a paper PDF |
//! | `pch extract <path>` | Condense a schema document (cached) |
//! | `pch cache stats` | Show extraction cache entry count and size |
//! | `pch cache clear` | Wipe the extraction cache |
//!
//! ## Examples
//!
//! ```bash
//! # Start the API server
//! pch serve --config ./config/pch.toml
//!
//! # Download an arXiv paper (source inferred from the id shape)
//! pch fetch 2301.12345
//!
//! # Download a medRxiv preprint to a chosen path
//! pch fetch 10.1101/2023.12.06.23299426v1 --source medrxiv --out paper.pdf
//!
//! # Condense an OpenAPI description into a cached reference guide
//! pch extract ./specs/ctg-oas-v2.yaml --label ctg-oas-v2.yaml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use paper_harness::{cache, config, extract, ingest, server};

/// Paper Harness — a caching chat gateway for exploring research papers.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/pch.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "pch",
    about = "Paper Harness — a caching chat gateway for exploring research papers",
    version,
    long_about = "Paper Harness serves multi-turn conversations about remote research \
    papers (arXiv, medRxiv, bioRxiv) without re-transmitting the document each turn: \
    papers are ingested once into a remote blob store under a deterministic name, and \
    expensive schema extractions are memoized in a content-addressed persistent cache."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// chat, PDF proxy, and extraction endpoints.
    Serve,

    /// Download and validate a paper's PDF.
    ///
    /// Validates the identifier against its source's pattern, downloads the
    /// PDF, checks the format signature and size bound, and writes the
    /// bytes to disk.
    Fetch {
        /// Paper identifier (e.g. `2301.12345`, `10.1101/2023.12.06.23299426v1`).
        id: String,

        /// Source tag: `arxiv`, `medrxiv`, or `biorxiv`. Inferred from the
        /// identifier's shape when omitted.
        #[arg(long)]
        source: Option<String>,

        /// Output path. Defaults to `<blob-name>.pdf` in the working directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Condense a schema document into a reference guide.
    ///
    /// Normalizes the document (YAML/JSON), submits a bounded prefix to the
    /// generation backend, and caches the result by content digest —
    /// byte-identical inputs are condensed only once.
    Extract {
        /// Path to the document (`.yaml`, `.yml`, `.json`, or plain text).
        path: PathBuf,

        /// Label recorded with the cache entry. Defaults to the file name.
        #[arg(long)]
        label: Option<String>,
    },

    /// Inspect or wipe the extraction cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Cache maintenance subcommands.
#[derive(Subcommand)]
enum CacheAction {
    /// Show entry count and approximate size.
    Stats,
    /// Remove all entries and the backing store.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                )
                .init();
            server::run_server(&cfg).await?;
        }
        Commands::Fetch { id, source, out } => {
            ingest::run_fetch(&cfg, &id, source.as_deref(), out).await?;
        }
        Commands::Extract { path, label } => {
            extract::run_extract(&cfg, &path, label.as_deref()).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Stats => {
                cache::run_cache_stats(&cfg).await?;
            }
            CacheAction::Clear => {
                cache::run_cache_clear(&cfg).await?;
            }
        },
    }

    Ok(())
}

//! CLI module - command definitions and handlers

mod build;
mod lookup;
mod info;
mod filter;
mod config_cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use build::BuildArgs;
pub use lookup::LookupArgs;
pub use info::InfoArgs;
pub use filter::FilterArgs;
pub use config_cmd::ConfigArgs;

use crate::config::Config;
use crate::store::{StoreOptions, VectorStore};

/// glovestore - persistent word embedding store
#[derive(Parser)]
#[command(name = "glovestore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a store from an embedding file (or reuse an existing one)
    Build(BuildArgs),

    /// Look up words in a store
    Lookup(LookupArgs),

    /// Show store metadata
    Info(InfoArgs),

    /// Replace out-of-vocabulary tokens read from stdin
    Filter(FilterArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let config = Config::load();
        match self.command {
            Commands::Build(args) => build::run(args, &config, self.quiet),
            Commands::Lookup(args) => lookup::run(args, &config),
            Commands::Info(args) => info::run(args, &config),
            Commands::Filter(args) => filter::run(args, &config),
            Commands::Config(args) => config_cmd::run(args),
        }
    }
}

/// Open a store for queries without building one on disk
///
/// With `source`, the embeddings are loaded into memory instead.
pub(crate) fn open_for_query(
    config: &Config,
    dir: Option<PathBuf>,
    source: Option<PathBuf>,
) -> anyhow::Result<VectorStore> {
    if let Some(source) = source {
        return Ok(VectorStore::in_memory(&source, &config.store.to_options())?);
    }

    let dir = dir.unwrap_or_else(|| config.store.dir.clone());
    if !dir.exists() {
        anyhow::bail!(
            "Store '{}' not found. Run 'glovestore build --source <file> --dir {}' first.",
            dir.display(),
            dir.display()
        );
    }

    let options = StoreOptions {
        dir,
        ..config.store.to_options()
    }
    .with_reuse(true);
    Ok(VectorStore::open(&options)?)
}

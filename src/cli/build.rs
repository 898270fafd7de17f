//! Build command - store construction from an embedding file

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::config::Config;
use crate::error::StoreError;
use crate::store::{StoreOrigin, VectorStore};

#[derive(Args)]
pub struct BuildArgs {
    /// Embedding file (GloVe text format, optionally .gz)
    #[arg(long, short = 's')]
    pub source: PathBuf,

    /// Store directory (default: from config)
    #[arg(long, short = 'd')]
    pub dir: Option<PathBuf>,

    /// Never open an existing directory; build into a new one next to it
    #[arg(long)]
    pub no_reuse: bool,

    /// Records between durability commits
    #[arg(long)]
    pub commit_interval: Option<usize>,

    /// Warn instead of failing when the header word count is wrong
    #[arg(long)]
    pub lenient: bool,
}

pub fn run(args: BuildArgs, config: &Config, quiet: bool) -> anyhow::Result<()> {
    let mut options = config.store.to_options().with_source(&args.source);
    if let Some(dir) = args.dir {
        options.dir = dir;
    }
    if args.no_reuse {
        options.reuse = false;
    }
    if let Some(interval) = args.commit_interval {
        if interval == 0 {
            anyhow::bail!("--commit-interval must be at least 1");
        }
        options.commit_interval = interval;
    }
    if args.lenient {
        options.strict_word_count = false;
    }
    let options = options.with_progress(!quiet);

    info!("Opening store at {:?}", options.dir);
    let store = VectorStore::open(&options).map_err(with_hint)?;

    let dir = store
        .dir()
        .map(|d| d.display().to_string())
        .unwrap_or_default();
    match store.origin() {
        Some(StoreOrigin::Reused { .. }) => {
            println!("Store at {} already exists, reused without reading the source", dir)
        }
        Some(StoreOrigin::Redirected { requested, .. }) => println!(
            "Store at {} already exists and was left untouched; built a new one at {}",
            requested.display(),
            dir
        ),
        _ => println!("Store built successfully at {}", dir),
    }
    if let Some(origin) = store.origin() {
        println!("  Origin: {}", origin.label());
    }
    println!("  Words: {}", store.word_count());
    println!("  Dimensions: {}", store.dimension());

    Ok(())
}

/// Attach a next step to construction failures
fn with_hint(err: StoreError) -> anyhow::Error {
    let hint = match &err {
        StoreError::Format { .. } => {
            "the embedding file is malformed and no usable store was produced (use --lenient if only the header word count is off)"
        }
        StoreError::Configuration { .. } => {
            "check --dir, or pass --no-reuse to build into a new directory"
        }
        StoreError::Storage { .. } => {
            "check that the paths exist and that no other process is building the same store"
        }
    };
    anyhow::Error::new(err).context(hint)
}

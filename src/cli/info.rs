//! Info command - show store metadata

use std::path::PathBuf;

use clap::Args;

use super::open_for_query;
use crate::config::Config;

#[derive(Args)]
pub struct InfoArgs {
    /// Store directory (default: from config)
    #[arg(long, short = 'd')]
    pub dir: Option<PathBuf>,
}

pub fn run(args: InfoArgs, config: &Config) -> anyhow::Result<()> {
    let store = open_for_query(config, args.dir, None)?;

    if let Some(dir) = store.dir() {
        println!("Store: {}", dir.display());
    }
    println!("  Words: {}", store.word_count());
    println!("  Dimensions: {}", store.dimension());

    Ok(())
}

//! Lookup command - query words in a store

use std::path::PathBuf;

use clap::Args;

use super::open_for_query;
use crate::config::Config;

#[derive(Args)]
pub struct LookupArgs {
    /// Words to look up
    #[arg(required = true)]
    pub words: Vec<String>,

    /// Store directory (default: from config)
    #[arg(long, short = 'd')]
    pub dir: Option<PathBuf>,

    /// Load this embedding file into memory instead of opening a store
    #[arg(long, short = 's', conflicts_with = "dir")]
    pub source: Option<PathBuf>,

    /// Print the embedding vector of each word found
    #[arg(long)]
    pub vector: bool,
}

pub fn run(args: LookupArgs, config: &Config) -> anyhow::Result<()> {
    let store = open_for_query(config, args.dir, args.source)?;

    for word in &args.words {
        match store.vector_for(word) {
            Some(vector) if args.vector => {
                let components: Vec<String> = vector.iter().map(|c| c.to_string()).collect();
                println!("{}\tfound\t{}", word, components.join(" "));
            }
            Some(_) => println!("{}\tfound", word),
            None => println!("{}\tmissing", word),
        }
    }

    Ok(())
}

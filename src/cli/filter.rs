//! Filter command - mask out-of-vocabulary tokens on stdin

use std::io::{BufRead, BufWriter, Write};
use std::path::PathBuf;

use clap::Args;

use super::open_for_query;
use crate::config::Config;
use crate::vocab::VocabFilter;

#[derive(Args)]
pub struct FilterArgs {
    /// Store directory (default: from config)
    #[arg(long, short = 'd')]
    pub dir: Option<PathBuf>,

    /// Load this embedding file into memory instead of opening a store
    #[arg(long, short = 's', conflicts_with = "dir")]
    pub source: Option<PathBuf>,

    /// Marker for unknown tokens (default: from config)
    #[arg(long, short = 'm')]
    pub marker: Option<String>,
}

pub fn run(args: FilterArgs, config: &Config) -> anyhow::Result<()> {
    let store = open_for_query(config, args.dir, args.source)?;
    let marker = args.marker.unwrap_or_else(|| config.filter.oov_marker.clone());
    let filter = VocabFilter::new(&store).with_marker(marker);

    let stdin = std::io::stdin();
    let mut out = BufWriter::new(std::io::stdout().lock());
    for line in stdin.lock().lines() {
        let line = line?;
        writeln!(out, "{}", filter.filter_line(&line))?;
    }
    out.flush()?;

    Ok(())
}

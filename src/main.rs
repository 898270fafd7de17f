//! glovestore - persistent word embedding store
//!
//! A single-binary CLI for building a word -> vector store from GloVe-style
//! text dumps and querying it.

mod backend;
mod cli;
mod config;
mod error;
mod store;
mod vocab;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "glovestore=debug,warn"
    } else if cli.quiet {
        "warn"
    } else {
        "glovestore=info,warn"
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    cli.run()
}

//! Config command - manage glovestore configuration

use clap::{Args, Subcommand};

use crate::config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Initialize config file with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show config file path
    Path,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommands::Show => {
            let config = Config::load();
            let path = Config::config_path();

            if path.exists() {
                println!("Config file: {}", path.display());
            } else {
                println!("Config file: {} (not found, using defaults)", path.display());
            }
            println!();
            println!("[store]");
            println!("dir = \"{}\"", config.store.dir.display());
            println!("reuse = {}", config.store.reuse);
            println!("commit_interval = {}", config.store.commit_interval);
            println!("lock_timeout_ms = {}", config.store.lock_timeout_ms);
            println!("strict_word_count = {}", config.store.strict_word_count);
            println!();
            println!("[filter]");
            println!("oov_marker = \"{}\"", config.filter.oov_marker);
        }

        ConfigCommands::Init { force } => {
            let path = Config::config_path();

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }

            Config::write_example()?;
            println!("Created config file at {}", path.display());
            println!();
            println!("Edit the file to change the default store directory and build settings.");
        }

        ConfigCommands::Path => {
            println!("{}", Config::config_path().display());
        }
    }

    Ok(())
}

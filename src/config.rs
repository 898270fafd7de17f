//! Configuration file support for glovestore
//!
//! Config file location: ~/.config/glovestore/config.toml
//!
//! Example config:
//! ```toml
//! [store]
//! dir = "glove.store"
//! reuse = true
//! commit_interval = 10000
//! lock_timeout_ms = 1000
//! strict_word_count = true
//!
//! [filter]
//! oov_marker = "UNK"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::{StoreOptions, DEFAULT_COMMIT_INTERVAL};
use crate::vocab::OOV_MARKER;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub filter: FilterConfig,
}

/// Store construction defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store directory
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Open an existing store directory instead of building into a new one
    #[serde(default = "default_reuse")]
    pub reuse: bool,

    /// Records between durability commits while building
    #[serde(default = "default_commit_interval")]
    pub commit_interval: usize,

    /// Bounded wait for the store lock, in milliseconds
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Fail the build when the record count differs from the header
    #[serde(default = "default_strict_word_count")]
    pub strict_word_count: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            reuse: default_reuse(),
            commit_interval: default_commit_interval(),
            lock_timeout_ms: default_lock_timeout_ms(),
            strict_word_count: default_strict_word_count(),
        }
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from("glove.store")
}

fn default_reuse() -> bool {
    true
}

fn default_commit_interval() -> usize {
    DEFAULT_COMMIT_INTERVAL
}

fn default_lock_timeout_ms() -> u64 {
    1000
}

fn default_strict_word_count() -> bool {
    true
}

/// Vocabulary filter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Marker substituted for unknown tokens
    #[serde(default = "default_oov_marker")]
    pub oov_marker: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            oov_marker: default_oov_marker(),
        }
    }
}

fn default_oov_marker() -> String {
    OOV_MARKER.to_string()
}

impl StoreConfig {
    /// Store options seeded from this config
    pub fn to_options(&self) -> StoreOptions {
        StoreOptions::new(&self.dir)
            .with_reuse(self.reuse)
            .with_commit_interval(self.commit_interval.max(1))
            .with_lock_timeout(Duration::from_millis(self.lock_timeout_ms))
            .with_strict_word_count(self.strict_word_count)
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("glovestore")
            .join("config.toml")
    }

    /// Load config from file, returning defaults if not found
    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config file: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Write the example config file, replacing any existing one
    pub fn write_example() -> anyhow::Result<()> {
        let path = Self::config_path();
        let example = r#"# glovestore configuration
# Location: ~/.config/glovestore/config.toml

[store]
# Store directory used when --dir is not given
dir = "glove.store"

# Open an existing store directory as-is (true), or leave it untouched and
# build into a new uniquely named directory next to it (false)
reuse = true

# Records between durability commits while building
commit_interval = 10000

# How long to wait for the store lock, in milliseconds
lock_timeout_ms = 1000

# Fail the build when the header word count does not match the records read
strict_word_count = true

[filter]
# Marker substituted for tokens that have no embedding
oov_marker = "UNK"
"#;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, example)?;
        Ok(())
    }
}

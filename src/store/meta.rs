//! Store metadata handling

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// File name of the metadata file inside a store directory
pub const META_FILE: &str = "store.meta.json";

/// Current metadata format version
pub const META_VERSION: &str = "1.0";

/// Store metadata stored alongside the record log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMeta {
    /// Metadata format version
    pub version: String,

    /// Distinct words persisted, known once the build has finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,

    /// Embedding width declared by the source header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,

    /// Bytes of the record log covered by the last commit
    pub committed_len: u64,

    /// Source file name the store was built from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Set by the final commit of a build; unfinished stores are never opened
    #[serde(default)]
    pub complete: bool,
}

impl StoreMeta {
    pub fn new(dimension: usize, source: Option<String>) -> Self {
        Self {
            version: META_VERSION.to_string(),
            word_count: None,
            dimension: Some(dimension),
            committed_len: 0,
            source,
            complete: false,
        }
    }

    /// Path of the metadata file for a store directory
    pub fn path_for(dir: &Path) -> PathBuf {
        dir.join(META_FILE)
    }

    /// Load metadata, `None` if the store has no metadata file
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = Self::path_for(dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::storage(&path, "cannot read store metadata", e)),
        };

        let meta: StoreMeta = serde_json::from_str(&content)
            .map_err(|e| StoreError::format(&path, Some(e.line()), e.to_string()))?;
        Ok(Some(meta))
    }

    /// Save metadata atomically (write to a temp file, then rename)
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = Self::path_for(dir);
        let tmp_path = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(self).map_err(|e| {
            StoreError::storage(&path, "cannot serialize store metadata", std::io::Error::other(e))
        })?;

        std::fs::write(&tmp_path, content)
            .map_err(|e| StoreError::storage(&tmp_path, "cannot write store metadata", e))?;
        std::fs::rename(&tmp_path, &path)
            .map_err(|e| StoreError::storage(&path, "cannot replace store metadata", e))?;
        Ok(())
    }
}

//! Error taxonomy for store construction
//!
//! All three variants are fatal to the call that produced them. A word that
//! is not in the store is never an error; queries return `Option` instead.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid store target or missing construction input
    #[error("invalid store configuration for {path:?}: {reason}")]
    Configuration { path: PathBuf, reason: String },

    /// Malformed embedding source or persisted data
    #[error("malformed embeddings in {path:?}{}: {reason}", line_suffix(.line))]
    Format {
        path: PathBuf,
        line: Option<usize>,
        reason: String,
    },

    /// I/O failure on the store directory or source file, or lock timeout
    #[error("storage failure at {path:?}: {context}")]
    Storage {
        path: PathBuf,
        context: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!(" (line {})", n),
        None => String::new(),
    }
}

impl StoreError {
    pub fn configuration(path: &Path, reason: impl Into<String>) -> Self {
        Self::Configuration {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn format(path: &Path, line: Option<usize>, reason: impl Into<String>) -> Self {
        Self::Format {
            path: path.to_path_buf(),
            line,
            reason: reason.into(),
        }
    }

    pub fn storage(path: &Path, context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.to_path_buf(),
            context: context.into(),
            source: Some(source),
        }
    }

    /// Storage failure with no underlying I/O error (e.g. lock timeout)
    pub fn storage_msg(path: &Path, context: impl Into<String>) -> Self {
        Self::Storage {
            path: path.to_path_buf(),
            context: context.into(),
            source: None,
        }
    }
}

#[cfg(test)]
impl StoreError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format { .. })
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

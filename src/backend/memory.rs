//! In-memory backend for small vocabularies and tests

use rustc_hash::FxHashMap;

use super::traits::{KvReader, KvWriter};
use crate::error::Result;

/// Key -> bytes map held entirely in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    entries: FxHashMap<String, Vec<u8>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvWriter for MemoryBackend {
    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn count(&self) -> usize {
        self.entries.len()
    }
}

impl KvReader for MemoryBackend {
    fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    fn count(&self) -> usize {
        self.entries.len()
    }

    fn any_value(&self) -> Option<&[u8]> {
        self.entries.values().next().map(Vec::as_slice)
    }
}

//! Key-value capability traits for store persistence

use crate::error::Result;

/// Write side of a key -> bytes backend
///
/// Writes become durable at the next `commit`. Putting an existing key
/// replaces its value.
pub trait KvWriter {
    /// Append a value for `key`
    fn put(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Make every write so far durable
    fn commit(&mut self) -> Result<()>;

    /// Number of distinct keys written
    fn count(&self) -> usize;
}

/// Read side of a key -> bytes backend
pub trait KvReader: Send + Sync {
    /// Exact-match lookup
    fn get(&self, key: &str) -> Option<&[u8]>;

    /// Number of distinct keys
    fn count(&self) -> usize;

    /// Value of an arbitrary record, `None` for an empty backend
    fn any_value(&self) -> Option<&[u8]>;

    /// Check if a key is present
    fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

//! Directory-backed backend - append-only record log with a mapped reader
//!
//! Record layout in `words.log`:
//! `u32 LE key length | key bytes | u32 LE value length | value bytes`.
//! Only the prefix covered by `StoreMeta::committed_len` is trusted when
//! metadata is present.

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use memmap2::Mmap;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use super::lock::{DirLock, LockMode};
use super::traits::{KvReader, KvWriter};
use crate::error::{Result, StoreError};
use crate::store::meta::StoreMeta;

/// Record log file name inside a store directory
pub const LOG_FILE: &str = "words.log";

const LEN_PREFIX: usize = std::mem::size_of::<u32>();

/// Writer for building a store directory
pub struct SegmentWriter {
    dir: PathBuf,
    writer: BufWriter<File>,
    keys: FxHashSet<String>,
    position: u64,
    meta: StoreMeta,
    _lock: DirLock,
}

impl SegmentWriter {
    /// Create the record log in a directory that holds no store yet
    ///
    /// Holds the exclusive directory lock until dropped. A directory that
    /// already has a log or metadata is refused, never truncated.
    pub fn create(dir: &Path, meta: StoreMeta, lock_timeout: Duration) -> Result<Self> {
        let lock = DirLock::acquire(dir, LockMode::Exclusive, lock_timeout)?;

        if StoreMeta::path_for(dir).exists() {
            return Err(already_built(dir));
        }
        let log_path = dir.join(LOG_FILE);
        let file = File::options()
            .write(true)
            .create_new(true)
            .open(&log_path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => already_built(dir),
                _ => StoreError::storage(&log_path, "cannot create record log", e),
            })?;

        let mut meta = meta;
        meta.committed_len = 0;
        meta.word_count = None;
        meta.complete = false;
        meta.save(dir)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            writer: BufWriter::new(file),
            keys: FxHashSet::default(),
            position: 0,
            meta,
            _lock: lock,
        })
    }

    /// Final commit, recording the distinct word count
    pub fn finish(mut self) -> Result<StoreMeta> {
        self.meta.word_count = Some(self.keys.len());
        self.meta.complete = true;
        self.commit()?;
        Ok(self.meta)
    }

    fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    fn write_prefixed(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u32::try_from(bytes.len()).map_err(|_| {
            StoreError::storage_msg(&self.log_path(), format!("record field too large: {} bytes", bytes.len()))
        })?;

        let log_path = self.log_path();
        self.writer
            .write_all(&len.to_le_bytes())
            .and_then(|_| self.writer.write_all(bytes))
            .map_err(|e| StoreError::storage(&log_path, "cannot append record", e))?;

        self.position += (LEN_PREFIX + bytes.len()) as u64;
        Ok(())
    }
}

impl KvWriter for SegmentWriter {
    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.write_prefixed(key.as_bytes())?;
        self.write_prefixed(value)?;

        if !self.keys.contains(key) {
            self.keys.insert(key.to_string());
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let log_path = self.log_path();
        self.writer
            .flush()
            .and_then(|_| self.writer.get_ref().sync_data())
            .map_err(|e| StoreError::storage(&log_path, "cannot flush record log", e))?;

        self.meta.committed_len = self.position;
        self.meta.save(&self.dir)?;

        debug!("Committed {} bytes to {:?}", self.position, log_path);
        Ok(())
    }

    fn count(&self) -> usize {
        self.keys.len()
    }
}

/// Read-only view over a store directory
pub struct SegmentReader {
    mmap: Option<Mmap>,
    /// word -> (value offset, value length) in the mapped log
    index: FxHashMap<String, (usize, usize)>,
    sample: Option<(usize, usize)>,
    meta: Option<StoreMeta>,
    _lock: DirLock,
}

impl SegmentReader {
    /// Open a store directory for reading
    ///
    /// Holds a shared directory lock for the lifetime of the reader.
    pub fn open(dir: &Path, lock_timeout: Duration) -> Result<Self> {
        let log_path = dir.join(LOG_FILE);
        if !log_path.is_file() {
            return Err(StoreError::storage_msg(
                dir,
                format!("no vector store found (missing {})", LOG_FILE),
            ));
        }

        let lock = DirLock::acquire(dir, LockMode::Shared, lock_timeout)?;
        let meta = StoreMeta::load(dir)?;
        if meta.as_ref().is_some_and(|m| !m.complete) {
            return Err(StoreError::storage_msg(
                dir,
                "store is incomplete because an earlier build did not finish; remove the directory and build again",
            ));
        }

        let file = File::open(&log_path)
            .map_err(|e| StoreError::storage(&log_path, "cannot open record log", e))?;
        let file_len = file
            .metadata()
            .map_err(|e| StoreError::storage(&log_path, "cannot stat record log", e))?
            .len() as usize;

        let mmap = if file_len == 0 {
            None
        } else {
            // Safety: the log is only written under the exclusive lock, and we hold the shared one
            Some(unsafe { Mmap::map(&file) }.map_err(|e| StoreError::storage(&log_path, "cannot map record log", e))?)
        };

        let limit = match &meta {
            Some(meta) => {
                let committed = meta.committed_len as usize;
                if committed > file_len {
                    return Err(StoreError::format(
                        &log_path,
                        None,
                        format!("metadata claims {} committed bytes but log has {}", committed, file_len),
                    ));
                }
                committed
            }
            None => file_len,
        };

        let bytes: &[u8] = mmap.as_deref().unwrap_or(&[]);
        let (index, sample) = scan(&log_path, &bytes[..limit])?;

        debug!("Opened {:?}: {} words in {} bytes", dir, index.len(), limit);

        Ok(Self {
            mmap,
            index,
            sample,
            meta,
            _lock: lock,
        })
    }

    pub fn meta(&self) -> Option<&StoreMeta> {
        self.meta.as_ref()
    }

    fn slice(&self, (offset, len): (usize, usize)) -> &[u8] {
        match &self.mmap {
            Some(mmap) => &mmap[offset..offset + len],
            None => &[],
        }
    }
}

fn already_built(dir: &Path) -> StoreError {
    StoreError::storage_msg(dir, "directory already holds a store; refusing to overwrite it")
}

type ScanResult = (FxHashMap<String, (usize, usize)>, Option<(usize, usize)>);

/// Index every complete record in `bytes`; later records replace earlier ones
fn scan(log_path: &Path, bytes: &[u8]) -> Result<ScanResult> {
    let mut index = FxHashMap::default();
    let mut sample = None;
    let mut width: Option<usize> = None;
    let mut pos = 0usize;

    while pos < bytes.len() {
        let record_start = pos;

        let Some((key_start, key_len)) = read_field(bytes, pos) else {
            warn!(
                "Ignoring truncated record at byte {} of {:?}",
                record_start, log_path
            );
            break;
        };
        let Some((value_start, value_len)) = read_field(bytes, key_start + key_len) else {
            warn!(
                "Ignoring truncated record at byte {} of {:?}",
                record_start, log_path
            );
            break;
        };

        let key = std::str::from_utf8(&bytes[key_start..key_start + key_len]).map_err(|e| {
            StoreError::format(log_path, None, format!("record at byte {} has a non UTF-8 key: {}", record_start, e))
        })?;

        match width {
            None => width = Some(value_len),
            Some(w) if w != value_len => {
                return Err(StoreError::format(
                    log_path,
                    None,
                    format!(
                        "record '{}' has {} value bytes, earlier records have {}",
                        key, value_len, w
                    ),
                ));
            }
            Some(_) => {}
        }

        if sample.is_none() {
            sample = Some((value_start, value_len));
        }
        index.insert(key.to_string(), (value_start, value_len));
        pos = value_start + value_len;
    }

    Ok((index, sample))
}

/// Read a length-prefixed field at `pos`, returning (data start, data length)
fn read_field(bytes: &[u8], pos: usize) -> Option<(usize, usize)> {
    let prefix = bytes.get(pos..pos + LEN_PREFIX)?;
    let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    let start = pos + LEN_PREFIX;
    if start + len > bytes.len() {
        return None;
    }
    Some((start, len))
}

impl KvReader for SegmentReader {
    fn get(&self, key: &str) -> Option<&[u8]> {
        self.index.get(key).map(|&span| self.slice(span))
    }

    fn count(&self) -> usize {
        self.index.len()
    }

    fn any_value(&self) -> Option<&[u8]> {
        self.sample.map(|span| self.slice(span))
    }
}

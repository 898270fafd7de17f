//! Advisory directory lock - one writer or many readers

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::thread::sleep;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{Result, StoreError};

/// Lock file name inside a store directory
pub const LOCK_FILE: &str = "write.lock";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Held lock on a store directory, released on drop
#[derive(Debug)]
pub struct DirLock {
    _file: File,
}

impl DirLock {
    /// Acquire the directory lock, waiting at most `timeout`
    pub fn acquire(dir: &Path, mode: LockMode, timeout: Duration) -> Result<Self> {
        let path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| StoreError::storage(&path, "cannot open lock file", e))?;

        let deadline = Instant::now() + timeout;
        loop {
            // fs2's trait methods, not the inherent std ones
            let locked = match mode {
                LockMode::Shared => FileExt::try_lock_shared(&file),
                LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
            };
            match locked {
                Ok(()) => return Ok(Self { _file: file }),
                Err(_) if Instant::now() >= deadline => {
                    let label = match mode {
                        LockMode::Shared => "read",
                        LockMode::Exclusive => "write",
                    };
                    return Err(StoreError::storage_msg(
                        dir,
                        format!(
                            "store is locked, could not get {} access within {:?}; another process may be building it",
                            label, timeout
                        ),
                    ));
                }
                Err(_) => sleep(POLL_INTERVAL),
            }
        }
    }
}

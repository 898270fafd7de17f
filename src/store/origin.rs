//! Store origin - how a store directory was obtained
//!
//! `StoreOrigin::resolve` decides between building fresh, reusing an
//! existing directory, or redirecting to a new one. Filesystem probing and
//! directory creation go through [`StoreEnv`] so the decision can be tested
//! without touching disk.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Result, StoreError};

/// Filesystem side effects needed by the lifecycle decision
pub trait StoreEnv {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn is_readable(&self, path: &Path) -> bool;

    /// Create the store directory; fails if it already exists
    fn create_dir(&self, path: &Path) -> std::io::Result<()>;

    /// A candidate path for a redirected store next to `requested`
    fn unique_sibling(&self, requested: &Path) -> PathBuf;
}

/// Real filesystem environment
#[derive(Debug, Default, Clone, Copy)]
pub struct FsEnv;

impl StoreEnv for FsEnv {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_readable(&self, path: &Path) -> bool {
        std::fs::read_dir(path).is_ok()
    }

    fn create_dir(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir(path)
    }

    fn unique_sibling(&self, requested: &Path) -> PathBuf {
        let id = Uuid::new_v4().to_string();
        match requested.parent() {
            Some(parent) => parent.join(id),
            None => PathBuf::from(id),
        }
    }
}

/// How the store directory was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOrigin {
    /// Directory did not exist; built from the source
    Fresh { dir: PathBuf },
    /// Existing directory opened as-is; source not read
    Reused { dir: PathBuf },
    /// Existing directory left untouched; built into a new one instead
    Redirected { requested: PathBuf, dir: PathBuf },
}

impl StoreOrigin {
    /// Decide how to obtain the store at `target`
    pub fn resolve(env: &dyn StoreEnv, target: &Path, reuse: bool) -> Result<Self> {
        if !env.exists(target) {
            return Ok(Self::Fresh {
                dir: target.to_path_buf(),
            });
        }

        if reuse {
            if !env.is_dir(target) {
                return Err(StoreError::configuration(
                    target,
                    "store path exists but is not a directory",
                ));
            }
            if !env.is_readable(target) {
                return Err(StoreError::configuration(
                    target,
                    "store path exists but cannot be read",
                ));
            }
            return Ok(Self::Reused {
                dir: target.to_path_buf(),
            });
        }

        let mut dir = env.unique_sibling(target);
        while env.exists(&dir) {
            dir = env.unique_sibling(target);
        }
        warn!("Changing store path from {:?} to {:?}", target, dir);

        Ok(Self::Redirected {
            requested: target.to_path_buf(),
            dir,
        })
    }

    /// Directory that holds the store
    pub fn dir(&self) -> &Path {
        match self {
            Self::Fresh { dir } | Self::Reused { dir } | Self::Redirected { dir, .. } => dir,
        }
    }

    /// Whether the store has to be built from the source
    pub fn needs_build(&self) -> bool {
        !matches!(self, Self::Reused { .. })
    }

    /// Create the directory for a store that will be built
    pub fn prepare(&self, env: &dyn StoreEnv) -> Result<()> {
        if !self.needs_build() {
            return Ok(());
        }
        let dir = self.dir();
        info!("Creating directory {:?}", dir);
        env.create_dir(dir).map_err(|e| {
            let context = match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    "store directory appeared before the build started; another build may be running"
                }
                _ => "cannot create store directory",
            };
            StoreError::storage(dir, context, e)
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Fresh { .. } => "fresh",
            Self::Reused { .. } => "reused",
            Self::Redirected { .. } => "redirected",
        }
    }
}

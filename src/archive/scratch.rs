//! Temporary extraction directories.
//!
//! [`ScratchSpace`] owns a root directory chosen by the caller and hands out
//! uniquely named [`ScratchDir`]s below it. A scratch dir is removed when it
//! is released or dropped, on every exit path. Removal failures are logged
//! and never returned.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use super::ArchiveError;

/// What happens to scratch directories once they are no longer needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupPolicy {
    /// Delete the directory and everything in it.
    #[default]
    Remove,
    /// Leave the directory in place (for inspection).
    Keep,
}

/// Root under which extraction directories are created.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
    policy: CleanupPolicy,
}

impl ScratchSpace {
    /// Create a scratch space rooted at `root`. The root is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, policy: CleanupPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    /// Default root: `<system temp>/dedup`.
    #[must_use]
    pub fn default_root() -> PathBuf {
        std::env::temp_dir().join("dedup")
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cleanup policy.
    #[must_use]
    pub fn policy(&self) -> CleanupPolicy {
        self.policy
    }

    /// Create a fresh, empty directory whose name starts with `label`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] if the root or the directory cannot be
    /// created.
    pub fn create(&self, label: &str) -> Result<ScratchDir, ArchiveError> {
        std::fs::create_dir_all(&self.root).map_err(|source| ArchiveError::Io {
            path: self.root.clone(),
            source,
        })?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("{label}-"))
            .tempdir_in(&self.root)
            .map_err(|source| ArchiveError::Io {
                path: self.root.clone(),
                source,
            })?;
        log::debug!("Created scratch directory {}", dir.path().display());

        Ok(ScratchDir {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
            policy: self.policy,
        })
    }
}

/// A scratch directory, removed on [`ScratchDir::release`] or drop.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    dir: Option<TempDir>,
    policy: CleanupPolicy,
}

impl ScratchDir {
    /// Location of the directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove (or keep, per policy) the directory now.
    ///
    /// Returns the removal error if there was one; it has already been
    /// logged. Calling this more than once is a no-op.
    pub fn release(&mut self) -> Option<io::Error> {
        let dir = self.dir.take()?;
        match self.policy {
            CleanupPolicy::Keep => {
                let kept = dir.keep();
                log::info!("Keeping temporary directory {}", kept.display());
                None
            }
            CleanupPolicy::Remove => match dir.close() {
                Ok(()) => {
                    log::info!("Temporary directory {} deleted", self.path.display());
                    None
                }
                Err(e) => {
                    log::warn!(
                        "Error deleting temporary directory {}: {}",
                        self.path.display(),
                        e
                    );
                    Some(e)
                }
            },
        }
    }

    /// Whether the directory has already been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.dir.is_none()
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

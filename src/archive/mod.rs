//! Archive collaborators.
//!
//! The duplicate detection core never parses archives. It relies on two
//! capabilities provided here:
//!
//! * [`ArchiveTool`]: unpack an archive into a directory, and delete named
//!   members from an archive in place. [`RarTool`] implements it with the
//!   `rar` command line program.
//! * [`ScratchSpace`]: temporary extraction directories under a caller-chosen
//!   root, removed when their [`ScratchDir`] guard is released or dropped.
//!
//! ```no_run
//! use archive_dedup::archive::{ArchiveTool, CleanupPolicy, RarTool, ScratchSpace};
//! use std::path::Path;
//!
//! let scratch = ScratchSpace::new(std::env::temp_dir().join("dedup"), CleanupPolicy::Remove);
//! let dir = scratch.create("reference").unwrap();
//! RarTool::default().extract(Path::new("base.rar"), dir.path()).unwrap();
//! ```

pub mod rar;
pub mod scratch;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use rar::RarTool;
pub use scratch::{CleanupPolicy, ScratchDir, ScratchSpace};

/// Error type for archive collaborator operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive tool could not be started.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        /// Program that was launched
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The archive tool ran but reported failure.
    #[error("'{program}' failed on {archive} ({status}): {stderr}")]
    ToolFailed {
        /// Program that was launched
        program: String,
        /// Archive it was working on
        archive: PathBuf,
        /// Exit status description
        status: String,
        /// Captured standard error, trimmed
        stderr: String,
    },

    /// A member name would be read by the tool as a wildcard mask or would
    /// break the list file.
    #[error("cannot pass member '{member}' of {archive} to the archive tool")]
    UnsafeMemberName {
        /// Archive the member belongs to
        archive: PathBuf,
        /// Offending relative path
        member: String,
    },

    /// A temporary file or directory could not be prepared.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    /// Get the archive associated with this error (if any).
    #[must_use]
    pub fn archive(&self) -> Option<&Path> {
        match self {
            Self::ToolFailed { archive, .. } | Self::UnsafeMemberName { archive, .. } => {
                Some(archive)
            }
            Self::Spawn { .. } | Self::Io { .. } => None,
        }
    }
}

/// Unpack and member-deletion capabilities for one archive format.
pub trait ArchiveTool {
    /// Unpack `archive` under `dest`, preserving relative member paths.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the archive cannot be unpacked.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ArchiveError>;

    /// Remove the named members (`/`-separated relative paths) from `archive`
    /// in one call.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the archive is left unchanged or the tool
    /// reports failure.
    fn delete_members(&self, archive: &Path, members: &[String]) -> Result<(), ArchiveError>;
}

impl<T: ArchiveTool + ?Sized> ArchiveTool for &T {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
        (**self).extract(archive, dest)
    }

    fn delete_members(&self, archive: &Path, members: &[String]) -> Result<(), ArchiveError> {
        (**self).delete_members(archive, members)
    }
}

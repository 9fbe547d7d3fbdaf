//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing an extracted
//! archive tree and collecting the regular files in it.
//!
//! # Walk Order
//!
//! The walk is depth-first and single-threaded. Entries of each directory are
//! visited in byte-wise file-name order, and a directory's contents are
//! visited right after the directory itself. The order therefore depends only
//! on the names in the tree and is identical from run to run.
//!
//! Symbolic links are never followed and never reported as files.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use super::{FileEntry, ScanError, Tree};

/// Directory walker for sorted file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Tree the discovered files are tagged with
    tree: Tree,
}

impl Walker {
    /// Create a walker for a reference tree rooted at `path`.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self::for_tree(path, Tree::Reference)
    }

    /// Create a walker tagging files with the given tree.
    #[must_use]
    pub fn for_tree(path: &Path, tree: Tree) -> Self {
        Self {
            root: path.to_path_buf(),
            tree,
        }
    }

    /// Root being walked.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree, yielding every regular file in walk order.
    ///
    /// Errors for individual entries are yielded in place and do not end
    /// the iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        if entry.file_type().is_symlink() {
                            log::trace!("Skipping symlink: {}", entry.path().display());
                        }
                        return None;
                    }

                    let path = entry.path();
                    let Some(relative) = relative_path(&self.root, path) else {
                        log::warn!("Skipping file with a non-UTF-8 name: {}", path.display());
                        return None;
                    };

                    match entry.metadata() {
                        Ok(metadata) => Some(Ok(FileEntry::new(
                            self.tree,
                            relative,
                            path.to_path_buf(),
                            metadata.len(),
                        ))),
                        Err(e) => Some(Err(self.handle_walk_error(path.to_path_buf(), e))),
                    }
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                    Some(Err(self.handle_walk_error(path, e)))
                }
            })
    }

    /// Collect every file, failing on the first walk error.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotFound`] / [`ScanError::NotADirectory`] for a bad
    /// root, or the first error met while walking.
    pub fn collect_files(&self) -> Result<Vec<FileEntry>, ScanError> {
        self.validate_root()?;
        self.walk().collect()
    }

    /// Check that the root exists and is a directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotFound`] or [`ScanError::NotADirectory`].
    pub fn validate_root(&self) -> Result<(), ScanError> {
        if !self.root.exists() {
            return Err(ScanError::NotFound(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }
        Ok(())
    }

    fn handle_walk_error(&self, path: PathBuf, error: walkdir::Error) -> ScanError {
        use std::io::ErrorKind;

        let Some(io_error) = error.into_io_error() else {
            log::warn!("Filesystem loop at {}", path.display());
            return ScanError::Io {
                path,
                source: std::io::Error::other("filesystem loop detected"),
            };
        };

        match io_error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path)
            }
            ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
                ScanError::NotFound(path)
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), io_error);
                ScanError::Io {
                    path,
                    source: io_error,
                }
            }
        }
    }
}

/// Count the regular files under `root` (the pre-walk used for `i / N` status).
///
/// Entries the walk cannot read are left out of the count; they were already
/// logged by the walker.
///
/// # Errors
///
/// Returns [`ScanError::NotFound`] / [`ScanError::NotADirectory`] for a bad root.
pub fn count_files(root: &Path) -> Result<usize, ScanError> {
    let walker = Walker::new(root);
    walker.validate_root()?;
    let count = count_readable(walker.walk());
    Ok(count)
}

fn count_readable(entries: impl Iterator<Item = Result<FileEntry, ScanError>>) -> usize {
    entries.filter(Result::is_ok).count()
}

/// Express `path` relative to `root` with `/` separators.
///
/// Returns `None` when `path` is not under `root` or contains components that
/// cannot be represented as UTF-8 names.
#[must_use]
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let stripped = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in stripped.components() {
        match component {
            Component::Normal(name) => parts.push(name.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

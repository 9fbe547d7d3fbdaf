//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Sorted, single-threaded directory walking using walkdir
//! - Streaming content digests with BLAKE3
//! - Relative path normalization
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: BLAKE3 file hashing (streaming)
//! - [`source`]: How file content is opened
//!
//! # Example
//!
//! ```no_run
//! use archive_dedup::scanner::Walker;
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/tmp/extracted"));
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.relative_path, file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod source;
pub mod walker;

use std::fmt;
use std::path::{Path, PathBuf};

// Re-export main types
pub use hasher::{hash_to_hex, Digest, Hasher, HASH_CHUNK_SIZE};
pub use source::{FileSource, LocalFiles, OpenFile};
pub use walker::{count_files, relative_path, Walker};

/// Which of the two trees a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tree {
    /// The baseline tree whose content is kept.
    Reference,
    /// The tree being shrunk.
    Target,
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tree::Reference => write!(f, "reference"),
            Tree::Target => write!(f, "target"),
        }
    }
}

/// A regular file discovered under one tree root.
///
/// Identity is `(tree, relative_path)`; `path` is the absolute location used
/// for reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Tree the file was found in
    pub tree: Tree,
    /// Path relative to the tree root, `/`-separated, case preserved
    pub relative_path: String,
    /// Full path on disk
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileEntry {
    /// Create a new FileEntry.
    #[must_use]
    pub fn new(tree: Tree, relative_path: String, path: PathBuf, size: u64) -> Self {
        Self {
            tree,
            relative_path,
            path,
            size,
        }
    }

    /// Location of the same relative path under another root.
    #[must_use]
    pub fn counterpart_in(&self, root: &Path) -> PathBuf {
        self.relative_path
            .split('/')
            .fold(root.to_path_buf(), |acc, part| acc.join(part))
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// Walking the tree failed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

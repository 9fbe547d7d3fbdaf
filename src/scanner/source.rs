//! Access to file content.
//!
//! Comparison and hashing read files through a [`FileSource`] rather than
//! opening them directly. [`LocalFiles`] reads from the filesystem; other
//! sources can serve content from elsewhere or simulate read faults.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// An open file: its reader and its content length in bytes.
pub type OpenFile = (Box<dyn Read + Send>, u64);

/// Opens files for reading.
pub trait FileSource: Send + Sync + fmt::Debug {
    /// Open `path` and report its length.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from opening or inspecting the file.
    fn open(&self, path: &Path) -> io::Result<OpenFile>;
}

/// Reads files straight from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFiles;

impl FileSource for LocalFiles {
    fn open(&self, path: &Path) -> io::Result<OpenFile> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok((Box::new(file), len))
    }
}

/// Local files, except that the named ones fail to open.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FailingSource {
    names: std::collections::HashSet<String>,
}

#[cfg(test)]
impl FailingSource {
    pub(crate) fn failing(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| (*n).to_string()).collect(),
        }
    }
}

#[cfg(test)]
impl FileSource for FailingSource {
    fn open(&self, path: &Path) -> io::Result<OpenFile> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if self.names.contains(name) {
            return Err(io::Error::other("injected read fault"));
        }
        LocalFiles.open(path)
    }
}

//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//!
//! [`Hasher`] streams file contents through BLAKE3 in fixed-size chunks, so
//! files of any size are digested in constant memory. Every chunk is reported
//! to a callback with the number of bytes just consumed, which lets callers
//! keep a running byte total across many files.

use std::io::{ErrorKind, Read};
use std::path::Path;

use super::{FileSource, HashError, LocalFiles};

/// Default chunk size for hashing (64 KiB).
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// A 256-bit content digest.
pub type Digest = [u8; 32];

/// Streaming BLAKE3 hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    chunk_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default 64 KiB chunk size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunk_size: HASH_CHUNK_SIZE,
        }
    }

    /// Use a different chunk size. Values below one byte are raised to one.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Configured chunk size in bytes.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Digest the whole content of a file.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Io`] if the file cannot be opened or read.
    pub fn full_hash(&self, path: &Path) -> Result<Digest, HashError> {
        self.hash_file(path, &mut |_| {})
    }

    /// Digest a file, calling `on_chunk` with the size of every chunk read.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Io`] if the file cannot be opened or read.
    pub fn hash_file(
        &self,
        path: &Path,
        on_chunk: &mut dyn FnMut(u64),
    ) -> Result<Digest, HashError> {
        self.hash_from(&LocalFiles, path, on_chunk)
    }

    /// Like [`Hasher::hash_file`], reading `path` through `source`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Io`] if `source` cannot open or read the file.
    pub fn hash_from(
        &self,
        source: &dyn FileSource,
        path: &Path,
        on_chunk: &mut dyn FnMut(u64),
    ) -> Result<Digest, HashError> {
        let io_error = |source| HashError::Io {
            path: path.to_path_buf(),
            source,
        };
        let (reader, _len) = source.open(path).map_err(io_error)?;
        self.hash_reader(reader, on_chunk).map_err(io_error)
    }

    /// Digest everything readable from `reader`.
    ///
    /// # Errors
    ///
    /// Propagates read errors other than `Interrupted`.
    pub fn hash_reader<R: Read>(
        &self,
        mut reader: R,
        on_chunk: &mut dyn FnMut(u64),
    ) -> std::io::Result<Digest> {
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..n]);
            on_chunk(n as u64);
        }

        Ok(*hasher.finalize().as_bytes())
    }
}

/// Render a digest as lowercase hex.
#[must_use]
pub fn hash_to_hex(digest: &Digest) -> String {
    blake3::Hash::from(*digest).to_hex().to_string()
}

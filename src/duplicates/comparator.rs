//! Exact, streaming content comparison.
//!
//! # Overview
//!
//! [`compare_streams`] decides whether two byte sources of known length hold
//! identical content. Sources are read in lock-step, one fixed-size chunk at a
//! time, so memory use is bounded by two chunk buffers whatever the file size.
//!
//! # Progress
//!
//! The callback receives `0.0` before the first read, `bytes_read / length`
//! after every chunk that does not finish the comparison, and exactly one
//! `1.0` when a verdict is reached. A length mismatch and empty inputs emit
//! only the final `1.0`.
//!
//! # Errors
//!
//! A read failure is returned as [`CompareError`], naming the side that
//! failed. It is never folded into [`Comparison::Unequal`].

use std::io::{ErrorKind, Read};
use std::path::Path;

use serde::Serialize;

use crate::scanner::{FileSource, LocalFiles, Tree};

/// Default chunk size for paired comparison (1 MiB).
pub const COMPARE_CHUNK_SIZE: usize = 1024 * 1024;

/// Verdict of comparing two byte sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Identical content.
    Equal,
    /// Different length or content.
    Unequal,
}

/// A read failure on one side of a comparison.
#[derive(thiserror::Error, Debug)]
#[error("failed to read {side} file: {source}")]
pub struct CompareError {
    /// Side whose read failed
    pub side: Tree,
    /// The underlying I/O error
    #[source]
    pub source: std::io::Error,
}

impl CompareError {
    fn new(side: Tree, source: std::io::Error) -> Self {
        Self { side, source }
    }
}

/// Compare two files on disk.
///
/// Lengths come from file metadata. Both handles are closed on every return
/// path, including the length short-circuit.
///
/// # Errors
///
/// Returns [`CompareError`] if either file cannot be opened, stat'ed or read.
pub fn compare_files(
    reference: &Path,
    target: &Path,
    chunk_size: usize,
    on_fraction: &mut dyn FnMut(f64),
) -> Result<Comparison, CompareError> {
    compare_files_from(&LocalFiles, reference, target, chunk_size, on_fraction)
}

/// Like [`compare_files`], opening both files through `source`.
///
/// # Errors
///
/// Returns [`CompareError`] if `source` cannot open or read either file.
pub fn compare_files_from(
    source: &dyn FileSource,
    reference: &Path,
    target: &Path,
    chunk_size: usize,
    on_fraction: &mut dyn FnMut(f64),
) -> Result<Comparison, CompareError> {
    let (ref_reader, ref_len) = source
        .open(reference)
        .map_err(|e| CompareError::new(Tree::Reference, e))?;
    let (target_reader, target_len) = source
        .open(target)
        .map_err(|e| CompareError::new(Tree::Target, e))?;

    compare_streams(
        ref_reader,
        ref_len,
        target_reader,
        target_len,
        chunk_size,
        on_fraction,
    )
}

/// Compare two readers of declared lengths for byte equality.
///
/// # Arguments
///
/// * `reference`, `reference_len` - First source and its true length
/// * `target`, `target_len` - Second source and its true length
/// * `chunk_size` - Bytes read from each side per step (raised to at least 1)
/// * `on_fraction` - Progress callback, see the module docs
///
/// # Errors
///
/// Returns [`CompareError`] if a read fails.
///
/// # Example
///
/// ```
/// use archive_dedup::duplicates::{compare_streams, Comparison};
///
/// let a: &[u8] = b"same bytes";
/// let b: &[u8] = b"same bytes";
/// let verdict = compare_streams(a, 10, b, 10, 4, &mut |_| {}).unwrap();
/// assert_eq!(verdict, Comparison::Equal);
/// ```
pub fn compare_streams<A: Read, B: Read>(
    mut reference: A,
    reference_len: u64,
    mut target: B,
    target_len: u64,
    chunk_size: usize,
    on_fraction: &mut dyn FnMut(f64),
) -> Result<Comparison, CompareError> {
    if reference_len != target_len {
        on_fraction(1.0);
        return Ok(Comparison::Unequal);
    }
    if reference_len == 0 {
        on_fraction(1.0);
        return Ok(Comparison::Equal);
    }

    let chunk_size = chunk_size.max(1);
    let mut ref_buf = vec![0u8; chunk_size];
    let mut target_buf = vec![0u8; chunk_size];
    let mut bytes_read = 0u64;

    on_fraction(0.0);
    let verdict = loop {
        let ref_n = read_chunk(&mut reference, &mut ref_buf)
            .map_err(|e| CompareError::new(Tree::Reference, e))?;
        let target_n = read_chunk(&mut target, &mut target_buf)
            .map_err(|e| CompareError::new(Tree::Target, e))?;

        if ref_n != target_n || ref_buf[..ref_n] != target_buf[..target_n] {
            break Comparison::Unequal;
        }
        if ref_n == 0 {
            break Comparison::Equal;
        }

        bytes_read += ref_n as u64;
        if bytes_read < reference_len {
            on_fraction(bytes_read as f64 / reference_len as f64);
        }
    };

    on_fraction(1.0);
    Ok(verdict)
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
///
/// Short reads are retried, so the two sides of a comparison always line up
/// on the same byte offsets.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

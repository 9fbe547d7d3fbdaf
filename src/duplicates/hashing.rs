//! Digest-based duplicate detection.
//!
//! # Overview
//!
//! This strategy hashes each tree on its own ([`hash_tree`]) and compares the
//! resulting path-to-digest maps ([`diff_by_hash`]). Only one tree has to be
//! on disk at a time, so an archive can be extracted, hashed and removed
//! before the next one is extracted.
//!
//! Digest equality is treated as content equality. A BLAKE3 collision would
//! make two different files look identical; that risk is accepted here and is
//! the one way this strategy differs from [`super::PairedDiffer`].
//!
//! # Progress
//!
//! Progress for a tree is `bytes hashed / total bytes in the tree`, one
//! running total for the whole walk, so it only ever moves forward.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::{ComparisonResult, DiffError, DiffReport, MissingReason, Outcome, TreeDiffer};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::scanner::{
    Digest, FileEntry, FileSource, Hasher, LocalFiles, ScanError, Tree, Walker, HASH_CHUNK_SIZE,
};

/// Configuration for the hashing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashConfig {
    /// Bytes fed to the digest per read.
    pub chunk_size: usize,
    /// Abort on the first read failure instead of skipping the file.
    pub fail_fast: bool,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            chunk_size: HASH_CHUNK_SIZE,
            fail_fast: false,
        }
    }
}

impl HashConfig {
    /// Set the chunk size (raised to at least one byte).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Enable or disable fail-fast.
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Hashed(Digest),
    Unreadable(String),
}

/// Digests of one tree, keyed by relative path, kept in walk order.
#[derive(Debug, Clone, Default)]
pub struct DigestMap {
    entries: Vec<(String, Slot)>,
    index: HashMap<String, usize>,
    bytes_hashed: u64,
}

impl DigestMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a digest for `path`, replacing any earlier value.
    pub fn insert(&mut self, path: impl Into<String>, digest: Digest) {
        self.put(path.into(), Slot::Hashed(digest));
    }

    fn insert_unreadable(&mut self, path: String, reason: String) {
        self.put(path, Slot::Unreadable(reason));
    }

    fn put(&mut self, path: String, slot: Slot) {
        if let Some(&i) = self.index.get(&path) {
            self.entries[i].1 = slot;
        } else {
            self.index.insert(path.clone(), self.entries.len());
            self.entries.push((path, slot));
        }
    }

    fn slot(&self, path: &str) -> Option<&Slot> {
        self.index.get(path).map(|&i| &self.entries[i].1)
    }

    /// Digest recorded for `path`, if it was hashed.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Digest> {
        match self.slot(path) {
            Some(Slot::Hashed(digest)) => Some(digest),
            _ => None,
        }
    }

    /// Hashed paths and digests in walk order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Digest)> {
        self.entries.iter().filter_map(|(path, slot)| match slot {
            Slot::Hashed(digest) => Some((path.as_str(), digest)),
            Slot::Unreadable(_) => None,
        })
    }

    /// Number of hashed paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether no path was hashed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Paths that could not be read, in walk order.
    pub fn unreadable(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(path, slot)| match slot {
            Slot::Unreadable(_) => Some(path.as_str()),
            Slot::Hashed(_) => None,
        })
    }

    /// Total bytes fed through the digest.
    #[must_use]
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed
    }
}

/// Hash every regular file under `root`.
///
/// # Errors
///
/// Returns [`DiffError::Walk`] if the root cannot be walked, and
/// [`DiffError::IoReadFailed`] on a read failure when `config.fail_fast` is set.
pub fn hash_tree(
    root: &Path,
    tree: Tree,
    config: &HashConfig,
    progress: &dyn ProgressSink,
) -> Result<DigestMap, DiffError> {
    hash_tree_from(&LocalFiles, root, tree, config, progress)
}

/// Like [`hash_tree`], reading file content through `source`.
///
/// Entries the walk cannot read are skipped with a warning, or end the run
/// with [`DiffError::Walk`] when `config.fail_fast` is set.
///
/// # Errors
///
/// See [`hash_tree`].
pub fn hash_tree_from(
    source: &dyn FileSource,
    root: &Path,
    tree: Tree,
    config: &HashConfig,
    progress: &dyn ProgressSink,
) -> Result<DigestMap, DiffError> {
    let walker = Walker::for_tree(root, tree);
    walker.validate_root().map_err(|e| DiffError::walk(tree, e))?;
    hash_entries(source, walker.walk(), tree, config, progress)
}

fn hash_entries(
    source: &dyn FileSource,
    entries: impl Iterator<Item = Result<FileEntry, ScanError>>,
    tree: Tree,
    config: &HashConfig,
    progress: &dyn ProgressSink,
) -> Result<DigestMap, DiffError> {
    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(file) => files.push(file),
            Err(e) if config.fail_fast => return Err(DiffError::walk(tree, e)),
            Err(e) => log::warn!("Skipping unreadable {} entry: {}", tree, e),
        }
    }

    let total_bytes: u64 = files.iter().map(|f| f.size).sum();
    let hasher = Hasher::new().with_chunk_size(config.chunk_size);
    let label = format!("Hashing {tree} tree");
    let phase = format!("hash {tree}");

    log::info!(
        "Hashing {} files ({} bytes) in {} tree",
        files.len(),
        total_bytes,
        tree
    );
    progress.on_phase_start(&phase, files.len());

    let mut map = DigestMap::new();
    let mut done = 0u64;
    for file in files {
        let result = hasher.hash_from(source, &file.path, &mut |n| {
            done += n;
            if done < total_bytes {
                let fraction = done as f64 / total_bytes as f64;
                progress.on_progress(&ProgressEvent::new(&label, fraction));
            }
        });

        match result {
            Ok(digest) => map.insert(file.relative_path, digest),
            Err(e) if config.fail_fast => {
                progress.on_phase_end(&phase);
                return Err(DiffError::from_hash(tree, file.relative_path, e));
            }
            Err(e) => {
                log::warn!("Skipping {}: {}", file.relative_path, e);
                map.insert_unreadable(file.relative_path, e.to_string());
            }
        }
    }

    map.bytes_hashed = done;
    progress.on_progress(&ProgressEvent::new(&label, 1.0));
    progress.on_phase_end(&phase);
    Ok(map)
}

/// Compare two digest maps by relative path.
///
/// Produces one verdict per reference path, in reference walk order. A path
/// is a duplicate only when both maps hold a digest for it and the digests
/// match; paths present in only one map never match.
#[must_use]
pub fn diff_by_hash(reference: &DigestMap, target: &DigestMap) -> DiffReport {
    let mut report = DiffReport {
        bytes_processed: reference.bytes_hashed + target.bytes_hashed,
        ..DiffReport::default()
    };

    for (path, slot) in &reference.entries {
        let outcome = match (slot, target.slot(path)) {
            (Slot::Unreadable(reason), _) | (_, Some(Slot::Unreadable(reason))) => {
                Outcome::Missing(MissingReason::Unreadable(reason.clone()))
            }
            (Slot::Hashed(_), None) => Outcome::Missing(MissingReason::NotInTarget),
            (Slot::Hashed(a), Some(Slot::Hashed(b))) if a == b => Outcome::Equal,
            (Slot::Hashed(_), Some(Slot::Hashed(_))) => Outcome::Unequal,
        };
        report.record(ComparisonResult::new(path.clone(), outcome));
    }

    report
}

/// Tree differ that hashes each tree independently.
#[derive(Debug, Clone)]
pub struct HashDiffer {
    config: HashConfig,
    source: Arc<dyn FileSource>,
}

impl Default for HashDiffer {
    fn default() -> Self {
        Self::new(HashConfig::default())
    }
}

impl HashDiffer {
    /// Create a differ with the given configuration.
    #[must_use]
    pub fn new(config: HashConfig) -> Self {
        Self {
            config,
            source: Arc::new(LocalFiles),
        }
    }

    /// Read file content through `source` instead of the local filesystem.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn FileSource>) -> Self {
        self.source = source;
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &HashConfig {
        &self.config
    }

    /// Hash one tree with this differ's configuration and source.
    ///
    /// # Errors
    ///
    /// See [`hash_tree`].
    pub fn hash_tree(
        &self,
        root: &Path,
        tree: Tree,
        progress: &dyn ProgressSink,
    ) -> Result<DigestMap, DiffError> {
        hash_tree_from(self.source.as_ref(), root, tree, &self.config, progress)
    }
}

impl TreeDiffer for HashDiffer {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn diff(
        &self,
        reference: &Path,
        target: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<DiffReport, DiffError> {
        let reference_map = self.hash_tree(reference, Tree::Reference, progress)?;
        let target_map = self.hash_tree(target, Tree::Target, progress)?;
        Ok(diff_by_hash(&reference_map, &target_map))
    }
}

//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Exact streaming comparison of two files ([`comparator`])
//! - Paired walk of a reference and a target tree ([`differ`])
//! - Digest-based detection when the trees are never present together ([`hashing`])
//!
//! Both tree strategies implement [`TreeDiffer`] and produce the same
//! [`DiffReport`], so callers can swap one for the other.
//!
//! Matching is path-addressed: a target file is only ever a duplicate of the
//! reference file at the same relative path.

pub mod comparator;
pub mod differ;
pub mod hashing;

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::progress::ProgressSink;
use crate::scanner::{HashError, ScanError, Tree};

pub use comparator::{
    compare_files, compare_files_from, compare_streams, CompareError, Comparison,
    COMPARE_CHUNK_SIZE,
};
pub use differ::{DifferConfig, PairedDiffer};
pub use hashing::{diff_by_hash, hash_tree, hash_tree_from, DigestMap, HashConfig, HashDiffer};

/// Why a reference path has no comparable counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum MissingReason {
    /// Nothing exists at the path in the target tree.
    NotInTarget,
    /// Something exists at the path but it is not a regular file.
    NotAFile,
    /// The content could not be read; carries the error message.
    Unreadable(String),
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingReason::NotInTarget => write!(f, "not present in target"),
            MissingReason::NotAFile => write!(f, "target is not a regular file"),
            MissingReason::Unreadable(msg) => write!(f, "unreadable: {msg}"),
        }
    }
}

/// Outcome of looking at one reference path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Content is identical.
    Equal,
    /// Content differs.
    Unequal,
    /// No comparison was possible.
    Missing(MissingReason),
}

/// A per-path verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonResult {
    /// Relative path the verdict concerns
    pub path: String,
    /// The verdict
    pub outcome: Outcome,
}

impl ComparisonResult {
    /// Create a new result.
    #[must_use]
    pub fn new(path: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            path: path.into(),
            outcome,
        }
    }

    /// Whether the path is a duplicate.
    #[must_use]
    pub fn is_equal(&self) -> bool {
        self.outcome == Outcome::Equal
    }
}

/// Ordered list of relative paths judged equal, in reference walk order.
///
/// Paths are unique: the set is built with one entry per reference file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DuplicateSet {
    paths: Vec<String>,
}

impl DuplicateSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, path: String) {
        self.paths.push(path);
    }

    /// Paths in walk order.
    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Number of paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterate over the paths.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.paths.iter()
    }

    /// Consume the set, returning the paths.
    #[must_use]
    pub fn into_paths(self) -> Vec<String> {
        self.paths
    }
}

impl<'a> IntoIterator for &'a DuplicateSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

/// Everything one differ run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffReport {
    /// Paths to remove from the target
    pub duplicates: DuplicateSet,
    /// One verdict per reference file, in walk order
    pub results: Vec<ComparisonResult>,
    /// Bytes read or hashed during the run
    pub bytes_processed: u64,
}

impl DiffReport {
    /// Record a verdict, adding the path to the duplicate set when equal.
    pub(crate) fn record(&mut self, result: ComparisonResult) {
        if result.is_equal() {
            self.duplicates.push(result.path.clone());
        }
        self.results.push(result);
    }

    /// Number of verdicts matching a predicate.
    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// Paths judged equal.
    #[must_use]
    pub fn equal_count(&self) -> usize {
        self.count(|o| *o == Outcome::Equal)
    }

    /// Paths whose content differs.
    #[must_use]
    pub fn unequal_count(&self) -> usize {
        self.count(|o| *o == Outcome::Unequal)
    }

    /// Paths with no target counterpart.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                Outcome::Missing(MissingReason::NotInTarget | MissingReason::NotAFile)
            )
        })
    }

    /// Paths that could not be read.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Missing(MissingReason::Unreadable(_))))
    }
}

/// Errors that abort a differ run.
#[derive(thiserror::Error, Debug)]
pub enum DiffError {
    /// A tree root could not be walked.
    #[error("cannot walk {tree} tree: {source}")]
    Walk {
        /// Which tree
        tree: Tree,
        /// Underlying walk error
        #[source]
        source: ScanError,
    },

    /// Reading a file failed and fail-fast is enabled.
    #[error("failed to read {path}: {source}")]
    IoReadFailed {
        /// Relative path being compared or hashed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl DiffError {
    pub(crate) fn walk(tree: Tree, source: ScanError) -> Self {
        Self::Walk { tree, source }
    }

    pub(crate) fn from_hash(tree: Tree, path: String, error: HashError) -> Self {
        match error {
            HashError::Scan(source) => Self::Walk { tree, source },
            HashError::Io { source, .. } => Self::IoReadFailed { path, source },
        }
    }
}

/// A strategy that finds the target files duplicating reference files.
///
/// # Example
///
/// ```no_run
/// use archive_dedup::duplicates::{PairedDiffer, TreeDiffer};
/// use archive_dedup::progress::NoProgress;
/// use std::path::Path;
///
/// let differ = PairedDiffer::default();
/// let report = differ
///     .diff(Path::new("/tmp/ref"), Path::new("/tmp/target"), &NoProgress)
///     .unwrap();
/// for path in &report.duplicates {
///     println!("{path}");
/// }
/// ```
pub trait TreeDiffer {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Compare `target` against `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError`] when a root cannot be walked, or when a read
    /// fails and the strategy is configured to fail fast.
    fn diff(
        &self,
        reference: &Path,
        target: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<DiffReport, DiffError>;
}

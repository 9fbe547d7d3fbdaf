//! End-to-end archive deduplication.
//!
//! # Overview
//!
//! [`Deduplicator`] sequences one run:
//! 1. **Extract** both archives into their own scratch directories
//! 2. **Detect** duplicates with the configured [`Strategy`]
//! 3. **Clean up** the scratch directories (before any deletion)
//! 4. **Delete** every duplicate from the target archive in one call
//! 5. **Report** the outcome as a [`DedupReport`]
//!
//! Scratch directories are guards: any early return, including an extraction
//! failure for the second archive, removes the ones already created. The
//! full duplicate set is always computed before the deletion call is issued.
//!
//! # Strategies
//!
//! * [`Strategy::Compare`] keeps both extracted trees on disk and compares
//!   them byte-for-byte with [`PairedDiffer`].
//! * [`Strategy::Hash`] extracts, hashes and removes one archive at a time,
//!   then compares digests with [`diff_by_hash`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::archive::{ArchiveError, ArchiveTool, CleanupPolicy, ScratchDir, ScratchSpace};
use crate::duplicates::{
    diff_by_hash, DiffError, DiffReport, DifferConfig, DigestMap, DuplicateSet, HashConfig,
    HashDiffer, PairedDiffer, TreeDiffer,
};
use crate::progress::ProgressSink;
use crate::scanner::{FileSource, LocalFiles, Tree};

/// Duplicate detection strategy.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Exact byte comparison; both trees extracted at once
    #[default]
    Compare,
    /// BLAKE3 digests; one tree extracted at a time
    Hash,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Compare => write!(f, "compare"),
            Strategy::Hash => write!(f, "hash"),
        }
    }
}

/// Settings for one deduplication run.
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// Detection strategy
    pub strategy: Strategy,
    /// Settings for [`Strategy::Compare`]
    pub differ: DifferConfig,
    /// Settings for [`Strategy::Hash`]
    pub hashing: HashConfig,
    /// Directory under which archives are extracted
    pub scratch_root: PathBuf,
    /// What to do with extraction directories afterwards
    pub cleanup: CleanupPolicy,
    /// Compute duplicates but leave the target archive untouched
    pub dry_run: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            differ: DifferConfig::default(),
            hashing: HashConfig::default(),
            scratch_root: ScratchSpace::default_root(),
            cleanup: CleanupPolicy::default(),
            dry_run: false,
        }
    }
}

impl DedupConfig {
    /// Set the strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set fail-fast for both strategies.
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.differ = self.differ.with_fail_fast(fail_fast);
        self.hashing = self.hashing.with_fail_fast(fail_fast);
        self
    }

    /// Set the scratch root.
    #[must_use]
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }

    /// Set the cleanup policy.
    #[must_use]
    pub fn with_cleanup(mut self, cleanup: CleanupPolicy) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Outcome of a deduplication run.
#[derive(Debug, Clone, Serialize)]
pub struct DedupReport {
    /// Reference archive
    pub reference: PathBuf,
    /// Target archive
    pub target: PathBuf,
    /// Strategy used
    pub strategy: Strategy,
    /// Paths judged duplicate, in reference walk order
    pub duplicates: DuplicateSet,
    /// Reference files examined
    pub files_examined: usize,
    /// Files whose content differed
    pub unequal: usize,
    /// Reference files with no target counterpart
    pub missing: usize,
    /// Files that could not be read
    pub unreadable: usize,
    /// Bytes read or hashed
    pub bytes_processed: u64,
    /// Whether the deletion call was issued and succeeded
    pub deleted: bool,
}

impl DedupReport {
    fn new(reference: &Path, target: &Path, strategy: Strategy, diff: DiffReport) -> Self {
        Self {
            reference: reference.to_path_buf(),
            target: target.to_path_buf(),
            strategy,
            files_examined: diff.results.len(),
            unequal: diff.unequal_count(),
            missing: diff.missing_count(),
            unreadable: diff.failed_count(),
            bytes_processed: diff.bytes_processed,
            duplicates: diff.duplicates,
            deleted: false,
        }
    }

    /// Number of members removed from the target archive.
    #[must_use]
    pub fn removed_count(&self) -> usize {
        if self.deleted {
            self.duplicates.len()
        } else {
            0
        }
    }
}

/// Errors that end a deduplication run.
#[derive(thiserror::Error, Debug)]
pub enum DedupError {
    /// An input archive does not exist or is not a file.
    #[error("Archive not found: {0}")]
    InputNotFound(PathBuf),

    /// A scratch directory could not be created.
    #[error("cannot prepare temporary directory: {0}")]
    Scratch(#[source] ArchiveError),

    /// An archive could not be extracted.
    #[error("failed to extract {archive}: {source}")]
    ExtractionFailed {
        /// Archive being extracted
        archive: PathBuf,
        #[source]
        source: ArchiveError,
    },

    /// Duplicate detection failed.
    #[error(transparent)]
    Diff(#[from] DiffError),

    /// The duplicates could not be deleted from the target archive.
    ///
    /// The computed set is kept so it can be shown or retried.
    #[error("failed to delete {} files from {archive}: {source}", .duplicates.len())]
    ArchiveDeletionFailed {
        /// Target archive
        archive: PathBuf,
        /// The duplicate set that was to be deleted
        duplicates: DuplicateSet,
        #[source]
        source: ArchiveError,
    },
}

/// Orchestrates extraction, detection, cleanup and deletion.
pub struct Deduplicator<T: ArchiveTool> {
    tool: T,
    config: DedupConfig,
    source: Arc<dyn FileSource>,
}

impl<T: ArchiveTool> Deduplicator<T> {
    /// Create a deduplicator using `tool` for archive access.
    #[must_use]
    pub fn new(tool: T, config: DedupConfig) -> Self {
        Self {
            tool,
            config,
            source: Arc::new(LocalFiles),
        }
    }

    /// Read extracted files through `source` instead of the local filesystem.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn FileSource>) -> Self {
        self.source = source;
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Remove from `target` every file identical to the same path in `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`DedupError`] if:
    /// - Either archive does not exist (checked before any extraction)
    /// - Extraction of either archive fails
    /// - A read fails while fail-fast is enabled
    /// - The deletion call fails
    pub fn run(
        &self,
        reference: &Path,
        target: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<DedupReport, DedupError> {
        check_input(reference)?;
        check_input(target)?;

        let diff = self.find_duplicates(reference, target, progress)?;
        let mut report = DedupReport::new(reference, target, self.config.strategy, diff);

        if self.config.dry_run {
            log::info!(
                "Dry run: {} files would be deleted from {}",
                report.duplicates.len(),
                target.display()
            );
            return Ok(report);
        }
        if report.duplicates.is_empty() {
            log::info!("No duplicates found");
            return Ok(report);
        }

        log::info!("Deleting files from {}...", target.display());
        if let Err(source) = self.tool.delete_members(target, report.duplicates.paths()) {
            return Err(DedupError::ArchiveDeletionFailed {
                archive: target.to_path_buf(),
                duplicates: report.duplicates,
                source,
            });
        }
        report.deleted = true;
        Ok(report)
    }

    /// Extract both archives and compute the duplicate set, removing every
    /// scratch directory before returning.
    ///
    /// # Errors
    ///
    /// See [`Deduplicator::run`].
    pub fn find_duplicates(
        &self,
        reference: &Path,
        target: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<DiffReport, DedupError> {
        let scratch = ScratchSpace::new(&self.config.scratch_root, self.config.cleanup);
        log::debug!("Using scratch root {}", scratch.root().display());

        match self.config.strategy {
            Strategy::Compare => {
                log::info!("Extracting archives...");
                let mut reference_dir = self.extract(&scratch, reference, Tree::Reference)?;
                let mut target_dir = self.extract(&scratch, target, Tree::Target)?;

                log::info!("Finding equal files...");
                let differ =
                    PairedDiffer::new(self.config.differ).with_source(Arc::clone(&self.source));
                let result = differ.diff(reference_dir.path(), target_dir.path(), progress);

                log::info!("Removing temporary directories...");
                reference_dir.release();
                target_dir.release();
                Ok(result?)
            }
            Strategy::Hash => {
                let differ =
                    HashDiffer::new(self.config.hashing).with_source(Arc::clone(&self.source));
                let reference_map =
                    self.hash_archive(&scratch, &differ, reference, Tree::Reference, progress)?;
                let target_map =
                    self.hash_archive(&scratch, &differ, target, Tree::Target, progress)?;

                log::info!("Finding equal files...");
                Ok(diff_by_hash(&reference_map, &target_map))
            }
        }
    }

    fn extract(
        &self,
        scratch: &ScratchSpace,
        archive: &Path,
        tree: Tree,
    ) -> Result<ScratchDir, DedupError> {
        let dir = scratch.create(&tree.to_string()).map_err(DedupError::Scratch)?;
        self.tool
            .extract(archive, dir.path())
            .map_err(|source| DedupError::ExtractionFailed {
                archive: archive.to_path_buf(),
                source,
            })?;
        Ok(dir)
    }

    fn hash_archive(
        &self,
        scratch: &ScratchSpace,
        differ: &HashDiffer,
        archive: &Path,
        tree: Tree,
        progress: &dyn ProgressSink,
    ) -> Result<DigestMap, DedupError> {
        log::info!("Extracting {}...", archive.display());
        let mut dir = self.extract(scratch, archive, tree)?;
        let result = differ.hash_tree(dir.path(), tree, progress);
        dir.release();
        Ok(result?)
    }
}

fn check_input(path: &Path) -> Result<(), DedupError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DedupError::InputNotFound(path.to_path_buf()))
    }
}

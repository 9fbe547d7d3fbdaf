//! Paired tree comparison.
//!
//! # Overview
//!
//! [`PairedDiffer`] walks the reference tree and, for each regular file,
//! compares it byte-for-byte with the file at the same relative path in the
//! target tree. Both trees must be readable at the same time.
//!
//! Before comparing, the reference tree is walked once to count its files so
//! each status line can show `path (i / N)`.
//!
//! # Failure Policy
//!
//! A read failure on one file is logged and recorded as
//! [`MissingReason::Unreadable`]; the run continues. With
//! [`DifferConfig::fail_fast`] set, the first read failure aborts the run
//! with [`DiffError::IoReadFailed`]. Reference entries the walk cannot read
//! follow the same policy: skipped with a warning, or [`DiffError::Walk`]
//! under fail-fast.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use super::comparator::{compare_files_from, Comparison, COMPARE_CHUNK_SIZE};
use super::{ComparisonResult, DiffError, DiffReport, MissingReason, Outcome, TreeDiffer};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::scanner::{count_files, FileEntry, FileSource, LocalFiles, ScanError, Tree, Walker};

/// Phase name reported to progress sinks.
pub const COMPARE_PHASE: &str = "compare";

/// Configuration for the paired differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifferConfig {
    /// Bytes read from each file per step.
    pub chunk_size: usize,
    /// Abort on the first read failure instead of skipping the file.
    pub fail_fast: bool,
}

impl Default for DifferConfig {
    fn default() -> Self {
        Self {
            chunk_size: COMPARE_CHUNK_SIZE,
            fail_fast: false,
        }
    }
}

impl DifferConfig {
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

/// Tree differ that reads both trees in lock-step.
#[derive(Debug, Clone)]
pub struct PairedDiffer {
    config: DifferConfig,
    source: Arc<dyn FileSource>,
}

impl Default for PairedDiffer {
    fn default() -> Self {
        Self::new(DifferConfig::default())
    }
}

impl PairedDiffer {
    /// Create a differ with the given configuration.
    #[must_use]
    pub fn new(config: DifferConfig) -> Self {
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
    pub fn config(&self) -> &DifferConfig {
        &self.config
    }

    /// Compare one reference file against its counterpart under `target_root`.
    fn compare_entry(
        &self,
        entry: &FileEntry,
        target_root: &Path,
        status: &str,
        progress: &dyn ProgressSink,
    ) -> Result<Outcome, DiffError> {
        let counterpart = entry.counterpart_in(target_root);

        match fs::symlink_metadata(&counterpart) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                log::debug!("Target counterpart is not a file: {}", entry.relative_path);
                return Ok(Outcome::Missing(MissingReason::NotAFile));
            }
            // A file where the target expects a parent directory also means absent.
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                log::trace!("Not in target: {}", entry.relative_path);
                return Ok(Outcome::Missing(MissingReason::NotInTarget));
            }
            Err(e) => return self.read_failure(&entry.relative_path, e),
        }

        let verdict = compare_files_from(
            self.source.as_ref(),
            &entry.path,
            &counterpart,
            self.config.chunk_size,
            &mut |fraction| progress.on_progress(&ProgressEvent::new(status, fraction)),
        );

        match verdict {
            Ok(Comparison::Equal) => Ok(Outcome::Equal),
            Ok(Comparison::Unequal) => Ok(Outcome::Unequal),
            Err(e) => {
                log::debug!("{} side failed for {}", e.side, entry.relative_path);
                self.read_failure(&entry.relative_path, e.source)
            }
        }
    }

    fn read_failure(&self, path: &str, error: std::io::Error) -> Result<Outcome, DiffError> {
        if self.config.fail_fast {
            return Err(DiffError::IoReadFailed {
                path: path.to_string(),
                source: error,
            });
        }
        log::warn!("Skipping {}: {}", path, error);
        Ok(Outcome::Missing(MissingReason::Unreadable(error.to_string())))
    }

    /// Compare every walked reference entry against `target`.
    ///
    /// Walk errors are skipped with a warning unless fail-fast is set.
    fn compare_entries(
        &self,
        entries: impl Iterator<Item = Result<FileEntry, ScanError>>,
        total: usize,
        target: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<DiffReport, DiffError> {
        let mut report = DiffReport::default();
        let mut index = 0usize;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if self.config.fail_fast => {
                    return Err(DiffError::walk(Tree::Reference, e));
                }
                Err(e) => {
                    log::warn!("Skipping unreadable reference entry: {}", e);
                    continue;
                }
            };
            index += 1;

            let status = format!("{} ({} / {})", entry.relative_path, index, total);
            let outcome = self.compare_entry(&entry, target, &status, progress)?;
            if !matches!(outcome, Outcome::Missing(_)) {
                report.bytes_processed += entry.size;
            }
            report.record(ComparisonResult::new(entry.relative_path, outcome));
        }

        Ok(report)
    }
}

impl TreeDiffer for PairedDiffer {
    fn name(&self) -> &'static str {
        "compare"
    }

    fn diff(
        &self,
        reference: &Path,
        target: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<DiffReport, DiffError> {
        let walker = Walker::for_tree(reference, Tree::Reference);
        walker
            .validate_root()
            .map_err(|e| DiffError::walk(Tree::Reference, e))?;
        Walker::for_tree(target, Tree::Target)
            .validate_root()
            .map_err(|e| DiffError::walk(Tree::Target, e))?;

        let total = count_files(reference).map_err(|e| DiffError::walk(Tree::Reference, e))?;
        log::info!("Comparing {} reference files", total);

        progress.on_phase_start(COMPARE_PHASE, total);
        let result = self.compare_entries(walker.walk(), total, target, progress);
        progress.on_phase_end(COMPARE_PHASE);
        let report = result?;

        log::info!(
            "Compared {} files: {} equal, {} different, {} missing, {} unreadable",
            report.results.len(),
            report.equal_count(),
            report.unequal_count(),
            report.missing_count(),
            report.failed_count()
        );
        Ok(report)
    }
}

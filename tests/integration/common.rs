//! Shared fixtures: a fake archive tool backed by plain directories and a
//! progress sink that records every event.

#![allow(dead_code)]

use archive_dedup::archive::{ArchiveError, ArchiveTool};
use archive_dedup::progress::{ProgressEvent, ProgressSink};
use archive_dedup::scanner::{FileSource, LocalFiles, OpenFile};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Write `files` (relative path, content) under `root`, creating parents.
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    fs::create_dir_all(root).unwrap();
    for (rel, content) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

/// Recursively copy the contents of `from` into `to`.
pub fn copy_dir(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), dest)?;
        }
    }
    Ok(())
}

/// An extraction as seen by [`FakeTool`].
#[derive(Debug, Clone)]
pub struct Extraction {
    pub archive: PathBuf,
    pub dest: PathBuf,
    /// Directories present under the scratch root when extraction started,
    /// including `dest` itself.
    pub live_dirs: usize,
}

/// [`ArchiveTool`] whose "archives" are fixture directories.
#[derive(Default)]
pub struct FakeTool {
    fixtures: HashMap<PathBuf, PathBuf>,
    failing: HashSet<PathBuf>,
    fail_delete: bool,
    pub extractions: Mutex<Vec<Extraction>>,
    pub deletions: Mutex<Vec<(PathBuf, Vec<String>)>>,
}

impl FakeTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracting `archive` copies the contents of `dir`.
    pub fn with_archive(mut self, archive: &Path, dir: &Path) -> Self {
        self.fixtures.insert(archive.to_path_buf(), dir.to_path_buf());
        self
    }

    /// Extracting `archive` fails.
    pub fn failing_extract(mut self, archive: &Path) -> Self {
        self.failing.insert(archive.to_path_buf());
        self
    }

    /// Every deletion call fails.
    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn extractions(&self) -> Vec<Extraction> {
        self.extractions.lock().unwrap().clone()
    }

    pub fn deletions(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.deletions.lock().unwrap().clone()
    }

    fn tool_failure(archive: &Path) -> ArchiveError {
        ArchiveError::ToolFailed {
            program: "fake".into(),
            archive: archive.to_path_buf(),
            status: "exit status: 3".into(),
            stderr: "simulated failure".into(),
        }
    }
}

impl ArchiveTool for FakeTool {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
        let live_dirs = dest
            .parent()
            .and_then(|root| fs::read_dir(root).ok())
            .map_or(0, |entries| entries.count());
        self.extractions.lock().unwrap().push(Extraction {
            archive: archive.to_path_buf(),
            dest: dest.to_path_buf(),
            live_dirs,
        });

        if self.failing.contains(archive) {
            return Err(Self::tool_failure(archive));
        }
        let source = self
            .fixtures
            .get(archive)
            .ok_or_else(|| Self::tool_failure(archive))?;
        copy_dir(source, dest).map_err(|source| ArchiveError::Io {
            path: dest.to_path_buf(),
            source,
        })
    }

    fn delete_members(&self, archive: &Path, members: &[String]) -> Result<(), ArchiveError> {
        self.deletions
            .lock()
            .unwrap()
            .push((archive.to_path_buf(), members.to_vec()));
        if self.fail_delete {
            return Err(Self::tool_failure(archive));
        }
        Ok(())
    }
}

/// Reads local files, except that files with the given names fail to open.
#[derive(Debug, Default)]
pub struct FailingSource {
    names: HashSet<String>,
}

impl FailingSource {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| (*n).to_string()).collect(),
        }
    }
}

impl FileSource for FailingSource {
    fn open(&self, path: &Path) -> io::Result<OpenFile> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if self.names.contains(name) {
            return Err(io::Error::other("injected read fault"));
        }
        LocalFiles.open(path)
    }
}

/// Progress sink that keeps every event.
#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<(String, f64)>>,
    pub phases: Mutex<Vec<(String, usize)>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, f64)> {
        self.events.lock().unwrap().clone()
    }

    /// Fractions reported for ids starting with `prefix`.
    pub fn fractions_for(&self, prefix: &str) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter(|(id, _)| id.starts_with(prefix))
            .map(|(_, fraction)| fraction)
            .collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        self.phases.lock().unwrap().push((phase.to_string(), total));
    }

    fn on_progress(&self, event: &ProgressEvent<'_>) {
        self.events
            .lock()
            .unwrap()
            .push((event.id.to_string(), event.fraction));
    }
}

/// A temporary workspace with two fixture trees, two archive stand-ins and a
/// scratch root.
pub struct Workspace {
    pub dir: tempfile::TempDir,
    pub reference_archive: PathBuf,
    pub target_archive: PathBuf,
    pub reference_tree: PathBuf,
    pub target_tree: PathBuf,
    pub scratch_root: PathBuf,
}

impl Workspace {
    pub fn new(reference: &[(&str, &[u8])], target: &[(&str, &[u8])]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let reference_tree = dir.path().join("fixtures/reference");
        let target_tree = dir.path().join("fixtures/target");
        write_tree(&reference_tree, reference);
        write_tree(&target_tree, target);

        let reference_archive = dir.path().join("base.rar");
        let target_archive = dir.path().join("update.rar");
        fs::write(&reference_archive, b"").unwrap();
        fs::write(&target_archive, b"").unwrap();

        Self {
            scratch_root: dir.path().join("scratch"),
            dir,
            reference_archive,
            target_archive,
            reference_tree,
            target_tree,
        }
    }

    /// Fake tool serving both fixture trees.
    pub fn tool(&self) -> FakeTool {
        FakeTool::new()
            .with_archive(&self.reference_archive, &self.reference_tree)
            .with_archive(&self.target_archive, &self.target_tree)
    }

    /// Entries left under the scratch root.
    pub fn scratch_leftovers(&self) -> usize {
        fs::read_dir(&self.scratch_root).map_or(0, |entries| entries.count())
    }
}

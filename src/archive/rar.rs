//! `rar` command line driver.
//!
//! Extraction runs `rar x -y <archive> <dest>/`. Deletion writes the member
//! names, one per line, to a temporary list file and runs
//! `rar d <archive> @<listfile>`; the list file is removed afterwards whether
//! or not the tool succeeded.
//!
//! rar reads every list line as a file mask, so `*` and `?` in a member name
//! would match other members. Such names, and names containing line breaks,
//! are refused before rar is started.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::NamedTempFile;

use super::{ArchiveError, ArchiveTool};

/// Default program name looked up on `PATH`.
pub const DEFAULT_RAR_PROGRAM: &str = "rar";

/// [`ArchiveTool`] backed by the `rar` executable.
#[derive(Debug, Clone)]
pub struct RarTool {
    program: String,
}

impl Default for RarTool {
    fn default() -> Self {
        Self::new(DEFAULT_RAR_PROGRAM)
    }
}

impl RarTool {
    /// Use `program` (a name on `PATH` or a full path) as the rar executable.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Program this tool launches.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, archive: &Path, args: Vec<OsString>) -> Result<(), ArchiveError> {
        log::debug!("Running {} {:?}", self.program, args);
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| ArchiveError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        self.check(archive, &output)
    }

    fn check(&self, archive: &Path, output: &Output) -> Result<(), ArchiveError> {
        if output.status.success() {
            return Ok(());
        }
        Err(ArchiveError::ToolFailed {
            program: self.program.clone(),
            archive: archive.to_path_buf(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// `dest` with a trailing separator, which rar needs to treat it as a folder.
fn dest_arg(dest: &Path) -> OsString {
    let mut arg = dest.as_os_str().to_os_string();
    arg.push(std::path::MAIN_SEPARATOR_STR);
    arg
}

/// Member name as rar expects it on this platform.
fn member_name(relative: &str) -> String {
    if cfg!(windows) {
        relative.replace('/', "\\")
    } else {
        relative.to_string()
    }
}

/// Characters rar would not take literally in a list file line.
const UNSAFE_MEMBER_CHARS: &[char] = &['*', '?', '\n', '\r'];

/// Refuse the whole deletion if any member name is not a literal path.
fn check_member_names(archive: &Path, members: &[String]) -> Result<(), ArchiveError> {
    match members.iter().find(|m| m.contains(UNSAFE_MEMBER_CHARS)) {
        Some(member) => Err(ArchiveError::UnsafeMemberName {
            archive: archive.to_path_buf(),
            member: member.clone(),
        }),
        None => Ok(()),
    }
}

/// Write the list file consumed by `rar d @file`.
fn write_list_file(members: &[String]) -> Result<NamedTempFile, ArchiveError> {
    let io_err = |path: PathBuf| move |source| ArchiveError::Io { path, source };

    let mut file = NamedTempFile::new().map_err(io_err(std::env::temp_dir()))?;
    let path = file.path().to_path_buf();
    for member in members {
        writeln!(file, "{}", member_name(member)).map_err(io_err(path.clone()))?;
    }
    file.flush().map_err(io_err(path))?;
    Ok(file)
}

impl ArchiveTool for RarTool {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
        log::info!("Extracting {} to {}", archive.display(), dest.display());
        self.run(
            archive,
            vec![
                "x".into(),
                "-y".into(),
                archive.as_os_str().to_os_string(),
                dest_arg(dest),
            ],
        )
    }

    fn delete_members(&self, archive: &Path, members: &[String]) -> Result<(), ArchiveError> {
        check_member_names(archive, members)?;
        let list = write_list_file(members)?;
        log::debug!(
            "Wrote {} member names to {}",
            members.len(),
            list.path().display()
        );

        let mut list_arg = OsString::from("@");
        list_arg.push(list.path());
        let result = self.run(
            archive,
            vec!["d".into(), archive.as_os_str().to_os_string(), list_arg],
        );

        let list_path = list.path().to_path_buf();
        if let Err(e) = list.close() {
            log::warn!(
                "Failed to remove list file {}: {}",
                list_path.display(),
                e
            );
        }
        result
    }
}

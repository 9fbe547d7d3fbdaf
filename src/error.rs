//! Structured error handling and exit codes.

use serde::Serialize;

use crate::dedup::DedupError;
use crate::duplicates::DiffError;

/// Exit codes for the dedup application.
///
/// - 0: Success (including runs that found no duplicates)
/// - 1: General error (unexpected failure)
/// - 2: Usage error (bad arguments or missing input archive)
/// - 3: An archive could not be extracted
/// - 4: The archive tool failed to delete the duplicates
/// - 5: A file could not be read while fail-fast was enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the run completed.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Usage: arguments or inputs were rejected before any work began.
    Usage = 2,
    /// Extraction of an input archive failed.
    ExtractionFailed = 3,
    /// Deleting members from the target archive failed.
    DeletionFailed = 4,
    /// A read failed under fail-fast.
    ReadFailed = 5,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DD000",
            Self::GeneralError => "DD001",
            Self::Usage => "DD002",
            Self::ExtractionFailed => "DD003",
            Self::DeletionFailed => "DD004",
            Self::ReadFailed => "DD005",
        }
    }

    /// Pick the exit code for an error returned by the application.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<DedupError>() {
            Some(DedupError::InputNotFound(_)) => Self::Usage,
            Some(DedupError::ExtractionFailed { .. }) => Self::ExtractionFailed,
            Some(DedupError::ArchiveDeletionFailed { .. }) => Self::DeletionFailed,
            Some(DedupError::Diff(DiffError::IoReadFailed { .. })) => Self::ReadFailed,
            Some(DedupError::Diff(_) | DedupError::Scratch(_)) | None => Self::GeneralError,
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DD003")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Duplicate paths computed before a failed deletion, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicates: Option<Vec<String>>,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        let duplicates = match err.downcast_ref::<DedupError>() {
            Some(DedupError::ArchiveDeletionFailed { duplicates, .. }) => {
                Some(duplicates.paths().to_vec())
            }
            _ => None,
        };
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            duplicates,
        }
    }
}

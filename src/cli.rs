//! Command-line interface definitions for dedup.
//!
//! This module defines all CLI arguments and options using the clap derive API.
//!
//! # Example
//!
//! ```bash
//! # Remove from update.rar every file that base.rar already contains
//! dedup base.rar update.rar
//!
//! # Hash one archive at a time and only report what would be deleted
//! dedup base.rar update.rar --strategy hash --dry-run --output json
//!
//! # Extract somewhere roomier and keep the trees for inspection
//! dedup base.rar update.rar --temp-dir /mnt/scratch --keep-temp
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::dedup::Strategy;

/// Remove from a target archive every file that a reference archive already
/// contains at the same path with identical content.
#[derive(Debug, Parser)]
#[command(name = "dedup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Reference archive (read only)
    #[arg(value_name = "REFERENCE")]
    pub reference: PathBuf,

    /// Target archive; duplicates are deleted from it in place
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Directory under which archives are extracted
    #[arg(long, value_name = "PATH")]
    pub temp_dir: Option<PathBuf>,

    /// Duplicate detection strategy
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Abort on the first unreadable file instead of skipping it
    #[arg(long)]
    pub fail_fast: bool,

    /// Leave the extracted trees in place after the run
    #[arg(long)]
    pub keep_temp: bool,

    /// Report duplicates without modifying the target archive
    #[arg(long)]
    pub dry_run: bool,

    /// Read buffer size for comparing and hashing (e.g., 64KiB, 4MiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_chunk_size)]
    pub chunk_size: Option<usize>,

    /// rar executable to use for extraction and deletion
    #[arg(long = "rar", value_name = "PROGRAM")]
    pub rar_program: Option<String>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format for the final report
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Output format for the run report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One summary line
    #[default]
    Text,
    /// The full report as JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use archive_dedup::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    // Find where the number ends and the suffix begins
    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    if num < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}

/// Parse a read buffer size. Zero and sizes that do not fit in memory are
/// rejected.
///
/// # Errors
///
/// Returns an error for anything [`parse_size`] rejects, for zero, and for
/// values larger than `usize::MAX`.
pub fn parse_chunk_size(s: &str) -> Result<usize, String> {
    let bytes = parse_size(s)?;
    if bytes == 0 {
        return Err("Chunk size must be at least 1 byte".to_string());
    }
    usize::try_from(bytes).map_err(|_| format!("Chunk size too large: {bytes}"))
}

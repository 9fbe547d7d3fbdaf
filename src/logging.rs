//! Logging setup for dedup.
//!
//! Uses the `log` facade with an `env_logger` backend on stderr, so stdout
//! stays free for the summary line and the JSON report.
//!
//! The filter comes from `RUST_LOG` when it is set. Otherwise `--quiet` shows
//! errors only, `-v` adds debug output and `-vv` adds trace output.
//!
//! Every line carries the level and the message. With `-v` it also names the
//! module that logged it (`[dedup]`, `[archive::rar]`, ...). Debug builds
//! prefix a millisecond timestamp.
//!
//! # Example
//!
//! ```rust,no_run
//! use archive_dedup::logging::init_logging;
//!
//! init_logging(1, false);
//! log::debug!("Using scratch root /tmp/dedup");
//! ```

use env_logger::fmt::Formatter;
use env_logger::Builder;
use log::{LevelFilter, Record};
use std::env;
use std::io::{self, Write};

/// Crate prefix dropped from module labels.
const CRATE_TARGET: &str = "archive_dedup";

/// Install the logger for one run.
///
/// Only the first call in a process installs a logger; later calls are
/// ignored, so tests that go through [`crate::run_app`] more than once do
/// not panic.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=info, 1=debug, 2+=trace)
/// * `quiet` - Errors only (ignored when `RUST_LOG` is set)
pub fn init_logging(verbose: u8, quiet: bool) {
    let env_filter = env::var("RUST_LOG").ok().filter(|spec| !spec.trim().is_empty());

    let mut builder = Builder::new();
    match &env_filter {
        Some(spec) => builder.parse_filters(spec),
        None => builder.filter_level(determine_level(verbose, quiet)),
    };
    builder.format(move |buf, record| write_record(buf, record, verbose));

    if builder.try_init().is_err() {
        return;
    }
    match env_filter {
        Some(spec) => log::debug!("Log filter from RUST_LOG: {spec}"),
        None => log::debug!("Log level: {}", determine_level(verbose, quiet)),
    }
}

/// Level implied by the CLI flags. `quiet` wins over `verbose`.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn write_record(buf: &mut Formatter, record: &Record<'_>, verbose: u8) -> io::Result<()> {
    if cfg!(debug_assertions) {
        write!(buf, "{} ", buf.timestamp_millis())?;
    }
    let level = record.level();
    let style = buf.default_level_style(level);
    write!(buf, "{style}{level:<5}{style:#} ")?;
    if verbose >= 1 {
        write!(buf, "[{}] ", module_label(record.target()))?;
    }
    writeln!(buf, "{}", record.args())
}

/// Short label for a log target: the module path inside this crate, or the
/// target unchanged for other crates.
fn module_label(target: &str) -> &str {
    match target.strip_prefix(CRATE_TARGET) {
        Some("") => "dedup",
        Some(rest) => rest.strip_prefix("::").unwrap_or(target),
        None => target,
    }
}

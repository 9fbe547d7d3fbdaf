//! archive-dedup - remove duplicated files from an archive
//!
//! Given a reference archive and a target archive, deletes from the target
//! every file that the reference already contains at the same relative path
//! with identical content. Duplicates are found either by exact byte
//! comparison or by BLAKE3 digests.

pub mod archive;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod progress;
pub mod scanner;

use anyhow::Context;
use bytesize::ByteSize;

use crate::archive::RarTool;
use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::dedup::{DedupReport, Deduplicator};
use crate::error::ExitCode;
use crate::progress::Progress;

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded, the run fails, or the
/// report cannot be written.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_cli(&cli);
    log::debug!("Effective configuration: {config:?}");

    let dedup = Deduplicator::new(
        RarTool::new(config.rar_program.clone()),
        config.to_dedup_config(cli.dry_run),
    );
    let progress = Progress::new(cli.quiet || cli.output == OutputFormat::Json);
    let report = dedup.run(&cli.reference, &cli.target, &progress)?;

    match cli.output {
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", summary(&report, cli.dry_run));
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            println!("{json}");
        }
    }
    Ok(ExitCode::Success)
}

/// Final text summary for a run.
fn summary(report: &DedupReport, dry_run: bool) -> String {
    let target = report.target.display();
    let head = if dry_run {
        format!(
            "Dry run. {} files would be deleted from {target}.",
            report.duplicates.len()
        )
    } else {
        format!("Done. {} files deleted from {target}.", report.removed_count())
    };
    log::info!(
        "{} files examined, {} differ, {} missing, {} unreadable, {} processed",
        report.files_examined,
        report.unequal,
        report.missing,
        report.unreadable,
        ByteSize::b(report.bytes_processed)
    );
    head
}

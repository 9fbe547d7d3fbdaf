//! dedup - remove duplicated files from an archive
//!
//! Entry point for the dedup CLI application.

use archive_dedup::{
    cli::Cli,
    error::{ExitCode, StructuredError},
};
use clap::{CommandFactory, Parser};

fn main() {
    // Parse command-line arguments (clap exits with code 2 on bad usage)
    let cli = Cli::parse();
    let json_errors = cli.json_errors;

    // Run the application logic
    match archive_dedup::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            let exit_code = ExitCode::for_error(&err);

            // Report the error
            if json_errors {
                let structured = StructuredError::new(&err, exit_code);
                if let Ok(json) = serde_json::to_string_pretty(&structured) {
                    eprintln!("{}", json);
                } else {
                    eprintln!("[{}] Error: {}", exit_code.code_prefix(), err);
                }
            } else {
                eprintln!("[{}] Error: {}", exit_code.code_prefix(), err);
                if exit_code == ExitCode::Usage {
                    eprintln!("{}", Cli::command().render_usage());
                }
            }

            std::process::exit(exit_code.as_i32());
        }
    }
}

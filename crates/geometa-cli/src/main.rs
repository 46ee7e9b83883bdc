//! geometa CLI - Command-line interface
//!
//! Generates ISO 19139 metadata, a thumbnail and a PDF report for terrain
//! models and orthoimages.

mod batch;
mod cli;
mod commands;
mod config_loader;
mod dry_run;
mod errors;
mod output;
mod output_types;
mod progress;

use clap::Parser;
use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Logs go to stderr so --json output on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    match commands::execute(cli) {
        Ok(code) => code,
        Err(error) => {
            errors::from_anyhow(error).display(json);
            ExitCode::from(commands::FAILURE)
        }
    }
}

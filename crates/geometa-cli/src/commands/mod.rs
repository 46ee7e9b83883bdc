//! Command implementations

mod batch;
mod config;
mod generate;
mod init;
mod inspect;

use crate::cli::{Cli, Commands};
use crate::config_loader::LoadedConfig;
use crate::output::OutputWriter;
use anyhow::Result;
use geometa_core::config::ProfileOrigin;
use geometa_core::MetadataOrchestrator;
use geometa_iso::Iso19139Serializer;
use geometa_raster::GeoTiffInspector;
use std::process::ExitCode;

/// Process status codes
pub const SUCCESS: u8 = 0;
pub const FAILURE: u8 = 1;
/// Some artifacts were written, at least one failed
pub const PARTIAL_FAILURE: u8 = 2;

pub type Orchestrator = MetadataOrchestrator<GeoTiffInspector, Iso19139Serializer>;

/// Execute a CLI command
pub fn execute(cli: Cli) -> Result<ExitCode> {
    let output = OutputWriter::new(cli.json);
    let config = cli.config.as_deref();

    let status = match cli.command {
        Commands::Generate(args) => generate::execute(args, &output, config, cli.dry_run)?,
        Commands::Batch(args) => batch::execute(args, &output, config, cli.dry_run)?,
        Commands::Inspect(args) => inspect::execute(args, &output)?,
        Commands::Config => config::execute(&output, config)?,
        Commands::Init(args) => init::execute(args, &output, cli.dry_run)?,
    };

    Ok(ExitCode::from(status))
}

/// Build the orchestrator from resolved settings
fn build_orchestrator(loaded: &LoadedConfig) -> Result<(Orchestrator, ProfileOrigin)> {
    let (profile, origin) = loaded.config.resolve_profile()?;
    tracing::debug!("Using organization profile {:?}", origin);

    let orchestrator = MetadataOrchestrator::new(GeoTiffInspector::new(), Iso19139Serializer::new(), profile)?
        .with_naming(loaded.config.naming())
        .with_thumbnail_options(loaded.config.thumbnail_options());

    Ok((orchestrator, origin))
}

fn describe_origin(origin: &ProfileOrigin) -> String {
    match origin {
        ProfileOrigin::BuiltIn => "built-in".to_string(),
        ProfileOrigin::ConfigFile(path) => format!("embedded in {}", path.display()),
        ProfileOrigin::ProfileFile(path) => path.display().to_string(),
    }
}

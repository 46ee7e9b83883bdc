use clap::{Args, Parser, Subcommand};
use geometa_core::config::{parse_thumbnail_size, CliConfigOverrides};
use geometa_core::models::ThumbnailFormat;
use std::path::PathBuf;

/// geometa - ISO 19139 metadata for terrain models and orthoimages
#[derive(Parser, Debug)]
#[command(name = "geometa")]
#[command(about = "Generate ISO 19139 metadata, thumbnails and PDF reports for rasters", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Show planned writes without performing them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Configuration file (defaults to ./geometa.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate metadata, thumbnail and PDF for one dataset
    Generate(GenerateArgs),

    /// Generate metadata for every GeoTIFF in a directory
    Batch(BatchArgs),

    /// Show the properties read from a raster
    Inspect(InspectArgs),

    /// Show the effective settings and where they come from
    Config,

    /// Write a starter geometa.toml with the built-in profile
    Init(InitArgs),
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Path to the raster dataset
    pub path: PathBuf,

    /// Dataset type (terrain or orthoimage)
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub dataset_type: String,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Parser, Debug)]
pub struct BatchArgs {
    /// Directory holding the rasters
    pub dir: PathBuf,

    /// Dataset type applied to every raster (terrain or orthoimage)
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub dataset_type: String,

    /// Descend into subdirectories
    #[arg(long, short = 'r')]
    pub recursive: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Settings that override the config file and environment
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// Directory for the generated files (defaults to beside the input)
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Longest thumbnail edge in pixels
    #[arg(long, value_name = "PIXELS", value_parser = thumbnail_size)]
    pub thumbnail_size: Option<u32>,

    /// Thumbnail encoding (png or jpeg)
    #[arg(long, value_name = "FORMAT")]
    pub thumbnail_format: Option<ThumbnailFormat>,

    /// Organization profile TOML
    #[arg(long, value_name = "FILE")]
    pub profile: Option<PathBuf>,
}

impl SettingsArgs {
    pub fn into_overrides(self) -> CliConfigOverrides {
        CliConfigOverrides {
            output_dir: self.output_dir,
            thumbnail_size: self.thumbnail_size,
            thumbnail_format: self.thumbnail_format,
            profile: self.profile,
        }
    }
}

fn thumbnail_size(s: &str) -> Result<u32, String> {
    parse_thumbnail_size(s).map_err(|e| e.to_string())
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Path to the raster dataset
    pub path: PathBuf,

    /// Also decode a preview and report the value range
    #[arg(long)]
    pub stats: bool,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Directory to write geometa.toml into
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite an existing geometa.toml
    #[arg(long)]
    pub force: bool,
}

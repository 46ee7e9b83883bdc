use geometa_core::config::ConfigSource;
use geometa_core::geo::GeographicBoundingBox;
use geometa_core::models::{
    ArtifactOutcome, DatasetType, GenerationReport, RasterProperties, ValueRange,
};
use serde::Serialize;
use std::path::PathBuf;

/// Output for generate command
#[derive(Debug, Serialize)]
pub struct GenerateOutput {
    pub dataset: PathBuf,
    pub dataset_type: DatasetType,
    pub base_name: String,
    pub complete: bool,
    pub artifacts: Vec<ArtifactOutcome>,
}

impl From<GenerationReport> for GenerateOutput {
    fn from(report: GenerationReport) -> Self {
        Self {
            complete: report.is_complete(),
            dataset: report.dataset,
            dataset_type: report.dataset_type,
            base_name: report.base_name,
            artifacts: report.outcomes,
        }
    }
}

/// Output for batch command
#[derive(Debug, Serialize)]
pub struct BatchOutput {
    pub directory: PathBuf,
    pub dataset_type: DatasetType,
    pub total: usize,
    pub complete: usize,
    pub partial: usize,
    pub failed: usize,
    pub datasets: Vec<BatchItem>,
}

#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<ArtifactOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Output for inspect command
#[derive(Debug, Serialize)]
pub struct InspectOutput {
    pub path: PathBuf,
    pub properties: RasterProperties,
    pub geographic_bounds: Option<GeographicBoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_range: Option<ValueRange>,
}

/// Output for config command
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub config_file: Option<PathBuf>,
    pub output_dir: ConfigEntry,
    pub thumbnail_size: ConfigEntry,
    pub thumbnail_format: ConfigEntry,
    pub profile: ConfigEntry,
    pub organization: String,
}

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub value: String,
    pub source: ConfigSource,
}

/// Output for init command
#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub config_path: PathBuf,
    pub organization: String,
}

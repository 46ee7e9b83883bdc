//! Metadata orchestrator
//!
//! One linear pipeline per invocation: validate input, read the dataset,
//! assemble the record, then export XML, thumbnail and PDF in that order.
//! Export failures are isolated per artifact and collected in the report.

use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{MetadataError, Result};
use crate::models::{
    ArtifactKind, ArtifactOutcome, ArtifactPaths, ArtifactStatus, BrowseGraphic, DatasetReference,
    DatasetType, GenerationReport, RecordInput, ThumbnailOptions,
};
use crate::naming::OutputNaming;
use crate::ports::{MetadataSerializer, RasterInspector};
use crate::profile::OrganizationProfile;

/// Validated input of one run, resolved without touching the dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPlan {
    pub dataset_type: DatasetType,
    pub base_name: String,
    pub paths: ArtifactPaths,
}

pub struct MetadataOrchestrator<I, S> {
    inspector: I,
    serializer: S,
    profile: OrganizationProfile,
    naming: OutputNaming,
    thumbnail: ThumbnailOptions,
}

impl<I, S> MetadataOrchestrator<I, S>
where
    I: RasterInspector,
    S: MetadataSerializer,
{
    /// Create an orchestrator; the profile is validated once here
    pub fn new(inspector: I, serializer: S, profile: OrganizationProfile) -> Result<Self> {
        profile.validate()?;
        Ok(Self {
            inspector,
            serializer,
            profile,
            naming: OutputNaming::beside_input(),
            thumbnail: ThumbnailOptions::default(),
        })
    }

    pub fn with_naming(mut self, naming: OutputNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_thumbnail_options(mut self, options: ThumbnailOptions) -> Self {
        self.thumbnail = options;
        self
    }

    pub fn naming(&self) -> &OutputNaming {
        &self.naming
    }

    pub fn profile(&self) -> &OrganizationProfile {
        &self.profile
    }

    pub fn inspector(&self) -> &I {
        &self.inspector
    }

    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    /// Validate the input and resolve output paths
    pub fn plan(&self, dataset_path: &Path, dataset_type: &str) -> Result<GenerationPlan> {
        if dataset_path.as_os_str().is_empty() {
            return Err(MetadataError::invalid_input("dataset path is empty"));
        }
        let dataset_type: DatasetType = dataset_type.parse()?;
        let base_name = OutputNaming::base_name(dataset_path)?;
        let paths = self.naming.paths_for(dataset_path, self.thumbnail.format)?;

        Ok(GenerationPlan { dataset_type, base_name, paths })
    }

    /// Generate the three artifacts for a dataset
    pub fn generate(&self, dataset_path: &Path, dataset_type: &str) -> Result<GenerationReport> {
        self.generate_at(dataset_path, dataset_type, Utc::now())
    }

    /// Generate with a fixed generation timestamp
    pub fn generate_at(
        &self,
        dataset_path: &Path,
        dataset_type: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<GenerationReport> {
        let span = tracing::info_span!("generate", dataset = %dataset_path.display());
        let _guard = span.enter();

        let plan = self.plan(dataset_path, dataset_type)?;

        let as_read_error = |e: MetadataError| match e {
            MetadataError::DatasetRead { .. } => e,
            other => MetadataError::dataset_read(dataset_path, other),
        };
        let mut raster = self.inspector.open(dataset_path).map_err(as_read_error)?;
        let properties = self.inspector.read_properties(&mut raster).map_err(as_read_error)?;

        let preview_edge = self.thumbnail.max_edge.saturating_mul(2).max(1);
        let preview = self.inspector.read_preview(&mut raster, preview_edge);
        if let Err(e) = &preview {
            tracing::warn!("Preview unavailable, thumbnail will fail: {}", e);
        }

        let dataset = DatasetReference {
            path: dataset_path.to_path_buf(),
            base_name: plan.base_name.clone(),
            dataset_type: plan.dataset_type,
            properties,
        };
        warn_on_type_mismatch(&dataset);

        let browse_graphic = preview.is_ok().then(|| BrowseGraphic {
            file_name: file_name(&plan.paths.thumbnail),
            description: format!("Thumbnail of {}", dataset.base_name),
            file_type: self.thumbnail.format.mime_type().to_string(),
        });

        let record = self.serializer.populate(RecordInput {
            dataset: &dataset,
            profile: &self.profile,
            value_range: preview.as_ref().ok().and_then(|p| p.value_range()),
            browse_graphic: browse_graphic.as_ref(),
            generated_at,
        })?;

        fs::create_dir_all(plan.paths.directory())?;

        let mut outcomes = Vec::with_capacity(ArtifactKind::ALL.len());
        for kind in ArtifactKind::ALL {
            let path = plan.paths.path(kind);
            let rendered = match kind {
                ArtifactKind::Xml => self.serializer.to_xml(&record),
                ArtifactKind::Thumbnail => match &preview {
                    Ok(preview) => self.serializer.to_thumbnail(&record, preview, &self.thumbnail),
                    Err(e) => Err(MetadataError::export(kind, format!("preview unavailable: {}", e))),
                },
                ArtifactKind::Pdf => self.serializer.to_pdf(&record),
            };

            let status = match rendered.and_then(|bytes| write_artifact(kind, path, &bytes)) {
                Ok(bytes) => {
                    tracing::info!("Wrote {} ({} bytes) to {}", kind, bytes, path.display());
                    ArtifactStatus::Written { bytes }
                }
                Err(e) => {
                    let message = failure_message(e);
                    tracing::warn!("Failed to export {}: {}", kind, message);
                    remove_stale(path);
                    ArtifactStatus::Failed { message }
                }
            };

            outcomes.push(ArtifactOutcome { kind, path: path.to_path_buf(), status });
        }

        let report = GenerationReport {
            dataset: dataset.path,
            dataset_type: dataset.dataset_type,
            base_name: dataset.base_name,
            outcomes,
        };

        if report.written().is_empty() {
            return Err(MetadataError::GenerationFailed { failures: report.failures() });
        }

        Ok(report)
    }
}

/// Write through a temporary file so a reported path is always complete
fn write_artifact(kind: ArtifactKind, path: &Path, bytes: &[u8]) -> Result<u64> {
    if bytes.is_empty() {
        return Err(MetadataError::export(kind, "exporter produced no data"));
    }

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| MetadataError::Io(e.error))?;

    Ok(bytes.len() as u64)
}

/// Drop an artifact left by an earlier run so it cannot pass for current output
fn remove_stale(path: &Path) {
    if path.is_file() {
        match fs::remove_file(path) {
            Ok(()) => tracing::info!("Removed stale {}", path.display()),
            Err(e) => tracing::warn!("Could not remove stale {}: {}", path.display(), e),
        }
    }
}

fn failure_message(err: MetadataError) -> String {
    match err {
        MetadataError::Export { reason, .. } => reason,
        other => other.to_string(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

fn warn_on_type_mismatch(dataset: &DatasetReference) {
    let props = &dataset.properties;
    match dataset.dataset_type {
        DatasetType::Terrain if props.band_count > 1 => tracing::warn!(
            "{} has {} bands but is tagged as a terrain model",
            dataset.base_name,
            props.band_count
        ),
        DatasetType::Orthoimage if props.band_count == 1 && props.sample_format.starts_with("float") => {
            tracing::warn!(
                "{} is a single floating-point band but is tagged as an orthoimage",
                dataset.base_name
            )
        }
        _ => {}
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::dataset::DatasetType;
use crate::error::{ArtifactFailure, MetadataError};

/// The three artifacts produced per dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Xml,
    Thumbnail,
    Pdf,
}

impl ArtifactKind {
    /// Export order
    pub const ALL: [ArtifactKind; 3] = [ArtifactKind::Xml, ArtifactKind::Thumbnail, ArtifactKind::Pdf];
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Xml => f.write_str("xml"),
            ArtifactKind::Thumbnail => f.write_str("thumbnail"),
            ArtifactKind::Pdf => f.write_str("pdf"),
        }
    }
}

/// Encoding of the thumbnail image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailFormat {
    #[default]
    Png,
    Jpeg,
}

impl ThumbnailFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ThumbnailFormat::Png => "png",
            ThumbnailFormat::Jpeg => "jpg",
        }
    }

    /// MIME type, as recorded in the browse graphic
    pub fn mime_type(&self) -> &'static str {
        match self {
            ThumbnailFormat::Png => "image/png",
            ThumbnailFormat::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for ThumbnailFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThumbnailFormat::Png => f.write_str("png"),
            ThumbnailFormat::Jpeg => f.write_str("jpeg"),
        }
    }
}

impl FromStr for ThumbnailFormat {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "png" => Ok(ThumbnailFormat::Png),
            "jpeg" | "jpg" => Ok(ThumbnailFormat::Jpeg),
            _ => Err(MetadataError::ConfigInvalid {
                key: "thumbnail_format".to_string(),
                reason: format!("Invalid thumbnail format: {}. Use png or jpeg", s),
            }),
        }
    }
}

/// Thumbnail rendering options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailOptions {
    /// Longest edge of the rendered thumbnail, in pixels
    pub max_edge: u32,
    pub format: ThumbnailFormat,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self { max_edge: 200, format: ThumbnailFormat::Png }
    }
}

/// Output paths sharing one base name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    pub xml: PathBuf,
    pub thumbnail: PathBuf,
    pub pdf: PathBuf,
}

impl ArtifactPaths {
    pub fn path(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Xml => &self.xml,
            ArtifactKind::Thumbnail => &self.thumbnail,
            ArtifactKind::Pdf => &self.pdf,
        }
    }

    /// Directory all three artifacts are written to
    pub fn directory(&self) -> &Path {
        self.xml.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Result of exporting one artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactStatus {
    Written { bytes: u64 },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactOutcome {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: ArtifactStatus,
}

impl ArtifactOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self.status, ArtifactStatus::Written { .. })
    }
}

/// Aggregate result of one generation run
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub dataset: PathBuf,
    pub dataset_type: DatasetType,
    pub base_name: String,
    pub outcomes: Vec<ArtifactOutcome>,
}

impl GenerationReport {
    pub fn outcome(&self, kind: ArtifactKind) -> Option<&ArtifactOutcome> {
        self.outcomes.iter().find(|o| o.kind == kind)
    }

    /// Path of an artifact, only if it was written
    pub fn written_path(&self, kind: ArtifactKind) -> Option<&Path> {
        self.outcome(kind).filter(|o| o.is_written()).map(|o| o.path.as_path())
    }

    /// Paths of every artifact that was written
    pub fn written(&self) -> Vec<&Path> {
        self.outcomes.iter().filter(|o| o.is_written()).map(|o| o.path.as_path()).collect()
    }

    pub fn failures(&self) -> Vec<ArtifactFailure> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                ArtifactStatus::Failed { message } => {
                    Some(ArtifactFailure { kind: o.kind, message: message.clone() })
                }
                ArtifactStatus::Written { .. } => None,
            })
            .collect()
    }

    /// True when all three artifacts were written
    pub fn is_complete(&self) -> bool {
        self.outcomes.len() == ArtifactKind::ALL.len() && self.outcomes.iter().all(|o| o.is_written())
    }
}

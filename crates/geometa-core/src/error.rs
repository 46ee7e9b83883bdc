//! Error types for geometa

use crate::models::ArtifactKind;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    // Input errors, raised before any I/O
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    // Raster collaborator errors
    #[error("Cannot read dataset {path}: {reason}")]
    DatasetRead { path: PathBuf, reason: String },

    // Export errors
    #[error("{kind} export failed: {reason}")]
    Export { kind: ArtifactKind, reason: String },

    #[error("No artifact could be produced: {}", FailureList(.failures))]
    GenerationFailed { failures: Vec<ArtifactFailure> },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetadataError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        MetadataError::InvalidInput { reason: reason.into() }
    }

    pub fn dataset_read(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        MetadataError::DatasetRead { path: path.into(), reason: reason.to_string() }
    }

    pub fn export(kind: ArtifactKind, reason: impl fmt::Display) -> Self {
        MetadataError::Export { kind, reason: reason.to_string() }
    }
}

/// A single artifact that could not be produced
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ArtifactFailure {
    pub kind: ArtifactKind,
    pub message: String,
}

struct FailureList<'a>(&'a [ArtifactFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{} ({})", failure.kind, failure.message)?;
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;

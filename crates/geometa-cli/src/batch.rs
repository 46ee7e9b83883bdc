use crate::commands::{FAILURE, PARTIAL_FAILURE, SUCCESS};
use crate::output::OutputWriter;
use crate::output_types::BatchItem;
use anyhow::{Context, Result};
use geometa_core::models::GenerationReport;
use geometa_core::naming::is_raster_file;
use geometa_core::GenerationPlan;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of processing a single dataset in a batch
#[derive(Debug)]
pub enum DatasetResult {
    Generated(GenerationReport),
    Failed { path: PathBuf, error: String },
}

impl DatasetResult {
    pub fn path(&self) -> &Path {
        match self {
            DatasetResult::Generated(report) => &report.dataset,
            DatasetResult::Failed { path, .. } => path,
        }
    }
}

/// Summary of batch processing results
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub results: Vec<DatasetResult>,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, result: DatasetResult) {
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Datasets with all three artifacts written
    pub fn complete_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r, DatasetResult::Generated(report) if report.is_complete()))
            .count()
    }

    /// Datasets with at least one failed artifact
    pub fn partial_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r, DatasetResult::Generated(report) if !report.is_complete()))
            .count()
    }

    /// Datasets that produced nothing
    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| matches!(r, DatasetResult::Failed { .. })).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.complete_count() == self.total()
    }

    /// Process status; non-zero whenever any artifact of any dataset failed
    pub fn status(&self) -> u8 {
        if self.failure_count() > 0 {
            FAILURE
        } else if self.partial_count() > 0 {
            PARTIAL_FAILURE
        } else {
            SUCCESS
        }
    }

    pub fn items(&self) -> Vec<BatchItem> {
        self.results
            .iter()
            .map(|result| match result {
                DatasetResult::Generated(report) => BatchItem {
                    path: report.dataset.clone(),
                    artifacts: report.outcomes.clone(),
                    error: None,
                },
                DatasetResult::Failed { path, error } => BatchItem {
                    path: path.clone(),
                    artifacts: Vec::new(),
                    error: Some(error.clone()),
                },
            })
            .collect()
    }

    /// Display summary to output
    pub fn display(&self, output: &OutputWriter) {
        output.section("Batch Summary");
        output.kv("Datasets", self.total());
        output.kv("Complete", self.complete_count());
        output.kv("Partial", self.partial_count());
        output.kv("Failed", self.failure_count());

        for result in &self.results {
            match result {
                DatasetResult::Generated(report) if report.is_complete() => {}
                DatasetResult::Generated(report) => {
                    for failure in report.failures() {
                        output.error(format!(
                            "{}: {} failed: {}",
                            report.dataset.display(),
                            failure.kind,
                            failure.message
                        ));
                    }
                }
                DatasetResult::Failed { error, .. } => {
                    output.error(format!("{}: {}", result.path().display(), error));
                }
            }
        }
    }
}

/// Scan a directory for rasters, sorted by path
pub fn scan_directory(dir_path: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut discovered = Vec::new();
    scan_into(dir_path, recursive, &mut discovered)?;
    discovered.sort();
    Ok(discovered)
}

fn scan_into(dir_path: &Path, recursive: bool, discovered: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read directory: {}", dir_path.display()))?;

    for entry in entries {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        if path.is_dir() {
            if recursive {
                scan_into(&path, recursive, discovered)?;
            }
            continue;
        }

        if is_raster(&path) {
            discovered.push(path);
        }
    }

    Ok(())
}

fn is_raster(path: &Path) -> bool {
    path.is_file() && is_raster_file(path)
}

/// Datasets whose planned artifacts overlap an earlier dataset's
///
/// Maps each later dataset to the first dataset claiming the same path.
pub fn find_collisions(plans: &[(PathBuf, GenerationPlan)]) -> HashMap<PathBuf, PathBuf> {
    let mut claimed: HashMap<&Path, &Path> = HashMap::new();
    let mut collisions = HashMap::new();

    for (dataset, plan) in plans {
        let paths = [&plan.paths.xml, &plan.paths.thumbnail, &plan.paths.pdf];
        if let Some(first) = paths.iter().find_map(|p| claimed.get(p.as_path())) {
            collisions.insert(dataset.clone(), first.to_path_buf());
            continue;
        }
        for path in paths {
            claimed.insert(path.as_path(), dataset.as_path());
        }
    }

    collisions
}

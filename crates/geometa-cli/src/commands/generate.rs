//! Generate command implementation

use super::{build_orchestrator, describe_origin, PARTIAL_FAILURE, SUCCESS};
use crate::cli::GenerateArgs;
use crate::config_loader::load_config;
use crate::dry_run::{display_planned_actions, generation_actions};
use crate::output::OutputWriter;
use crate::output_types::GenerateOutput;
use crate::progress::{create_spinner, finish_error, finish_success};
use anyhow::Result;
use geometa_core::models::{ArtifactStatus, GenerationReport};
use std::path::Path;
use tabled::Tabled;

pub fn execute(
    args: GenerateArgs,
    output: &OutputWriter,
    config_path: Option<&Path>,
    dry_run: bool,
) -> Result<u8> {
    let loaded = load_config(config_path, args.settings.into_overrides())?;
    let (orchestrator, origin) = build_orchestrator(&loaded)?;

    if dry_run {
        let plan = orchestrator.plan(&args.path, &args.dataset_type)?;
        let mut actions = generation_actions(&args.path, &plan);
        for action in &mut actions {
            action.details.push(format!("Profile: {}", describe_origin(&origin)));
        }
        display_planned_actions(output, &actions)?;
        return Ok(SUCCESS);
    }

    let spinner = create_spinner(
        &format!("Generating metadata for {}", args.path.display()),
        !output.is_json(),
    );
    let report = match orchestrator.generate(&args.path, &args.dataset_type) {
        Ok(report) => report,
        Err(e) => {
            finish_error(&spinner, "Generation failed");
            return Err(e.into());
        }
    };

    if report.is_complete() {
        finish_success(&spinner, "Generated 3 artifacts");
    } else {
        finish_error(&spinner, &format!("{} of 3 artifacts failed", report.failures().len()));
    }

    let status = if report.is_complete() { SUCCESS } else { PARTIAL_FAILURE };
    display_report(output, report)?;
    Ok(status)
}

#[derive(Tabled)]
struct ArtifactRow {
    #[tabled(rename = "Artifact")]
    kind: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Result")]
    result: String,
}

/// Print the per-artifact outcome, failures explicitly
fn display_report(output: &OutputWriter, report: GenerationReport) -> Result<()> {
    if output.is_json() {
        let status = if report.is_complete() { "success" } else { "partial" };
        return output.result_with_status(status, GenerateOutput::from(report));
    }

    let rows: Vec<ArtifactRow> = report
        .outcomes
        .iter()
        .map(|o| ArtifactRow {
            kind: o.kind.to_string(),
            path: o.path.display().to_string(),
            result: match &o.status {
                ArtifactStatus::Written { bytes } => format!("written ({} bytes)", bytes),
                ArtifactStatus::Failed { .. } => "FAILED".to_string(),
            },
        })
        .collect();

    output.section(format!("{} ({})", report.base_name, report.dataset_type));
    output.table(rows);

    for failure in report.failures() {
        output.error(format!("{} export failed: {}", failure.kind, failure.message));
    }
    if report.is_complete() {
        output.success(format!("Metadata written for {}", report.dataset.display()));
    }

    Ok(())
}

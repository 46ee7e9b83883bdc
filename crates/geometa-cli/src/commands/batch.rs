//! Batch command implementation

use super::{build_orchestrator, SUCCESS};
use crate::batch::{find_collisions, scan_directory, BatchSummary, DatasetResult};
use crate::cli::BatchArgs;
use crate::config_loader::load_config;
use crate::dry_run::{display_planned_actions, generation_actions};
use crate::errors;
use crate::output::OutputWriter;
use crate::output_types::BatchOutput;
use crate::progress::{create_progress_bar, finish_error, finish_success};
use anyhow::Result;
use geometa_core::models::DatasetType;
use std::collections::HashMap;
use std::path::Path;

pub fn execute(
    args: BatchArgs,
    output: &OutputWriter,
    config_path: Option<&Path>,
    dry_run: bool,
) -> Result<u8> {
    // Reject a bad type once instead of once per file
    let dataset_type: DatasetType = args.dataset_type.parse()?;

    let loaded = load_config(config_path, args.settings.into_overrides())?;
    let (orchestrator, _) = build_orchestrator(&loaded)?;
    // Subdirectories stay apart when everything goes to one output directory
    let naming = orchestrator.naming().clone().mirroring(&args.dir);
    let orchestrator = orchestrator.with_naming(naming);

    let files = scan_directory(&args.dir, args.recursive)?;
    if files.is_empty() {
        return Err(errors::no_rasters(&args.dir).into());
    }
    tracing::info!("Found {} rasters in {}", files.len(), args.dir.display());

    let mut plans = Vec::with_capacity(files.len());
    let mut unplanned = HashMap::new();
    for file in &files {
        match orchestrator.plan(file, dataset_type.tag()) {
            Ok(plan) => plans.push((file.clone(), plan)),
            Err(e) => {
                unplanned.insert(file.clone(), e.to_string());
            }
        }
    }
    let collisions = find_collisions(&plans);

    if dry_run {
        let mut actions = Vec::new();
        for (file, plan) in &plans {
            let mut planned = generation_actions(file, plan);
            if let Some(first) = collisions.get(file) {
                for action in &mut planned {
                    action.details.push(format!("Skipped: output collides with {}", first.display()));
                }
            }
            actions.extend(planned);
        }
        display_planned_actions(output, &actions)?;
        return Ok(SUCCESS);
    }

    let pb = create_progress_bar(files.len() as u64, "Generating metadata", !output.is_json());
    let mut summary = BatchSummary::new();

    for file in &files {
        pb.set_message(file.display().to_string());
        if let Some(error) = unplanned.get(file) {
            summary.add(DatasetResult::Failed { path: file.clone(), error: error.clone() });
            pb.inc(1);
            continue;
        }
        if let Some(first) = collisions.get(file) {
            tracing::warn!("{}: output paths collide with {}", file.display(), first.display());
            summary.add(DatasetResult::Failed {
                path: file.clone(),
                error: format!("output paths collide with {}; nothing written", first.display()),
            });
            pb.inc(1);
            continue;
        }

        let result = match orchestrator.generate(file, dataset_type.tag()) {
            Ok(report) => DatasetResult::Generated(report),
            Err(e) => {
                tracing::warn!("{}: {}", file.display(), e);
                DatasetResult::Failed { path: file.clone(), error: e.to_string() }
            }
        };
        summary.add(result);
        pb.inc(1);
    }

    if summary.all_succeeded() {
        finish_success(&pb, &format!("Processed {} datasets", summary.total()));
    } else {
        finish_error(
            &pb,
            &format!("{} of {} datasets had failures", summary.total() - summary.complete_count(), summary.total()),
        );
    }

    if output.is_json() {
        let status = if summary.all_succeeded() { "success" } else { "partial" };
        output.result_with_status(
            status,
            BatchOutput {
                directory: args.dir.clone(),
                dataset_type,
                total: summary.total(),
                complete: summary.complete_count(),
                partial: summary.partial_count(),
                failed: summary.failure_count(),
                datasets: summary.items(),
            },
        )?;
    } else {
        summary.display(output);
        if summary.all_succeeded() {
            output.success(format!("Metadata written for {} datasets", summary.total()));
        }
    }

    Ok(summary.status())
}

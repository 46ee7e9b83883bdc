//! Init command implementation

use super::SUCCESS;
use crate::cli::InitArgs;
use crate::dry_run::{display_planned_actions, ActionType, PlannedAction};
use crate::errors;
use crate::output::OutputWriter;
use crate::output_types::InitOutput;
use anyhow::{Context, Result};
use geometa_core::config::CONFIG_FILE_NAME;
use geometa_core::models::ThumbnailOptions;
use geometa_core::OrganizationProfile;
use std::fs;

pub fn execute(args: InitArgs, output: &OutputWriter, dry_run: bool) -> Result<u8> {
    let config_path = args.path.join(CONFIG_FILE_NAME);
    if config_path.exists() && !args.force {
        return Err(errors::config_exists(&config_path).into());
    }

    let profile = OrganizationProfile::default();
    let content = starter_config(&profile)?;

    if dry_run {
        let mut actions = Vec::new();
        if !args.path.exists() {
            actions.push(PlannedAction::new(
                ActionType::CreateDirectory,
                format!("Create directory {}", args.path.display()),
            ));
        }
        let action_type = if config_path.exists() { ActionType::WriteFile } else { ActionType::CreateFile };
        actions.push(
            PlannedAction::new(action_type, format!("Write {}", config_path.display()))
                .with_detail(format!("Organization: {}", profile.organization.name))
                .with_detail("Presets: terrain, orthoimage"),
        );
        display_planned_actions(output, &actions)?;
        return Ok(SUCCESS);
    }

    fs::create_dir_all(&args.path)
        .with_context(|| format!("Failed to create directory {}", args.path.display()))?;
    fs::write(&config_path, content)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    if output.is_json() {
        output.result(InitOutput {
            config_path,
            organization: profile.organization.name,
        })?;
    } else {
        output.success(format!("Wrote {}", config_path.display()));
        output.info("Edit the [organization] and [presets.*] tables to match your organization");
    }

    Ok(SUCCESS)
}

/// Settings block followed by the profile tables
fn starter_config(profile: &OrganizationProfile) -> Result<String> {
    let defaults = ThumbnailOptions::default();
    let tables = profile.to_toml()?;

    Ok(format!(
        r#"# geometa configuration
#
# Precedence: command line > GEOMETA_* environment variables > this file > defaults

# Directory for generated files; beside each input when unset
# output_dir = "metadata"

# Longest thumbnail edge in pixels
thumbnail_size = {}

# Thumbnail encoding: "png" or "jpeg"
thumbnail_format = "{}"

# A separate organization profile takes precedence over the tables below
# profile = "profile.toml"

{}"#,
        defaults.max_edge, defaults.format, tables
    ))
}

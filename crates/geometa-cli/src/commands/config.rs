//! Config command implementation

use super::{describe_origin, SUCCESS};
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use crate::output_types::{ConfigEntry, ConfigOutput};
use anyhow::{Context, Result};
use geometa_core::config::{CliConfigOverrides, ConfigSource};
use std::collections::HashMap;
use std::path::Path;
use tabled::Tabled;

#[derive(Tabled)]
struct ConfigRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

pub fn execute(output: &OutputWriter, config_path: Option<&Path>) -> Result<u8> {
    let loaded = load_config(config_path, CliConfigOverrides::default())?;
    let (profile, origin) = loaded
        .config
        .resolve_profile()
        .context("Failed to resolve the organization profile")?;
    let mut inspection_map = loaded.config.to_inspection_map();

    if output.is_json() {
        let mut entry = |key: &str| -> Result<ConfigEntry> {
            let (value, source) = inspection_map
                .remove(key)
                .with_context(|| format!("Missing configuration key: {}", key))?;
            Ok(ConfigEntry { value, source })
        };
        let result = ConfigOutput {
            config_file: loaded.path.clone(),
            output_dir: entry("output_dir")?,
            thumbnail_size: entry("thumbnail_size")?,
            thumbnail_format: entry("thumbnail_format")?,
            profile: entry("profile")?,
            organization: profile.organization.name.clone(),
        };
        output.result(result)?;
        return Ok(SUCCESS);
    }

    output.section("Configuration Values");
    output.table(rows(inspection_map));

    output.section("Organization Profile");
    output.kv("Source", describe_origin(&origin));
    output.kv("Organization", &profile.organization.name);
    output.kv("Language", &profile.organization.language);
    output.kv("Terrain keywords", profile.presets.terrain.all_keywords().join(", "));
    output.kv("Orthoimage keywords", profile.presets.orthoimage.all_keywords().join(", "));

    output.section("Configuration Precedence");
    match &loaded.path {
        Some(path) => output.info(format!("Config file: {}", path.display())),
        None => output.info("No config file found; run 'geometa init' to create one"),
    }
    output.info("CLI arguments > Environment variables > Config file > Defaults");

    Ok(SUCCESS)
}

fn rows(map: HashMap<String, (String, ConfigSource)>) -> Vec<ConfigRow> {
    let mut rows: Vec<ConfigRow> = map
        .into_iter()
        .map(|(key, (value, source))| ConfigRow { key, value, source: format!("{:?}", source) })
        .collect();

    // Sort by key for consistent output
    rows.sort_by(|a, b| a.key.cmp(&b.key));
    rows
}

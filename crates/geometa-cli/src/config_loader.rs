//! Configuration loading utilities for CLI commands

use anyhow::{bail, Result};
use geometa_core::config::{CliConfigOverrides, LayeredConfig, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};

/// Settings resolved for one invocation
pub struct LoadedConfig {
    pub config: LayeredConfig,

    /// Config file that was read, if any
    pub path: Option<PathBuf>,
}

/// Config file for this invocation: `--config`, else `./geometa.toml` when present
pub fn locate_config(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) if path.is_file() => Ok(Some(path.to_path_buf())),
        Some(path) => bail!("Config file not found: {}", path.display()),
        None => {
            let default = std::env::current_dir()?.join(CONFIG_FILE_NAME);
            Ok(default.is_file().then_some(default))
        }
    }
}

/// Load layered configuration: defaults, then file, environment and CLI
pub fn load_config(explicit: Option<&Path>, overrides: CliConfigOverrides) -> Result<LoadedConfig> {
    let path = locate_config(explicit)?;

    let mut config = LayeredConfig::with_defaults();
    if let Some(path) = &path {
        tracing::debug!("Loading configuration from {}", path.display());
        config = config.load_from_file(path)?;
    }
    let mut config = config.load_from_env();
    config.update_from_cli(overrides);

    Ok(LoadedConfig { config, path })
}

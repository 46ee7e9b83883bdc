use crate::error::{MetadataError, Result};
use crate::models::{ThumbnailFormat, ThumbnailOptions};
use crate::naming::OutputNaming;
use crate::profile::{Organization, OrganizationProfile, Presets};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Conventional config file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "geometa.toml";

pub const MIN_THUMBNAIL_SIZE: u32 = 16;
pub const MAX_THUMBNAIL_SIZE: u32 = 2048;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Where the organization profile came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileOrigin {
    BuiltIn,
    ConfigFile(PathBuf),
    ProfileFile(PathBuf),
}

/// Layered configuration for geometa
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub output_dir: ConfigValue<Option<PathBuf>>,
    pub thumbnail_size: ConfigValue<u32>,
    pub thumbnail_format: ConfigValue<ThumbnailFormat>,
    pub profile: ConfigValue<Option<PathBuf>>,
    embedded: Option<EmbeddedProfile>,
}

#[derive(Debug, Clone)]
struct EmbeddedProfile {
    config_path: PathBuf,
    organization: Option<Organization>,
    presets: Option<Presets>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            output_dir: ConfigValue::new(None, ConfigSource::Default),
            thumbnail_size: ConfigValue::new(ThumbnailOptions::default().max_edge, ConfigSource::Default),
            thumbnail_format: ConfigValue::new(ThumbnailFormat::Png, ConfigSource::Default),
            profile: ConfigValue::new(None, ConfigSource::Default),
            embedded: None,
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| MetadataError::ConfigInvalid {
            key: "file".to_string(),
            reason: format!("Failed to read config file: {}", e),
        })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| MetadataError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        // Update values from file
        if let Some(output_dir) = file_config.output_dir {
            self.output_dir.update(Some(output_dir), ConfigSource::File);
        }

        if let Some(size) = file_config.thumbnail_size {
            self.thumbnail_size.update(check_thumbnail_size(size)?, ConfigSource::File);
        }

        if let Some(format) = file_config.thumbnail_format {
            self.thumbnail_format.update(format, ConfigSource::File);
        }

        if let Some(profile) = file_config.profile {
            // Relative profile paths are relative to the config file
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            self.profile.update(Some(base.join(profile)), ConfigSource::File);
        }

        if file_config.organization.is_some() || file_config.presets.is_some() {
            self.embedded = Some(EmbeddedProfile {
                config_path: path.to_path_buf(),
                organization: file_config.organization,
                presets: file_config.presets,
            });
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // GEOMETA_OUTPUT_DIR
        if let Ok(dir) = env::var("GEOMETA_OUTPUT_DIR") {
            if !dir.is_empty() {
                self.output_dir.update(Some(PathBuf::from(dir)), ConfigSource::Environment);
            }
        }

        // GEOMETA_THUMBNAIL_SIZE
        if let Ok(size_str) = env::var("GEOMETA_THUMBNAIL_SIZE") {
            match parse_thumbnail_size(&size_str) {
                Ok(size) => self.thumbnail_size.update(size, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOMETA_THUMBNAIL_SIZE value '{}': expected {}..={} pixels",
                    size_str,
                    MIN_THUMBNAIL_SIZE,
                    MAX_THUMBNAIL_SIZE
                ),
            }
        }

        // GEOMETA_THUMBNAIL_FORMAT
        if let Ok(format_str) = env::var("GEOMETA_THUMBNAIL_FORMAT") {
            match format_str.parse::<ThumbnailFormat>() {
                Ok(format) => self.thumbnail_format.update(format, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOMETA_THUMBNAIL_FORMAT value '{}': expected png or jpeg",
                    format_str
                ),
            }
        }

        // GEOMETA_PROFILE
        if let Ok(profile) = env::var("GEOMETA_PROFILE") {
            if !profile.is_empty() {
                self.profile.update(Some(PathBuf::from(profile)), ConfigSource::Environment);
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(dir) = overrides.output_dir {
            self.output_dir.update(Some(dir), ConfigSource::Cli);
        }

        if let Some(size) = overrides.thumbnail_size {
            self.thumbnail_size.update(size, ConfigSource::Cli);
        }

        if let Some(format) = overrides.thumbnail_format {
            self.thumbnail_format.update(format, ConfigSource::Cli);
        }

        if let Some(profile) = overrides.profile {
            self.profile.update(Some(profile), ConfigSource::Cli);
        }
    }

    pub fn naming(&self) -> OutputNaming {
        match &self.output_dir.value {
            Some(dir) => OutputNaming::in_directory(dir),
            None => OutputNaming::beside_input(),
        }
    }

    pub fn thumbnail_options(&self) -> ThumbnailOptions {
        ThumbnailOptions { max_edge: self.thumbnail_size.value, format: self.thumbnail_format.value }
    }

    /// Resolve the organization profile
    ///
    /// A profile file wins over tables embedded in the config file; missing
    /// embedded tables fall back to the built-in defaults.
    pub fn resolve_profile(&self) -> Result<(OrganizationProfile, ProfileOrigin)> {
        if let Some(path) = &self.profile.value {
            let profile = OrganizationProfile::load_from_file(path)?;
            return Ok((profile, ProfileOrigin::ProfileFile(path.clone())));
        }

        if let Some(embedded) = &self.embedded {
            let defaults = OrganizationProfile::default();
            let profile = OrganizationProfile {
                organization: embedded.organization.clone().unwrap_or(defaults.organization),
                presets: embedded.presets.clone().unwrap_or(defaults.presets),
            };
            profile.validate()?;
            return Ok((profile, ProfileOrigin::ConfigFile(embedded.config_path.clone())));
        }

        Ok((OrganizationProfile::default(), ProfileOrigin::BuiltIn))
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "output_dir".to_string(),
            (
                self.output_dir
                    .value
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(beside input)".to_string()),
                self.output_dir.source,
            ),
        );

        map.insert(
            "thumbnail_size".to_string(),
            (self.thumbnail_size.value.to_string(), self.thumbnail_size.source),
        );

        map.insert(
            "thumbnail_format".to_string(),
            (self.thumbnail_format.value.to_string(), self.thumbnail_format.source),
        );

        map.insert(
            "profile".to_string(),
            (
                self.profile
                    .value
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(built-in)".to_string()),
                self.profile.source,
            ),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    output_dir: Option<PathBuf>,
    thumbnail_size: Option<u32>,
    thumbnail_format: Option<ThumbnailFormat>,
    profile: Option<PathBuf>,
    organization: Option<Organization>,
    presets: Option<Presets>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub output_dir: Option<PathBuf>,
    pub thumbnail_size: Option<u32>,
    pub thumbnail_format: Option<ThumbnailFormat>,
    pub profile: Option<PathBuf>,
}

/// Parse a thumbnail size in pixels
pub fn parse_thumbnail_size(s: &str) -> Result<u32> {
    let size = s.trim().parse::<u32>().map_err(|_| MetadataError::ConfigInvalid {
        key: "thumbnail_size".to_string(),
        reason: format!("Invalid thumbnail size: {}. Use a number of pixels", s),
    })?;
    check_thumbnail_size(size)
}

fn check_thumbnail_size(size: u32) -> Result<u32> {
    if (MIN_THUMBNAIL_SIZE..=MAX_THUMBNAIL_SIZE).contains(&size) {
        Ok(size)
    } else {
        Err(MetadataError::ConfigInvalid {
            key: "thumbnail_size".to_string(),
            reason: format!(
                "{} is outside {}..={} pixels",
                size, MIN_THUMBNAIL_SIZE, MAX_THUMBNAIL_SIZE
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.output_dir.value, None);
        assert_eq!(config.thumbnail_size.value, 200);
        assert_eq!(config.thumbnail_size.source, ConfigSource::Default);
        assert_eq!(config.thumbnail_format.value, ThumbnailFormat::Png);
        assert_eq!(config.naming(), OutputNaming::beside_input());
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        // File should override default
        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        // Environment should override file
        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);
        assert_eq!(value.source, ConfigSource::Environment);

        // CLI should override environment
        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
output_dir = "/srv/metadata"
thumbnail_size = 320
thumbnail_format = "jpeg"
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.output_dir.value, Some(PathBuf::from("/srv/metadata")));
        assert_eq!(config.output_dir.source, ConfigSource::File);
        assert_eq!(config.thumbnail_size.value, 320);
        assert_eq!(config.thumbnail_format.value, ThumbnailFormat::Jpeg);
        assert_eq!(config.naming(), OutputNaming::in_directory("/srv/metadata"));
    }

    #[test]
    fn test_file_rejects_out_of_range_thumbnail() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "thumbnail_size = 4").unwrap();
        assert!(LayeredConfig::with_defaults().load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = LayeredConfig::with_defaults();

        let overrides = CliConfigOverrides {
            output_dir: Some(PathBuf::from("out")),
            thumbnail_size: Some(128),
            thumbnail_format: None,
            profile: None,
        };

        config.update_from_cli(overrides);

        assert_eq!(config.output_dir.value, Some(PathBuf::from("out")));
        assert_eq!(config.output_dir.source, ConfigSource::Cli);
        assert_eq!(config.thumbnail_size.value, 128);
        // These should still be defaults
        assert_eq!(config.thumbnail_format.source, ConfigSource::Default);
        assert_eq!(config.profile.source, ConfigSource::Default);
    }

    #[test]
    fn test_parse_thumbnail_size() {
        assert_eq!(parse_thumbnail_size("200").unwrap(), 200);
        assert_eq!(parse_thumbnail_size(" 64 ").unwrap(), 64);
        assert!(parse_thumbnail_size("8").is_err());
        assert!(parse_thumbnail_size("big").is_err());
    }

    #[test]
    fn test_builtin_profile_when_nothing_configured() {
        let (profile, origin) = LayeredConfig::with_defaults().resolve_profile().unwrap();
        assert_eq!(origin, ProfileOrigin::BuiltIn);
        assert_eq!(profile, OrganizationProfile::default());
    }

    #[test]
    fn test_embedded_organization_keeps_default_presets() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[organization]
name = "Servicio Regional de Cartografía"
language = "spa"
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();
        let (profile, origin) = config.resolve_profile().unwrap();

        assert_eq!(origin, ProfileOrigin::ConfigFile(file.path().to_path_buf()));
        assert_eq!(profile.organization.name, "Servicio Regional de Cartografía");
        assert_eq!(profile.presets, OrganizationProfile::default().presets);
    }

    #[test]
    fn test_inspection_map() {
        let config = LayeredConfig::with_defaults();
        let map = config.to_inspection_map();

        assert!(map.contains_key("output_dir"));
        assert!(map.contains_key("thumbnail_size"));
        assert!(map.contains_key("thumbnail_format"));
        assert!(map.contains_key("profile"));

        let (size, source) = &map["thumbnail_size"];
        assert_eq!(size, "200");
        assert_eq!(*source, ConfigSource::Default);
    }
}

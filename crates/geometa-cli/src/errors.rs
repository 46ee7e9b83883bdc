use console::style;
use geometa_core::{ArtifactFailure, MetadataError};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Error presenter with context and suggestions
#[derive(Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self, json: bool) {
        if json {
            let output = serde_json::json!({ "status": "error", "error": self });
            eprintln!("{:#}", output);
            return;
        }

        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Create error for an unknown or empty dataset type
pub fn invalid_input(reason: &str) -> CliError {
    CliError::new("Invalid input")
        .with_context(format!("Nothing was written.\n\nReason: {}", reason))
        .with_suggestion("Pass --type terrain for digital terrain models")
        .with_suggestion("Pass --type orthoimage for orthoimages")
        .with_help("Run: geometa generate --help")
}

/// Create error for a dataset that cannot be opened or read
pub fn dataset_unreadable(path: &Path, reason: &str) -> CliError {
    CliError::new("Cannot read dataset")
        .with_context(format!(
            "The raster could not be opened or read. Nothing was written.\n\nPath: {}\nReason: {}",
            path.display(),
            reason
        ))
        .with_suggestion("Check the path and file permissions")
        .with_suggestion("Untagged TIFFs need a .tfw (or .wld) world file beside them")
        .with_help("Run: geometa inspect <PATH>")
}

/// Create error for a run where no artifact could be written
pub fn generation_failed(failures: &[ArtifactFailure]) -> CliError {
    let list = failures
        .iter()
        .map(|f| format!("  {}: {}", f.kind, f.message))
        .collect::<Vec<_>>()
        .join("\n");

    CliError::new("No artifact could be produced")
        .with_context(format!("Every exporter failed:\n\n{}", list))
        .with_suggestion("Check that the output directory is writable")
        .with_suggestion("Run with RUST_LOG=debug for exporter details")
}

/// Create error for invalid configuration
pub fn invalid_config(key: &str, reason: &str) -> CliError {
    CliError::new(format!("Invalid configuration: {}", key))
        .with_context(format!("Configuration value is invalid.\n\nReason: {}", reason))
        .with_suggestion("Check geometa.toml and the GEOMETA_* environment variables")
        .with_suggestion("Or write a fresh starter file: geometa init --force")
        .with_help("Run: geometa config")
}

/// Create error for a missing required configuration value
pub fn missing_config(key: &str) -> CliError {
    CliError::new(format!("Missing configuration: {}", key))
        .with_context("The organization profile is incomplete.")
        .with_suggestion(format!("Set {} in the profile", key))
        .with_help("Run: geometa init --help")
}

/// Create error for an existing config file
pub fn config_exists(path: &Path) -> CliError {
    CliError::new("Configuration already exists")
        .with_context(format!("Found: {}", path.display()))
        .with_suggestion("Use --force to overwrite it")
        .with_help("Run: geometa init --help")
}

/// Create error for a batch directory without rasters
pub fn no_rasters(dir: &Path) -> CliError {
    CliError::new("No rasters found")
        .with_context(format!("No .tif or .tiff files in {}", dir.display()))
        .with_suggestion("Use --recursive to descend into subdirectories")
        .with_help("Run: geometa batch --help")
}

/// Convert anyhow::Error to CliError with context
pub fn from_anyhow(error: anyhow::Error) -> CliError {
    let error = match error.downcast::<CliError>() {
        Ok(err) => return err,
        Err(error) => error,
    };

    match error.downcast_ref::<MetadataError>() {
        Some(MetadataError::InvalidInput { reason }) => invalid_input(reason),
        Some(MetadataError::DatasetRead { path, reason }) => dataset_unreadable(path, reason),
        Some(MetadataError::GenerationFailed { failures }) => generation_failed(failures),
        Some(MetadataError::ConfigInvalid { key, reason }) => invalid_config(key, reason),
        Some(MetadataError::ConfigMissing { key }) => missing_config(key),
        _ => {
            let message = error.to_string();
            if message.contains("Permission denied") {
                CliError::new("Permission denied")
                    .with_context(format!("Error: {:#}", error))
                    .with_suggestion("Check file permissions")
            } else {
                CliError::new(format!("{:#}", error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geometa_core::models::ArtifactKind;
    use std::path::PathBuf;

    #[test]
    fn test_metadata_errors_get_suggestions() {
        let err = from_anyhow(anyhow::Error::new(MetadataError::invalid_input("unknown dataset type 'dem'")));
        assert_eq!(err.message, "Invalid input");
        assert!(err.context.unwrap().contains("dem"));
        assert_eq!(err.suggestions.len(), 2);

        let err = from_anyhow(anyhow::Error::new(MetadataError::dataset_read(
            PathBuf::from("/data/missing.tif"),
            "No such file or directory",
        )));
        assert_eq!(err.message, "Cannot read dataset");
        assert!(err.context.unwrap().contains("/data/missing.tif"));
    }

    #[test]
    fn test_generation_failure_lists_every_artifact() {
        let failures = vec![
            ArtifactFailure { kind: ArtifactKind::Xml, message: "disk full".to_string() },
            ArtifactFailure { kind: ArtifactKind::Pdf, message: "disk full".to_string() },
        ];
        let err = from_anyhow(anyhow::Error::new(MetadataError::GenerationFailed { failures }));
        let context = err.context.unwrap();

        assert!(context.contains("xml: disk full"));
        assert!(context.contains("pdf: disk full"));
    }

    #[test]
    fn test_cli_error_passes_through() {
        let err = from_anyhow(anyhow::Error::new(no_rasters(Path::new("/data/empty"))));
        assert_eq!(err.message, "No rasters found");
        assert_eq!(err.help_command.as_deref(), Some("Run: geometa batch --help"));
    }

    #[test]
    fn test_other_errors_keep_their_chain() {
        let err = from_anyhow(anyhow::anyhow!("inner").context("outer"));
        assert_eq!(err.message, "outer: inner");
    }
}

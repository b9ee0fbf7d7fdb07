//! Configuration types for the Ascent orchestrator.
//!
//! Configuration is loaded from `ascent.json` in the working directory (or
//! an explicit path), with every field defaulted so a missing file yields a
//! runnable setup. CLI overrides are applied on top and re-validated.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoachError, Result};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "ascent.json";

/// Default tenant for single-tenant deployments.
fn default_tenant() -> String {
    "default".to_string()
}

/// Default submission language when a request omits one.
fn default_language() -> String {
    "python".to_string()
}

/// Default per-submission execution timeout in seconds.
const fn default_execution_timeout() -> u32 {
    10
}

/// Default output directory for generated reports.
fn default_output_dir() -> String {
    ".".to_string()
}

/// Default for the LLM evidence toggle.
const fn default_false() -> bool {
    false
}

/// Main configuration for the Ascent orchestrator.
///
/// Controls tenant scoping, the external-collaborator toggles, and where
/// progress reports land.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Tenant all requests are scoped to.
    #[serde(default = "default_tenant")]
    pub tenant: String,

    /// Language assumed for submissions that do not state one.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Whether the optional LLM evidence provider is consulted.
    ///
    /// When disabled (or when the provider fails) grading degrades to
    /// heuristic-only evidence without error.
    #[serde(default = "default_false")]
    pub evidence_enabled: bool,

    /// Per-submission timeout handed to the code executor, in seconds.
    #[serde(default = "default_execution_timeout")]
    pub execution_timeout_seconds: u32,

    /// Output directory for generated progress reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Optional path to a JSON problem catalog that replaces the built-in
    /// one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tenant: default_tenant(),
            default_language: default_language(),
            evidence_enabled: false,
            execution_timeout_seconds: default_execution_timeout(),
            output_dir: default_output_dir(),
            catalog_file: None,
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `ascent.json` in the current directory. If found, loads and
    /// validates the configuration. If not found, returns default
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            CoachError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        Self::load_from_file(&config_path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `CoachError::ConfigParseError` if the file exists but contains
    /// invalid JSON, and `CoachError::ConfigValidationError` if the values
    /// are invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(CoachError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| CoachError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `CoachError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.tenant.trim().is_empty() {
            return Err(CoachError::config_validation(
                "tenant must not be empty",
                "Set tenant to a non-empty identifier in your ascent.json",
            ));
        }

        if self.default_language.trim().is_empty() {
            return Err(CoachError::config_validation(
                "defaultLanguage must not be empty",
                "Set defaultLanguage to e.g. \"python\" in your ascent.json",
            ));
        }

        if self.execution_timeout_seconds == 0 {
            return Err(CoachError::config_validation(
                "executionTimeoutSeconds must be greater than 0",
                "Set executionTimeoutSeconds to at least 1 in your ascent.json",
            ));
        }

        if self.output_dir.trim().is_empty() {
            return Err(CoachError::config_validation(
                "outputDir must not be empty",
                "Set outputDir to a writable directory in your ascent.json",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tenant, "default");
        assert_eq!(config.default_language, "python");
        assert!(!config.evidence_enabled);
        assert_eq!(config.execution_timeout_seconds, 10);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load_from_file(Path::new("/nonexistent/ascent.json")).unwrap();
        assert_eq!(config.tenant, "default");
    }

    #[test]
    fn test_parse_partial_config() {
        let json = r#"{"tenant": "acme", "evidenceEnabled": true}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.tenant, "acme");
        assert!(config.evidence_enabled);
        // Unspecified fields take defaults.
        assert_eq!(config.execution_timeout_seconds, 10);
        assert_eq!(config.output_dir, ".");
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        use std::io::Write;

        let temp_dir = std::env::temp_dir();
        let path = temp_dir.join("ascent_config_invalid.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"{not json").unwrap();

        let result = Config::load_from_file(&path);
        assert!(matches!(
            result,
            Err(CoachError::ConfigParseError { .. })
        ));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_zero_timeout_fails_validation() {
        let config = Config {
            execution_timeout_seconds: 0,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("executionTimeoutSeconds"));
    }

    #[test]
    fn test_empty_tenant_fails_validation() {
        let config = Config {
            tenant: "  ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config {
            tenant: "acme".to_string(),
            evidence_enabled: true,
            catalog_file: Some("problems.json".to_string()),
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("evidenceEnabled"));
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tenant, "acme");
        assert_eq!(back.catalog_file.as_deref(), Some("problems.json"));
    }
}

//! Configuration loading and merging for Argus.
//!
//! Argus resolves configuration from multiple sources with
//! project > home > defaults precedence. Configuration is loaded from
//! `.argus.yaml` files; CLI flags override loaded values at the call site.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::CoreError;

/// The configuration file name probed in the project and home directories.
pub const CONFIG_FILE_NAME: &str = ".argus.yaml";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Top-level Argus configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgusConfig {
    /// Evaluation-related settings.
    pub evaluation: EvaluationConfig,
    /// Reporting settings.
    pub reporting: ReportingConfig,
}

// ---------------------------------------------------------------------------
// EvaluationConfig
// ---------------------------------------------------------------------------

/// Evaluation-specific configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Directory containing declarative rule YAML files.
    pub rules_dir: PathBuf,
    /// Directory containing control catalog YAML files.
    pub catalogs_dir: PathBuf,
    /// Catalog id to aggregate against. Empty means "all loaded catalogs".
    pub catalog: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            rules_dir: PathBuf::from("rules/builtin"),
            catalogs_dir: PathBuf::from("rules/catalogs"),
            catalog: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// ReportingConfig
// ---------------------------------------------------------------------------

/// Reporting settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Default output format (`json`, `jsonl`, or `table`).
    pub default_format: String,
    /// Whether to include timestamps in output (disabled by default for
    /// deterministic reports).
    pub timestamp: bool,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            default_format: "json".to_owned(),
            timestamp: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load configuration with project > home > defaults precedence.
///
/// Starts from [`ArgusConfig::default`], then applies `~/.argus.yaml` if
/// present, then `<project_dir>/.argus.yaml` if present. A missing file is
/// not an error; a malformed one is.
///
/// # Errors
///
/// Returns [`CoreError::Config`] if a present config file fails to parse.
pub fn load_config(project_dir: Option<&Path>) -> Result<ArgusConfig, CoreError> {
    let mut config = ArgusConfig::default();

    if let Some(home) = std::env::var_os("HOME") {
        let home_path = PathBuf::from(home).join(CONFIG_FILE_NAME);
        if home_path.is_file() {
            config = load_config_file(&home_path)?;
            debug!(path = %home_path.display(), "applied home configuration");
        }
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(CONFIG_FILE_NAME);
        if project_path.is_file() {
            config = load_config_file(&project_path)?;
            debug!(path = %project_path.display(), "applied project configuration");
        }
    }

    Ok(config)
}

/// Load and parse one configuration file.
///
/// # Errors
///
/// Returns [`CoreError::Io`] on read failures and [`CoreError::Config`] on
/// parse failures.
pub fn load_config_file(path: &Path) -> Result<ArgusConfig, CoreError> {
    let contents = std::fs::read_to_string(path)?;
    serde_yml::from_str(&contents)
        .map_err(|e| CoreError::Config(format!("failed to parse {}: {e}", path.display())))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_sensible() {
        let config = ArgusConfig::default();
        assert_eq!(config.evaluation.rules_dir, PathBuf::from("rules/builtin"));
        assert_eq!(config.evaluation.catalogs_dir, PathBuf::from("rules/catalogs"));
        assert!(config.evaluation.catalog.is_empty());
        assert_eq!(config.reporting.default_format, "json");
        assert!(!config.reporting.timestamp);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "reporting:\n  default_format: table\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.reporting.default_format, "table");
        // Untouched section falls back to defaults.
        assert_eq!(config.evaluation.rules_dir, PathBuf::from("rules/builtin"));
    }

    #[test]
    fn project_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "evaluation:\n  rules_dir: custom/rules\n  catalog: soc2-security\n",
        )
        .unwrap();

        let config = load_config(Some(dir.path())).unwrap();
        assert_eq!(config.evaluation.rules_dir, PathBuf::from("custom/rules"));
        assert_eq!(config.evaluation.catalog, "soc2-security");
    }

    #[test]
    fn missing_project_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(Some(dir.path())).unwrap();
        assert_eq!(config.reporting.default_format, "json");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "evaluation: [broken").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
        assert!(err.to_string().contains(".argus.yaml"));
    }

    #[test]
    fn config_yaml_roundtrip() {
        let config = ArgusConfig::default();
        let yaml = serde_yml::to_string(&config).unwrap();
        let back: ArgusConfig = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(config, back);
    }
}

//! Declarative YAML rule loader.
//!
//! Each YAML file describes one rule: the resource kind it targets, the SOC 2
//! control it maps to, and a tagged predicate.
//!
//! # YAML Format
//!
//! ```yaml
//! id: argus/soc2/s3-no-public-read
//! name: S3 buckets must not allow public read
//! description: Detects buckets whose ACL or policy grants public read access
//! severity: critical
//! resource_type: S3_BUCKET
//! control_id: CC6.6
//! predicate:
//!   kind: attribute_equals
//!   attribute: public_read
//!   expected: false
//! remediation: Enable the account-level S3 Block Public Access setting.
//! references:
//!   - https://docs.aws.amazon.com/AmazonS3/latest/userguide/access-control-block-public-access.html
//! tags:
//!   - s3
//! version: 1.0.0
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{Rule, RuleError};

// ---------------------------------------------------------------------------
// DeclarativeError
// ---------------------------------------------------------------------------

/// Errors that can occur while loading declarative YAML rule files.
#[derive(Debug, thiserror::Error)]
pub enum DeclarativeError {
    /// An I/O error occurred while reading a rule file.
    #[error("I/O error reading rule file '{}': {source}", path.display())]
    IoError {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The YAML content could not be parsed.
    #[error("YAML parse error in '{}': {source}", path.display())]
    YamlParseError {
        /// The path that contained invalid YAML.
        path: PathBuf,
        /// The underlying YAML parsing error.
        source: serde_yml::Error,
    },

    /// A parsed rule failed structural validation.
    #[error("validation error for rule '{rule_id}': {source}")]
    ValidationError {
        /// The rule ID that failed validation.
        rule_id: String,
        /// The underlying validation error.
        source: RuleError,
    },

    /// Two rule files declare the same rule ID.
    #[error("duplicate rule id '{rule_id}' (second occurrence in '{}')", path.display())]
    DuplicateRuleId {
        /// The duplicated rule ID.
        rule_id: String,
        /// The file containing the second occurrence.
        path: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// DeclarativeRuleLoader
// ---------------------------------------------------------------------------

/// Loads declarative compliance rules from YAML files.
///
/// Each YAML file defines a single rule. The loader parses the YAML into a
/// [`Rule`] and validates the result.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use argus_rules::declarative::DeclarativeRuleLoader;
///
/// let loader = DeclarativeRuleLoader;
/// let rules = loader.load_from_dir(Path::new("rules/")).unwrap();
/// for rule in &rules {
///     println!("{rule}");
/// }
/// ```
pub struct DeclarativeRuleLoader;

impl DeclarativeRuleLoader {
    /// Loads a single declarative rule from a YAML file.
    ///
    /// # Errors
    ///
    /// - [`DeclarativeError::IoError`] if the file cannot be read.
    /// - [`DeclarativeError::YamlParseError`] if the YAML is malformed or
    ///   missing required fields.
    /// - [`DeclarativeError::ValidationError`] if the parsed rule fails
    ///   structural validation.
    pub fn load_from_file(&self, path: &Path) -> Result<Rule, DeclarativeError> {
        let contents = std::fs::read_to_string(path).map_err(|e| DeclarativeError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;

        self.load_from_str(&contents, path)
    }

    /// Loads all declarative rules from `.yaml` and `.yml` files in a
    /// directory, recursively.
    ///
    /// Files without a YAML extension are silently skipped. The returned
    /// rules are sorted by ID for deterministic ordering, and duplicate rule
    /// IDs across files are rejected.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered: I/O, YAML parse, validation, or
    /// [`DeclarativeError::DuplicateRuleId`].
    pub fn load_from_dir(&self, dir: &Path) -> Result<Vec<Rule>, DeclarativeError> {
        let mut rules = Vec::new();
        let mut seen_ids: BTreeSet<String> = BTreeSet::new();

        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
                DeclarativeError::IoError {
                    path,
                    source: std::io::Error::other(e),
                }
            })?;

            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => {}
                _ => continue,
            }

            let rule = self.load_from_file(path)?;
            if !seen_ids.insert(rule.id.clone()) {
                return Err(DeclarativeError::DuplicateRuleId {
                    rule_id: rule.id,
                    path: path.to_path_buf(),
                });
            }
            rules.push(rule);
        }

        rules.sort();
        Ok(rules)
    }

    /// Parses a YAML string and returns a validated rule.
    ///
    /// The `source_path` is used only for error messages.
    fn load_from_str(&self, yaml: &str, source_path: &Path) -> Result<Rule, DeclarativeError> {
        let rule: Rule =
            serde_yml::from_str(yaml).map_err(|e| DeclarativeError::YamlParseError {
                path: source_path.to_path_buf(),
                source: e,
            })?;

        rule.validate()
            .map_err(|e| DeclarativeError::ValidationError {
                rule_id: rule.id.clone(),
                source: e,
            })?;

        Ok(rule)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Control catalogs -- types, catalog loading, and rule-coverage computation.
//!
//! A control catalog names the audit controls a rule set maps to (e.g. the
//! SOC 2 common criteria). Catalogs are data: YAML files loaded at
//! configuration time, never hard-coded, because authoritative control text
//! is owned by the audit framework, not by this tool.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use argus_rules::Rule;

use crate::CoreError;

// ---------------------------------------------------------------------------
// Catalog definition types (deserialised from YAML)
// ---------------------------------------------------------------------------

/// A control catalog definition (e.g. SOC 2 Security criteria).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlCatalog {
    /// Unique identifier (e.g. `"soc2-security"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Catalog version string.
    pub version: String,
    /// Controls within this catalog.
    pub controls: Vec<Control>,
}

impl ControlCatalog {
    /// Returns the ids of every control in this catalog, in catalog order.
    #[must_use]
    pub fn control_ids(&self) -> Vec<String> {
        self.controls.iter().map(|c| c.id.clone()).collect()
    }
}

/// A single control within a catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Control {
    /// Control identifier (e.g. `"CC6.1"`).
    pub id: String,
    /// Short title.
    pub title: String,
    /// Longer description.
    pub description: String,
}

// ---------------------------------------------------------------------------
// Catalog loading
// ---------------------------------------------------------------------------

/// Load all control catalog definitions from YAML files in `dir`.
///
/// Files without a YAML extension are skipped; a missing directory yields an
/// empty list rather than an error so callers can probe default locations.
/// Catalogs are returned sorted by id.
///
/// # Errors
///
/// Returns [`CoreError::Catalog`] if a YAML file fails to parse, or
/// [`CoreError::Io`] on read failures.
pub fn load_catalogs(dir: &Path) -> Result<Vec<ControlCatalog>, CoreError> {
    let mut catalogs = Vec::new();

    if !dir.exists() {
        return Ok(catalogs);
    }

    for entry in WalkDir::new(dir).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| CoreError::Io(e.into()))?;
        let path = entry.path();
        if path.is_file() {
            match path.extension().and_then(|e| e.to_str()) {
                Some("yaml" | "yml") => {}
                _ => continue,
            }
            let contents = std::fs::read_to_string(path)?;
            let catalog: ControlCatalog = serde_yml::from_str(&contents).map_err(|e| {
                CoreError::Catalog(format!("failed to parse {}: {e}", path.display()))
            })?;
            catalogs.push(catalog);
        }
    }

    catalogs.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(catalogs)
}

// ---------------------------------------------------------------------------
// Coverage computation
// ---------------------------------------------------------------------------

/// Per-control detail within a coverage summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlCoverage {
    /// Control identifier.
    pub control_id: String,
    /// Control title.
    pub control_title: String,
    /// Number of rules mapped to this control.
    pub mapped_rules: u32,
    /// `"Covered"` or `"No Coverage"`.
    pub status: String,
}

/// Aggregated rule coverage for one catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogCoverage {
    /// Catalog identifier.
    pub catalog: String,
    /// Catalog name.
    pub catalog_name: String,
    /// Per-control breakdown.
    pub controls: Vec<ControlCoverage>,
    /// Total number of rules mapped to any control in this catalog.
    pub total_rules: u32,
    /// Number of controls with at least one mapped rule.
    pub covered_controls: u32,
    /// `covered_controls / total_controls * 100`.
    pub coverage_percentage: f64,
    /// Ids of rules whose `control_id` names no control in this catalog.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmapped_rules: Vec<String>,
}

/// Compute rule coverage for a catalog: which controls have at least one
/// rule mapped via [`Rule::control_id`], and which rules point at controls
/// the catalog does not define.
#[must_use]
pub fn compute_coverage(catalog: &ControlCatalog, rules: &[Rule]) -> CatalogCoverage {
    let mut control_rules: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for control in &catalog.controls {
        control_rules.insert(&control.id, Vec::new());
    }

    let mut unmapped_rules: Vec<String> = Vec::new();
    for rule in rules {
        match control_rules.get_mut(rule.control_id.as_str()) {
            Some(list) => {
                if !list.contains(&rule.id.as_str()) {
                    list.push(&rule.id);
                }
            }
            None => unmapped_rules.push(rule.id.clone()),
        }
    }
    unmapped_rules.sort();
    unmapped_rules.dedup();

    let mut controls = Vec::new();
    let mut covered_count = 0u32;
    let mut total_unique_rules: BTreeSet<&str> = BTreeSet::new();

    for control in &catalog.controls {
        let rule_list = control_rules.get(control.id.as_str()).cloned().unwrap_or_default();
        let mapped = rule_list.len() as u32;
        let status = if mapped > 0 { "Covered" } else { "No Coverage" };
        if mapped > 0 {
            covered_count += 1;
        }
        for r in rule_list {
            total_unique_rules.insert(r);
        }
        controls.push(ControlCoverage {
            control_id: control.id.clone(),
            control_title: control.title.clone(),
            mapped_rules: mapped,
            status: status.to_owned(),
        });
    }

    let total_controls = catalog.controls.len() as f64;
    let coverage_pct = if total_controls > 0.0 {
        (f64::from(covered_count) / total_controls) * 100.0
    } else {
        0.0
    };

    CatalogCoverage {
        catalog: catalog.id.clone(),
        catalog_name: catalog.name.clone(),
        controls,
        total_rules: total_unique_rules.len() as u32,
        covered_controls: covered_count,
        coverage_percentage: coverage_pct,
        unmapped_rules,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

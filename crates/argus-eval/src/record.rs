//! Persistent cycle records.
//!
//! A [`CycleRecord`] captures the complete output of one evaluation cycle:
//! every verdict plus the per-control summaries derived from them. Records
//! are the append-only verdict log the data model calls for -- drift
//! detection loads two records and compares them, and validation re-derives
//! each summary from the stored verdicts to prove there is no hidden
//! accumulator state.
//!
//! # Schema
//!
//! Records use schema version `"1.0.0"` and are stored as pretty-printed
//! JSON. Verdicts are stored in sorted order with unique
//! `(rule, resource)` pairs; fingerprints are SHA-256 hex strings.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregate::{ControlStatus, ControlSummary};
use crate::verdict::Verdict;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// The current cycle record schema version.
pub const CYCLE_RECORD_SCHEMA_VERSION: &str = "1.0.0";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading, saving, or validating a cycle record.
#[derive(Debug, thiserror::Error)]
pub enum CycleRecordError {
    /// An I/O error occurred while reading or writing a record file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The JSON content could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The record failed semantic validation.
    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// CycleRecord
// ---------------------------------------------------------------------------

/// The persisted output of one evaluation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    /// Schema version (must be `"1.0.0"`).
    pub schema_version: String,

    /// Identifier of the cycle that produced this record.
    pub cycle_id: String,

    /// RFC 3339 timestamp of when the cycle was aggregated.
    pub computed_at: String,

    /// Version of the Argus engine that produced this record.
    pub engine_version: String,

    /// Per-control summaries, sorted by control id.
    pub summaries: Vec<ControlSummary>,

    /// Every verdict of the cycle, sorted by
    /// `(control_id, rule_id, resource_id)`.
    pub verdicts: Vec<Verdict>,

    /// Optional metadata associated with this record.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Returns `true` if the string is a valid 64-character lowercase hex string.
fn is_valid_fingerprint(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

impl CycleRecord {
    /// Validates semantic invariants on this record.
    ///
    /// # Checks
    ///
    /// 1. `schema_version` must be `"1.0.0"`.
    /// 2. Every verdict fingerprint must be a 64-char lowercase hex string.
    /// 3. Verdicts must be sorted by `(control_id, rule_id, resource_id)`
    ///    with no duplicate `(rule, resource)` pairs.
    /// 4. Every summary must be recomputable from the stored verdicts:
    ///    failing counts and failing-resource lists must match what the
    ///    verdicts say, and the status must follow from the counts.
    /// 5. Every control that appears in a verdict must have a summary.
    ///
    /// # Errors
    ///
    /// Returns [`CycleRecordError::Validation`] if any check fails.
    pub fn validate(&self) -> Result<(), CycleRecordError> {
        // 1. Schema version check.
        if self.schema_version != CYCLE_RECORD_SCHEMA_VERSION {
            return Err(CycleRecordError::Validation(format!(
                "unsupported schema_version '{}', expected '{CYCLE_RECORD_SCHEMA_VERSION}'",
                self.schema_version,
            )));
        }

        // 2. Fingerprint format check.
        for (i, verdict) in self.verdicts.iter().enumerate() {
            if !is_valid_fingerprint(&verdict.fingerprint) {
                return Err(CycleRecordError::Validation(format!(
                    "verdict at index {i} has an invalid fingerprint: '{}'",
                    verdict.fingerprint,
                )));
            }
        }

        // 3. Sorted order and (rule, resource) uniqueness.
        for window in self.verdicts.windows(2) {
            if window[0] > window[1] {
                return Err(CycleRecordError::Validation(format!(
                    "verdicts are not sorted: '{}' precedes '{}'",
                    window[0], window[1],
                )));
            }
        }
        let mut seen_pairs: BTreeSet<(&str, &str)> = BTreeSet::new();
        for verdict in &self.verdicts {
            if !seen_pairs.insert((&verdict.rule_id, &verdict.resource_id)) {
                return Err(CycleRecordError::Validation(format!(
                    "duplicate verdict for rule '{}' on resource '{}'",
                    verdict.rule_id, verdict.resource_id,
                )));
            }
        }

        // 4. Summaries must be recomputable from the verdicts.
        let mut failing_by_control: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut resources_by_control: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for verdict in &self.verdicts {
            resources_by_control
                .entry(&verdict.control_id)
                .or_default()
                .insert(&verdict.resource_id);
            if !verdict.passed {
                failing_by_control
                    .entry(&verdict.control_id)
                    .or_default()
                    .insert(&verdict.resource_id);
            }
        }

        for summary in &self.summaries {
            let control = summary.control_id.as_str();
            let expected_total = resources_by_control
                .get(control)
                .map_or(0, |set| set.len() as u32);
            let expected_failing: Vec<&str> = failing_by_control
                .get(control)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default();

            if summary.resources_total != expected_total {
                return Err(CycleRecordError::Validation(format!(
                    "summary for '{control}' claims {} resources but verdicts cover {expected_total}",
                    summary.resources_total,
                )));
            }
            let actual_failing: Vec<&str> = summary
                .failing_resources
                .iter()
                .map(String::as_str)
                .collect();
            if actual_failing != expected_failing {
                return Err(CycleRecordError::Validation(format!(
                    "summary for '{control}' failing list {actual_failing:?} does not match verdicts {expected_failing:?}",
                )));
            }
            if summary.resources_failing != expected_failing.len() as u32 {
                return Err(CycleRecordError::Validation(format!(
                    "summary for '{control}' claims {} failing resources but lists {}",
                    summary.resources_failing,
                    expected_failing.len(),
                )));
            }
            let expected_status = if expected_total == 0 {
                ControlStatus::NoResources
            } else if expected_failing.is_empty() {
                ControlStatus::Compliant
            } else {
                ControlStatus::NonCompliant
            };
            if summary.status != expected_status {
                return Err(CycleRecordError::Validation(format!(
                    "summary for '{control}' has status {} but verdicts imply {expected_status}",
                    summary.status,
                )));
            }
        }

        // 5. No verdict control may lack a summary.
        let summarized: BTreeSet<&str> =
            self.summaries.iter().map(|s| s.control_id.as_str()).collect();
        for control in resources_by_control.keys() {
            if !summarized.contains(control) {
                return Err(CycleRecordError::Validation(format!(
                    "control '{control}' has verdicts but no summary",
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Create a new [`CycleRecord`] from a cycle's verdicts and summaries.
///
/// The verdicts are sorted; summaries are sorted by control id. The
/// `computed_at` timestamp is supplied by the caller so record creation
/// stays deterministic under test.
#[must_use]
pub fn create_cycle_record(
    cycle_id: &str,
    engine_version: &str,
    mut verdicts: Vec<Verdict>,
    mut summaries: Vec<ControlSummary>,
    metadata: BTreeMap<String, serde_json::Value>,
    computed_at: &str,
) -> CycleRecord {
    verdicts.sort();
    summaries.sort_by(|a, b| a.control_id.cmp(&b.control_id));

    CycleRecord {
        schema_version: CYCLE_RECORD_SCHEMA_VERSION.to_owned(),
        cycle_id: cycle_id.to_owned(),
        computed_at: computed_at.to_owned(),
        engine_version: engine_version.to_owned(),
        summaries,
        verdicts,
        metadata,
    }
}

// ---------------------------------------------------------------------------
// Loading / saving
// ---------------------------------------------------------------------------

/// Load a [`CycleRecord`] from a JSON file on disk.
///
/// The file is read, deserialized, and validated before returning.
///
/// # Errors
///
/// Returns [`CycleRecordError::Io`] if the file cannot be read,
/// [`CycleRecordError::Json`] if the JSON is malformed, or
/// [`CycleRecordError::Validation`] if semantic validation fails.
pub fn load_cycle_record(path: &Path) -> Result<CycleRecord, CycleRecordError> {
    let content = std::fs::read_to_string(path)?;
    load_cycle_record_from_str(&content)
}

/// Parse a [`CycleRecord`] from a JSON string.
///
/// # Errors
///
/// Returns [`CycleRecordError::Json`] if the JSON is malformed, or
/// [`CycleRecordError::Validation`] if semantic validation fails.
pub fn load_cycle_record_from_str(json: &str) -> Result<CycleRecord, CycleRecordError> {
    let record: CycleRecord = serde_json::from_str(json)?;
    record.validate()?;
    Ok(record)
}

/// Save a [`CycleRecord`] as pretty-printed JSON to disk.
///
/// # Errors
///
/// Returns [`CycleRecordError::Io`] if the file cannot be written, or
/// [`CycleRecordError::Json`] if serialization fails.
pub fn save_cycle_record(record: &CycleRecord, path: &Path) -> Result<(), CycleRecordError> {
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(path, json)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

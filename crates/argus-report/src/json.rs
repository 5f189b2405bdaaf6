//! Argus Cycle JSON v1.0.0 report formatter.
//!
//! Produces a deterministic JSON report containing cycle metadata, control
//! summaries, the underlying verdict list, and an overall status. The output
//! schema is versioned at `1.0.0` and designed for machine consumption by
//! dashboards and downstream tooling.
//!
//! # Determinism guarantees
//!
//! - Verdicts arrive pre-sorted by `(control_id, rule_id, resource_id)`.
//! - Evidence maps use `BTreeMap` for stable key ordering.
//! - Timestamps are disabled by default (`include_timestamp = false`).
//! - The cycle ID is a SHA-256 digest of
//!   `(engine_version, rules_version, snapshots_digest)`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use argus_core::engine::CycleResult;
use argus_eval::{ControlStatus, ControlSummary, Verdict};
use argus_rules::Rule;
use argus_snapshot::ResourceSnapshot;

// ---------------------------------------------------------------------------
// Schema version
// ---------------------------------------------------------------------------

/// Current schema version for the Argus Cycle JSON format.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Engine version extracted from this crate's Cargo.toml.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Report structs
// ---------------------------------------------------------------------------

/// Top-level Argus Cycle JSON report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    /// Schema version identifier (always `"1.0.0"`).
    pub schema_version: String,

    /// Metadata about the cycle that produced this report.
    pub cycle: CycleMetadata,

    /// Per-control summaries in control-id order.
    pub controls: Vec<ControlSummary>,

    /// All verdicts of the cycle, in deterministic order.
    pub verdicts: Vec<Verdict>,

    /// Summary counts over the verdict list.
    pub verdict_counts: VerdictCounts,

    /// Overall status across all controls.
    pub overall_status: ControlStatus,
}

/// Metadata describing the evaluation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleMetadata {
    /// Deterministic cycle ID (SHA-256 hex digest).
    pub id: String,

    /// ISO 8601 timestamp of when the cycle ran.
    /// Omitted by default for deterministic output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Version of the Argus engine that ran the cycle.
    pub engine_version: String,

    /// SHA-256 hash of sorted rule IDs and versions.
    pub rules_version: String,

    /// Number of rules evaluated.
    pub rules_evaluated: u32,

    /// Number of distinct resources that received at least one verdict.
    pub resources_evaluated: u32,
}

/// Summary counts of verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictCounts {
    /// Number of passing verdicts.
    pub passed: u32,
    /// Number of failing verdicts.
    pub failed: u32,
    /// Total number of verdicts.
    pub total: u32,
}

// ---------------------------------------------------------------------------
// Deterministic computation functions
// ---------------------------------------------------------------------------

/// Computes a SHA-256 hash over the sorted `id@version` pairs of the rule
/// set. Same rules always produce the same hash, regardless of load order.
#[must_use]
pub fn compute_rules_version(rules: &[Rule]) -> String {
    let mut pairs: Vec<String> = rules
        .iter()
        .map(|r| format!("{}@{}", r.id, r.version))
        .collect();
    pairs.sort();

    let mut hasher = Sha256::new();
    for pair in pairs {
        hasher.update(pair.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Computes a SHA-256 digest over the snapshot identities of a cycle:
/// the sorted `(resource_type, resource_id, captured_at)` triples.
#[must_use]
pub fn compute_snapshots_digest(snapshots: &[ResourceSnapshot]) -> String {
    let mut triples: Vec<String> = snapshots
        .iter()
        .map(|s| format!("{}\x1f{}\x1f{}", s.resource_type, s.resource_id, s.captured_at))
        .collect();
    triples.sort();

    let mut hasher = Sha256::new();
    for triple in triples {
        hasher.update(triple.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Computes a deterministic cycle ID as a SHA-256 hex digest of the engine
/// version, the rules version, and the snapshot digest. Same inputs always
/// produce the same cycle ID.
#[must_use]
pub fn compute_cycle_id(engine_version: &str, rules_version: &str, snapshots_digest: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(engine_version.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(rules_version.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(snapshots_digest.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Derives the overall status from the per-control summaries.
///
/// `NON_COMPLIANT` wins over everything; a mix of compliant and
/// no-resources controls is `COMPLIANT`; only when every control (or the
/// whole cycle) had nothing to check is the overall status `NO_RESOURCES`.
#[must_use]
pub fn overall_status(summaries: &[ControlSummary]) -> ControlStatus {
    if summaries.iter().any(|s| s.status.is_non_compliant()) {
        ControlStatus::NonCompliant
    } else if summaries.iter().any(|s| s.status.is_compliant()) {
        ControlStatus::Compliant
    } else {
        ControlStatus::NoResources
    }
}

// ---------------------------------------------------------------------------
// format_report
// ---------------------------------------------------------------------------

/// Builds a [`CycleReport`] from a cycle result.
///
/// `snapshots` is the snapshot set the cycle ran over (used only for the
/// deterministic cycle ID). `timestamp` is included in the report only when
/// `include_timestamp` is true; leaving it out keeps identical cycles
/// byte-identical.
#[must_use]
pub fn format_report(
    result: &CycleResult,
    rules: &[Rule],
    snapshots: &[ResourceSnapshot],
    timestamp: &str,
    include_timestamp: bool,
) -> CycleReport {
    let rules_version = compute_rules_version(rules);
    let snapshots_digest = compute_snapshots_digest(snapshots);
    let cycle_id = compute_cycle_id(ENGINE_VERSION, &rules_version, &snapshots_digest);

    let failed = result.verdicts.iter().filter(|v| !v.passed).count() as u32;
    let total = result.verdicts.len() as u32;

    CycleReport {
        schema_version: SCHEMA_VERSION.to_owned(),
        cycle: CycleMetadata {
            id: cycle_id,
            timestamp: include_timestamp.then(|| timestamp.to_owned()),
            engine_version: ENGINE_VERSION.to_owned(),
            rules_version,
            rules_evaluated: result.rules_evaluated,
            resources_evaluated: result.resources_evaluated,
        },
        controls: result.summaries.clone(),
        verdicts: result.verdicts.clone(),
        verdict_counts: VerdictCounts {
            passed: total - failed,
            failed,
            total,
        },
        overall_status: overall_status(&result.summaries),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

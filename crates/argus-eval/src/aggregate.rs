//! The evidence aggregator.
//!
//! Folds a cycle's complete verdict set into one [`ControlSummary`] per SOC 2
//! control. Aggregation is a pure fold with no hidden accumulator state:
//! summaries are always recomputable from the verdict set alone, which is
//! what lets cycle records be validated after the fact.
//!
//! # Algorithm
//!
//! 1. Group verdicts by `control_id`, then by `resource_id`.
//! 2. A resource FAILS a control when any verdict for that control and
//!    resource failed; it passes only when all of them passed.
//! 3. A control is `COMPLIANT` only when it has at least one resource and
//!    zero failing resources; any failing resource makes it
//!    `NON_COMPLIANT`.
//! 4. Controls with no verdicts at all (no snapshots of the required type,
//!    or a rule targeting a type the provider never supplies) are reported
//!    as `NO_RESOURCES` -- "nothing to check" is distinct from "checked and
//!    failed" so audits can tell the two apart.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::verdict::Verdict;

// ---------------------------------------------------------------------------
// ControlStatus
// ---------------------------------------------------------------------------

/// Aggregated compliance status of one control for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ControlStatus {
    /// All evaluated resources passed every rule mapped to the control.
    #[serde(rename = "COMPLIANT")]
    Compliant,
    /// At least one resource failed a rule mapped to the control.
    #[serde(rename = "NON_COMPLIANT")]
    NonCompliant,
    /// No resources of the required type were evaluated this cycle.
    #[serde(rename = "NO_RESOURCES")]
    NoResources,
}

impl ControlStatus {
    /// Returns `true` if the status indicates a compliant control.
    #[must_use]
    pub const fn is_compliant(self) -> bool {
        matches!(self, Self::Compliant)
    }

    /// Returns `true` if the status indicates a non-compliant control.
    #[must_use]
    pub const fn is_non_compliant(self) -> bool {
        matches!(self, Self::NonCompliant)
    }
}

impl fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Compliant => "COMPLIANT",
            Self::NonCompliant => "NON_COMPLIANT",
            Self::NoResources => "NO_RESOURCES",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// ControlSummary
// ---------------------------------------------------------------------------

/// Aggregated pass/fail evidence for one control across all relevant
/// resources in a cycle.
///
/// Derived state: recomputed from the verdict set each cycle, never owned
/// independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSummary {
    /// Control identifier (e.g. `CC6.6`).
    pub control_id: String,

    /// Aggregated status for this cycle.
    pub status: ControlStatus,

    /// Number of distinct resources evaluated against this control.
    pub resources_total: u32,

    /// Number of distinct resources that passed every mapped rule.
    pub resources_passing: u32,

    /// Number of distinct resources that failed at least one mapped rule.
    pub resources_failing: u32,

    /// Identifiers of the failing resources, sorted and deduplicated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failing_resources: Vec<String>,

    /// RFC 3339 timestamp of the aggregation.
    pub computed_at: String,
}

impl fmt::Display for ControlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}/{} passing)",
            self.control_id, self.status, self.resources_passing, self.resources_total
        )
    }
}

// ---------------------------------------------------------------------------
// aggregate_cycle
// ---------------------------------------------------------------------------

/// Aggregates a cycle's complete verdict set into per-control summaries.
///
/// `expected_controls` lists every control the rule set maps to; controls in
/// it that received zero verdicts are reported as
/// [`ControlStatus::NoResources`]. Controls that appear in `verdicts` but
/// not in `expected_controls` are summarized as well, so no evidence is ever
/// dropped. The caller must pass the FULL verdict set for the cycle --
/// aggregating a partial set would understate failing counts.
///
/// Output is sorted by control id.
#[must_use]
pub fn aggregate_cycle(
    verdicts: &[Verdict],
    expected_controls: &[String],
    computed_at: &str,
) -> Vec<ControlSummary> {
    // control_id -> resource_id -> all rules passed so far.
    let mut by_control: BTreeMap<&str, BTreeMap<&str, bool>> = BTreeMap::new();
    for verdict in verdicts {
        let entry = by_control
            .entry(&verdict.control_id)
            .or_default()
            .entry(&verdict.resource_id)
            .or_insert(true);
        *entry = *entry && verdict.passed;
    }

    let control_ids: BTreeSet<&str> = expected_controls
        .iter()
        .map(String::as_str)
        .chain(by_control.keys().copied())
        .collect();

    let mut summaries = Vec::with_capacity(control_ids.len());
    for control_id in control_ids {
        let summary = match by_control.get(control_id) {
            Some(resources) => {
                let failing_resources: Vec<String> = resources
                    .iter()
                    .filter(|(_, passed)| !**passed)
                    .map(|(id, _)| (*id).to_owned())
                    .collect();
                let total = resources.len() as u32;
                let failing = failing_resources.len() as u32;
                let status = if failing == 0 {
                    ControlStatus::Compliant
                } else {
                    ControlStatus::NonCompliant
                };
                ControlSummary {
                    control_id: control_id.to_owned(),
                    status,
                    resources_total: total,
                    resources_passing: total - failing,
                    resources_failing: failing,
                    failing_resources,
                    computed_at: computed_at.to_owned(),
                }
            }
            None => ControlSummary {
                control_id: control_id.to_owned(),
                status: ControlStatus::NoResources,
                resources_total: 0,
                resources_passing: 0,
                resources_failing: 0,
                failing_resources: Vec::new(),
                computed_at: computed_at.to_owned(),
            },
        };
        summaries.push(summary);
    }

    summaries
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use argus_rules::Severity;
    use argus_snapshot::ResourceType;
    use std::collections::BTreeMap as Map;

    const CYCLE_TS: &str = "2026-03-01T06:05:00Z";

    fn make_verdict(control: &str, rule: &str, resource: &str, passed: bool) -> Verdict {
        let evidence = Map::new();
        let fingerprint = Verdict::compute_fingerprint(rule, "1.0.0", resource, passed, &evidence);
        Verdict {
            fingerprint,
            rule_id: rule.to_owned(),
            control_id: control.to_owned(),
            resource_id: resource.to_owned(),
            resource_type: ResourceType::S3Bucket,
            severity: Severity::High,
            passed,
            evidence,
            evaluated_at: CYCLE_TS.to_owned(),
        }
    }

    fn owned(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn three_resources_one_failing_is_non_compliant() {
        let verdicts = vec![
            make_verdict("CC6.6", "argus/soc2/s3-no-public-read", "bucket-1", false),
            make_verdict("CC6.6", "argus/soc2/s3-no-public-read", "bucket-2", true),
            make_verdict("CC6.6", "argus/soc2/s3-no-public-read", "bucket-3", true),
        ];

        let summaries = aggregate_cycle(&verdicts, &owned(&["CC6.6"]), CYCLE_TS);
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.status, ControlStatus::NonCompliant);
        assert_eq!(s.resources_total, 3);
        assert_eq!(s.resources_passing, 2);
        assert_eq!(s.resources_failing, 1);
        assert_eq!(s.failing_resources, vec!["bucket-1"]);
    }

    #[test]
    fn all_passing_is_compliant() {
        let verdicts = vec![
            make_verdict("CC7.1", "argus/soc2/cloudtrail-logging", "trail-main", true),
        ];
        let summaries = aggregate_cycle(&verdicts, &owned(&["CC7.1"]), CYCLE_TS);
        assert_eq!(summaries[0].status, ControlStatus::Compliant);
        assert!(summaries[0].failing_resources.is_empty());
    }

    #[test]
    fn zero_verdicts_is_no_resources_not_compliant() {
        let summaries = aggregate_cycle(&[], &owned(&["CC7.1"]), CYCLE_TS);
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.status, ControlStatus::NoResources);
        assert_eq!(s.resources_total, 0);
        assert_ne!(s.status, ControlStatus::Compliant);
    }

    #[test]
    fn failing_count_equals_failed_verdict_resources() {
        // Two rules on the same control and resource: one passes, one fails.
        // The resource must be counted failing exactly once.
        let verdicts = vec![
            make_verdict("CC9.2", "argus/soc2/s3-encryption", "bucket-1", true),
            make_verdict("CC9.2", "argus/soc2/s3-versioning", "bucket-1", false),
            make_verdict("CC9.2", "argus/soc2/s3-encryption", "bucket-2", true),
            make_verdict("CC9.2", "argus/soc2/s3-versioning", "bucket-2", true),
        ];

        let summaries = aggregate_cycle(&verdicts, &owned(&["CC9.2"]), CYCLE_TS);
        let s = &summaries[0];
        assert_eq!(s.resources_total, 2);
        assert_eq!(s.resources_failing, 1);
        assert_eq!(s.failing_resources, vec!["bucket-1"]);
        assert_eq!(s.status, ControlStatus::NonCompliant);
    }

    #[test]
    fn controls_seen_only_in_verdicts_are_still_summarized() {
        let verdicts = vec![make_verdict("CC6.2", "argus/soc2/iam-user-mfa", "alice", true)];
        let summaries = aggregate_cycle(&verdicts, &owned(&["CC7.1"]), CYCLE_TS);

        let ids: Vec<&str> = summaries.iter().map(|s| s.control_id.as_str()).collect();
        assert_eq!(ids, vec!["CC6.2", "CC7.1"]);
        assert_eq!(summaries[0].status, ControlStatus::Compliant);
        assert_eq!(summaries[1].status, ControlStatus::NoResources);
    }

    #[test]
    fn output_sorted_by_control_id() {
        let verdicts = vec![
            make_verdict("CC9.2", "r1", "x", true),
            make_verdict("CC6.1", "r2", "y", true),
            make_verdict("CC7.1", "r3", "z", false),
        ];
        let summaries = aggregate_cycle(&verdicts, &[], CYCLE_TS);
        let ids: Vec<&str> = summaries.iter().map(|s| s.control_id.as_str()).collect();
        assert_eq!(ids, vec!["CC6.1", "CC7.1", "CC9.2"]);
    }

    #[test]
    fn failing_resources_sorted_and_deduplicated() {
        // The same resource failing two rules of one control appears once.
        let verdicts = vec![
            make_verdict("CC6.6", "rule-a", "bucket-z", false),
            make_verdict("CC6.6", "rule-b", "bucket-z", false),
            make_verdict("CC6.6", "rule-a", "bucket-a", false),
        ];
        let summaries = aggregate_cycle(&verdicts, &[], CYCLE_TS);
        assert_eq!(summaries[0].failing_resources, vec!["bucket-a", "bucket-z"]);
        assert_eq!(summaries[0].resources_failing, 2);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let verdicts = vec![
            make_verdict("CC6.6", "rule-a", "bucket-1", false),
            make_verdict("CC6.2", "rule-b", "alice", true),
        ];
        let first = aggregate_cycle(&verdicts, &owned(&["CC7.1"]), CYCLE_TS);
        let second = aggregate_cycle(&verdicts, &owned(&["CC7.1"]), CYCLE_TS);
        assert_eq!(first, second);
    }

    #[test]
    fn control_status_wire_form() {
        assert_eq!(
            serde_json::to_string(&ControlStatus::NonCompliant).unwrap(),
            "\"NON_COMPLIANT\""
        );
        assert_eq!(
            serde_json::to_string(&ControlStatus::NoResources).unwrap(),
            "\"NO_RESOURCES\""
        );
        let back: ControlStatus = serde_json::from_str("\"COMPLIANT\"").unwrap();
        assert_eq!(back, ControlStatus::Compliant);
    }

    #[test]
    fn control_status_helpers() {
        assert!(ControlStatus::Compliant.is_compliant());
        assert!(!ControlStatus::Compliant.is_non_compliant());
        assert!(ControlStatus::NonCompliant.is_non_compliant());
        assert!(!ControlStatus::NoResources.is_compliant());
        assert!(!ControlStatus::NoResources.is_non_compliant());
    }

    #[test]
    fn summary_display() {
        let summaries = aggregate_cycle(
            &[make_verdict("CC6.6", "r", "bucket-1", false)],
            &[],
            CYCLE_TS,
        );
        let display = summaries[0].to_string();
        assert!(display.contains("CC6.6"));
        assert!(display.contains("NON_COMPLIANT"));
        assert!(display.contains("0/1 passing"));
    }
}

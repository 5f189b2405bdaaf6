//! Cycle-to-cycle drift detection.
//!
//! Drift is a change in compliance status for a resource between evaluation
//! cycles. Detection is a set difference over the failing-resource lists of
//! two [`ControlSummary`] values for the same control: resources failing now
//! but not before are *newly failing*; resources failing before but not now
//! are *newly passing*. Identical cycles therefore produce empty drift.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aggregate::ControlSummary;
use crate::record::CycleRecord;

// ---------------------------------------------------------------------------
// ControlDrift
// ---------------------------------------------------------------------------

/// Drift in one control's failing-resource set between two cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlDrift {
    /// Control identifier.
    pub control_id: String,

    /// Resources failing in the later cycle but not the earlier one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub newly_failing: Vec<String>,

    /// Resources failing in the earlier cycle but not the later one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub newly_passing: Vec<String>,
}

impl ControlDrift {
    /// Returns `true` if nothing changed for this control.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.newly_failing.is_empty() && self.newly_passing.is_empty()
    }
}

impl fmt::Display for ControlDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: +{} failing, +{} passing",
            self.control_id,
            self.newly_failing.len(),
            self.newly_passing.len()
        )
    }
}

// ---------------------------------------------------------------------------
// diff_summaries
// ---------------------------------------------------------------------------

/// Computes drift between two summaries of the SAME control from different
/// cycles.
///
/// Output lists are sorted. Callers pass the earlier cycle as `before`.
#[must_use]
pub fn diff_summaries(before: &ControlSummary, after: &ControlSummary) -> ControlDrift {
    let before_set: BTreeSet<&str> = before.failing_resources.iter().map(String::as_str).collect();
    let after_set: BTreeSet<&str> = after.failing_resources.iter().map(String::as_str).collect();

    let newly_failing: Vec<String> = after_set
        .difference(&before_set)
        .map(|s| (*s).to_owned())
        .collect();
    let newly_passing: Vec<String> = before_set
        .difference(&after_set)
        .map(|s| (*s).to_owned())
        .collect();

    ControlDrift {
        control_id: after.control_id.clone(),
        newly_failing,
        newly_passing,
    }
}

// ---------------------------------------------------------------------------
// diff_cycles
// ---------------------------------------------------------------------------

/// Computes per-control drift between two cycle records.
///
/// Covers the union of controls in both records; a control absent from one
/// side contributes an empty failing set, so a control appearing for the
/// first time with failures reports all of them as newly failing. Output is
/// sorted by control id, one entry per control (including empty ones, so
/// callers can distinguish "no drift" from "control not compared").
#[must_use]
pub fn diff_cycles(before: &CycleRecord, after: &CycleRecord) -> Vec<ControlDrift> {
    let empty = |control_id: &str| ControlSummary {
        control_id: control_id.to_owned(),
        status: crate::aggregate::ControlStatus::NoResources,
        resources_total: 0,
        resources_passing: 0,
        resources_failing: 0,
        failing_resources: Vec::new(),
        computed_at: String::new(),
    };

    let control_ids: BTreeSet<&str> = before
        .summaries
        .iter()
        .chain(after.summaries.iter())
        .map(|s| s.control_id.as_str())
        .collect();

    control_ids
        .into_iter()
        .map(|control_id| {
            let b = before
                .summaries
                .iter()
                .find(|s| s.control_id == control_id)
                .cloned()
                .unwrap_or_else(|| empty(control_id));
            let a = after
                .summaries
                .iter()
                .find(|s| s.control_id == control_id)
                .cloned()
                .unwrap_or_else(|| empty(control_id));
            diff_summaries(&b, &a)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ControlStatus;
    use crate::record::{create_cycle_record, CYCLE_RECORD_SCHEMA_VERSION};
    use std::collections::BTreeMap;

    const CYCLE_TS: &str = "2026-03-01T06:05:00Z";

    fn make_summary(control: &str, failing: &[&str], total: u32) -> ControlSummary {
        let failing_resources: Vec<String> = failing.iter().map(|s| (*s).to_owned()).collect();
        let resources_failing = failing_resources.len() as u32;
        ControlSummary {
            control_id: control.to_owned(),
            status: if total == 0 {
                ControlStatus::NoResources
            } else if resources_failing == 0 {
                ControlStatus::Compliant
            } else {
                ControlStatus::NonCompliant
            },
            resources_total: total,
            resources_passing: total - resources_failing,
            resources_failing,
            failing_resources,
            computed_at: CYCLE_TS.to_owned(),
        }
    }

    fn make_record(summaries: Vec<ControlSummary>) -> CycleRecord {
        create_cycle_record(
            "cycle-test",
            "0.4.0",
            Vec::new(),
            summaries,
            BTreeMap::new(),
            CYCLE_TS,
        )
    }

    #[test]
    fn newly_failing_and_newly_passing() {
        let before = make_summary("CC6.6", &["bucket-1", "bucket-2"], 4);
        let after = make_summary("CC6.6", &["bucket-2", "bucket-3"], 4);

        let drift = diff_summaries(&before, &after);
        assert_eq!(drift.newly_failing, vec!["bucket-3"]);
        assert_eq!(drift.newly_passing, vec!["bucket-1"]);
        assert!(!drift.is_empty());
    }

    #[test]
    fn identical_summaries_produce_empty_drift() {
        let before = make_summary("CC6.6", &["bucket-1"], 3);
        let after = make_summary("CC6.6", &["bucket-1"], 3);

        let drift = diff_summaries(&before, &after);
        assert!(drift.newly_failing.is_empty());
        assert!(drift.newly_passing.is_empty());
        assert!(drift.is_empty());
    }

    #[test]
    fn drift_output_is_sorted() {
        let before = make_summary("CC6.6", &[], 3);
        let after = make_summary("CC6.6", &["bucket-z", "bucket-a"], 3);

        let drift = diff_summaries(&before, &after);
        assert_eq!(drift.newly_failing, vec!["bucket-a", "bucket-z"]);
    }

    #[test]
    fn identical_cycles_produce_all_empty_drift() {
        let record = make_record(vec![
            make_summary("CC6.6", &["bucket-1"], 3),
            make_summary("CC7.1", &[], 1),
        ]);

        let drift = diff_cycles(&record, &record);
        assert_eq!(drift.len(), 2);
        assert!(drift.iter().all(ControlDrift::is_empty));
    }

    #[test]
    fn cycles_cover_union_of_controls() {
        let before = make_record(vec![make_summary("CC6.6", &["bucket-1"], 2)]);
        let after = make_record(vec![make_summary("CC7.1", &["trail-1"], 1)]);

        let drift = diff_cycles(&before, &after);
        let ids: Vec<&str> = drift.iter().map(|d| d.control_id.as_str()).collect();
        assert_eq!(ids, vec!["CC6.6", "CC7.1"]);

        // CC6.6 disappeared: all previous failures now read as newly passing.
        assert_eq!(drift[0].newly_passing, vec!["bucket-1"]);
        assert!(drift[0].newly_failing.is_empty());

        // CC7.1 appeared with a failure: newly failing.
        assert_eq!(drift[1].newly_failing, vec!["trail-1"]);
        assert!(drift[1].newly_passing.is_empty());
    }

    #[test]
    fn drift_display() {
        let before = make_summary("CC6.6", &[], 2);
        let after = make_summary("CC6.6", &["bucket-1"], 2);
        let drift = diff_summaries(&before, &after);
        let display = drift.to_string();
        assert!(display.contains("CC6.6"));
        assert!(display.contains("+1 failing"));
    }

    #[test]
    fn record_schema_version_constant() {
        assert_eq!(CYCLE_RECORD_SCHEMA_VERSION, "1.0.0");
    }
}

//! Evaluation cycle orchestrator.
//!
//! The [`EvalEngine`] coordinates one full evaluation cycle:
//!
//! 1. **Load** rules from YAML (or accept them programmatically).
//! 2. **Evaluate** every rule against the cycle's snapshot set.
//! 3. **Aggregate** the complete verdict set into per-control summaries --
//!    aggregation only runs once every evaluation has finished, so a
//!    summary always reflects the full cycle.
//! 4. **Return** a [`CycleResult`] with deterministically sorted output.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use argus_core::engine::EvalEngine;
//!
//! let mut engine = EvalEngine::new();
//! engine.load_rules(Path::new("rules/builtin")).unwrap();
//! let snapshots = argus_snapshot::load_snapshots_from_dir(Path::new("snapshots/")).unwrap();
//! let result = engine.evaluate(&snapshots, &[], "2026-03-01T06:05:00Z");
//! println!("{} verdicts across {} controls", result.verdicts.len(), result.summaries.len());
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info};

use argus_eval::{aggregate_cycle, evaluate_cycle, ControlSummary, Verdict};
use argus_rules::declarative::DeclarativeRuleLoader;
use argus_rules::Rule;
use argus_snapshot::ResourceSnapshot;

use crate::CoreError;

// ---------------------------------------------------------------------------
// CycleResult
// ---------------------------------------------------------------------------

/// The result of running one evaluation cycle.
#[derive(Debug, Clone)]
pub struct CycleResult {
    /// All verdicts, sorted by `(control_id, rule_id, resource_id)`.
    pub verdicts: Vec<Verdict>,
    /// Per-control summaries, sorted by control id.
    pub summaries: Vec<ControlSummary>,
    /// Number of distinct snapshots that received at least one verdict.
    pub resources_evaluated: u32,
    /// Number of rules that were evaluated this cycle.
    pub rules_evaluated: u32,
}

// ---------------------------------------------------------------------------
// EvalEngine
// ---------------------------------------------------------------------------

/// The evaluation cycle orchestrator.
///
/// Holds the loaded rule set. Call [`evaluate`](Self::evaluate) to run one
/// cycle against a snapshot set.
#[derive(Debug, Default)]
pub struct EvalEngine {
    /// Loaded compliance rules to evaluate each cycle.
    rules: Vec<Rule>,
}

impl EvalEngine {
    /// Creates a new engine with no rules loaded.
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Loads declarative rules from a directory of YAML files.
    ///
    /// Walks the directory recursively; loaded rules are appended to any
    /// previously loaded rules.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Rule`] if rule loading fails (I/O, YAML parsing,
    /// or validation errors).
    pub fn load_rules(&mut self, rules_dir: &Path) -> Result<(), CoreError> {
        let loader = DeclarativeRuleLoader;
        let loaded = loader
            .load_from_dir(rules_dir)
            .map_err(|e| CoreError::Rule(e.to_string()))?;
        info!(count = loaded.len(), dir = %rules_dir.display(), "loaded declarative rules");
        self.rules.extend(loaded);
        Ok(())
    }

    /// Adds rules directly (useful for testing or programmatic rule
    /// creation).
    pub fn add_rules(&mut self, rules: Vec<Rule>) {
        self.rules.extend(rules);
    }

    /// Returns the loaded rules.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Runs one evaluation cycle over `snapshots`.
    ///
    /// `expected_controls` lists controls that must be summarized even when
    /// no verdicts cover them (typically the ids from a
    /// [`ControlCatalog`](crate::controls::ControlCatalog)); controls mapped
    /// by the loaded rules are always included, so a rule whose target type
    /// has no snapshots still yields a `NO_RESOURCES` summary.
    ///
    /// `evaluated_at` is the cycle timestamp stamped onto verdicts and
    /// summaries; passing it in keeps the engine deterministic.
    #[must_use]
    pub fn evaluate(
        &self,
        snapshots: &[ResourceSnapshot],
        expected_controls: &[String],
        evaluated_at: &str,
    ) -> CycleResult {
        info!(
            rules = self.rules.len(),
            snapshots = snapshots.len(),
            "evaluation cycle starting"
        );

        // Step 1: Evaluate every rule against the snapshot set.
        let verdicts = evaluate_cycle(&self.rules, snapshots, evaluated_at);

        // Step 2: Collect the controls the cycle must summarize -- the
        // caller's expectations plus every control the rule set maps to.
        let controls: Vec<String> = expected_controls
            .iter()
            .cloned()
            .chain(self.rules.iter().map(|r| r.control_id.clone()))
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect();

        // Step 3: Aggregate. The verdict set is complete at this point;
        // summaries for this cycle can never see a partial cycle.
        let summaries = aggregate_cycle(&verdicts, &controls, evaluated_at);

        let resources_evaluated = verdicts
            .iter()
            .map(|v| (&v.resource_type, &v.resource_id))
            .collect::<BTreeSet<_>>()
            .len() as u32;

        debug!(
            verdicts = verdicts.len(),
            controls = summaries.len(),
            "aggregation complete"
        );

        info!(
            verdicts = verdicts.len(),
            resources_evaluated,
            failing_controls = summaries.iter().filter(|s| s.status.is_non_compliant()).count(),
            "evaluation cycle complete"
        );

        CycleResult {
            verdicts,
            summaries,
            resources_evaluated,
            rules_evaluated: self.rules.len() as u32,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use argus_eval::ControlStatus;
    use argus_rules::{Predicate, ResourceType, Severity};
    use argus_snapshot::AttributeMap;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    const CYCLE_TS: &str = "2026-03-01T06:05:00Z";

    fn bucket_rule() -> Rule {
        Rule {
            id: "argus/soc2/s3-no-public-read".to_owned(),
            name: "S3 buckets must not allow public read".to_owned(),
            description: "Detects publicly readable buckets".to_owned(),
            severity: Severity::Critical,
            resource_type: ResourceType::S3Bucket,
            control_id: "CC6.6".to_owned(),
            predicate: Predicate::AttributeEquals {
                attribute: "public_read".to_owned(),
                expected: json!(false),
            },
            remediation: "Block public access.".to_owned(),
            references: vec![],
            tags: vec![],
            version: "1.0.0".to_owned(),
        }
    }

    fn bucket_snapshot(id: &str, public_read: bool) -> ResourceSnapshot {
        let mut attributes = AttributeMap::new();
        attributes.insert("public_read".to_owned(), json!(public_read));
        ResourceSnapshot {
            resource_id: id.to_owned(),
            resource_type: ResourceType::S3Bucket,
            attributes,
            captured_at: "2026-03-01T06:00:00Z".to_owned(),
        }
    }

    #[test]
    fn engine_evaluates_and_aggregates() {
        let mut engine = EvalEngine::new();
        engine.add_rules(vec![bucket_rule()]);

        let snapshots = vec![
            bucket_snapshot("bucket-1", true),
            bucket_snapshot("bucket-2", false),
        ];
        let result = engine.evaluate(&snapshots, &[], CYCLE_TS);

        assert_eq!(result.verdicts.len(), 2);
        assert_eq!(result.resources_evaluated, 2);
        assert_eq!(result.rules_evaluated, 1);
        assert_eq!(result.summaries.len(), 1);
        assert_eq!(result.summaries[0].status, ControlStatus::NonCompliant);
        assert_eq!(result.summaries[0].failing_resources, vec!["bucket-1"]);
    }

    #[test]
    fn rule_controls_summarized_even_without_snapshots() {
        let mut engine = EvalEngine::new();
        let trail_rule = Rule {
            id: "argus/soc2/cloudtrail-logging".to_owned(),
            resource_type: ResourceType::CloudTrailTrail,
            control_id: "CC7.1".to_owned(),
            predicate: Predicate::AttributeEquals {
                attribute: "is_logging".to_owned(),
                expected: json!(true),
            },
            ..bucket_rule()
        };
        engine.add_rules(vec![trail_rule]);

        let result = engine.evaluate(&[bucket_snapshot("bucket-1", false)], &[], CYCLE_TS);
        assert!(result.verdicts.is_empty());
        assert_eq!(result.summaries.len(), 1);
        assert_eq!(result.summaries[0].control_id, "CC7.1");
        assert_eq!(result.summaries[0].status, ControlStatus::NoResources);
    }

    #[test]
    fn expected_controls_merge_with_rule_controls() {
        let mut engine = EvalEngine::new();
        engine.add_rules(vec![bucket_rule()]);

        let expected = vec!["CC9.2".to_owned(), "CC6.6".to_owned()];
        let result = engine.evaluate(&[bucket_snapshot("bucket-1", false)], &expected, CYCLE_TS);

        let ids: Vec<&str> = result.summaries.iter().map(|s| s.control_id.as_str()).collect();
        assert_eq!(ids, vec!["CC6.6", "CC9.2"]);
        assert_eq!(result.summaries[1].status, ControlStatus::NoResources);
    }

    #[test]
    fn engine_with_no_rules_yields_empty_cycle() {
        let engine = EvalEngine::new();
        let result = engine.evaluate(&[bucket_snapshot("bucket-1", true)], &[], CYCLE_TS);
        assert!(result.verdicts.is_empty());
        assert!(result.summaries.is_empty());
        assert_eq!(result.resources_evaluated, 0);
    }

    #[test]
    fn load_rules_from_yaml_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("s3.yaml"),
            r#"
id: argus/soc2/s3-no-public-read
name: S3 buckets must not allow public read
description: Detects publicly readable buckets
severity: critical
resource_type: S3_BUCKET
control_id: CC6.6
predicate:
  kind: attribute_equals
  attribute: public_read
  expected: false
remediation: Block public access.
version: 1.0.0
"#,
        )
        .unwrap();

        let mut engine = EvalEngine::new();
        engine.load_rules(dir.path()).unwrap();
        assert_eq!(engine.rules().len(), 1);

        let result = engine.evaluate(&[bucket_snapshot("bucket-1", true)], &[], CYCLE_TS);
        assert_eq!(result.verdicts.len(), 1);
        assert!(!result.verdicts[0].passed);
    }

    #[test]
    fn load_rules_propagates_loader_errors() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.yaml"), "id: [").unwrap();

        let mut engine = EvalEngine::new();
        let err = engine.load_rules(dir.path()).unwrap_err();
        assert!(matches!(err, CoreError::Rule(_)));
    }
}

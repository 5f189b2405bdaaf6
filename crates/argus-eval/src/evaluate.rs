//! The rule evaluator.
//!
//! [`evaluate_rule`] applies one rule to a set of snapshots and produces one
//! [`Verdict`] per snapshot of the rule's target type. [`evaluate_cycle`]
//! runs every rule of a cycle and returns the deterministically sorted
//! verdict set.
//!
//! Evaluation is pure: no I/O, no clock reads, no shared mutable state.
//! Missing or malformed attributes fail the single verdict they affect, with
//! evidence identifying the field; they never abort evaluation of other
//! snapshots or other rules.

use std::collections::BTreeMap;

use tracing::debug;

use argus_rules::{Predicate, Rule};
use argus_snapshot::{AttributeMap, ResourceSnapshot};

use crate::verdict::Verdict;

// ---------------------------------------------------------------------------
// Predicate checking
// ---------------------------------------------------------------------------

/// Applies a predicate to a snapshot's attributes.
///
/// Absent attributes fail every variant except [`Predicate::AttributeAbsent`]
/// (where absence is the passing state). A [`Predicate::NumericThreshold`]
/// over a non-numeric value fails rather than erroring: the raw value lands
/// in the evidence, where an auditor can see what was actually captured.
fn check_predicate(predicate: &Predicate, attributes: &AttributeMap) -> bool {
    match predicate {
        Predicate::AttributeEquals { attribute, expected } => {
            attributes.get(attribute) == Some(expected)
        }
        Predicate::AttributeAbsent { attribute } => !attributes.contains_key(attribute),
        Predicate::NumericThreshold { attribute, op, limit } => {
            match attributes.get(attribute).and_then(serde_json::Value::as_f64) {
                Some(actual) => op.compare(actual, *limit),
                None => false,
            }
        }
        Predicate::SetMembership { attribute, allowed, negate } => match attributes.get(attribute) {
            Some(value) => allowed.contains(value) != *negate,
            None => false,
        },
        Predicate::AllOf { predicates } => {
            predicates.iter().all(|p| check_predicate(p, attributes))
        }
    }
}

/// Extracts the evidence for a verdict: the snapshot's values for every
/// attribute the predicate reads, with `{"missing": true}` markers for
/// attributes the snapshot lacked.
fn extract_evidence(
    predicate: &Predicate,
    attributes: &AttributeMap,
) -> BTreeMap<String, serde_json::Value> {
    let mut evidence = BTreeMap::new();
    for name in predicate.required_attributes() {
        let value = match attributes.get(name) {
            Some(v) => v.clone(),
            None => serde_json::json!({ "missing": true }),
        };
        evidence.insert(name.to_owned(), value);
    }
    evidence
}

// ---------------------------------------------------------------------------
// evaluate_rule
// ---------------------------------------------------------------------------

/// Evaluates one rule against a set of snapshots.
///
/// Produces exactly one [`Verdict`] per snapshot whose `resource_type`
/// matches the rule's target; other snapshots are ignored. `evaluated_at` is
/// the cycle timestamp stamped onto every verdict -- it is an input so that
/// evaluation stays deterministic.
#[must_use]
pub fn evaluate_rule(
    rule: &Rule,
    snapshots: &[ResourceSnapshot],
    evaluated_at: &str,
) -> Vec<Verdict> {
    let mut verdicts = Vec::new();

    for snapshot in snapshots {
        if snapshot.resource_type != rule.resource_type {
            continue;
        }

        let passed = check_predicate(&rule.predicate, &snapshot.attributes);
        let evidence = extract_evidence(&rule.predicate, &snapshot.attributes);
        let fingerprint = Verdict::compute_fingerprint(
            &rule.id,
            &rule.version,
            &snapshot.resource_id,
            passed,
            &evidence,
        );

        verdicts.push(Verdict {
            fingerprint,
            rule_id: rule.id.clone(),
            control_id: rule.control_id.clone(),
            resource_id: snapshot.resource_id.clone(),
            resource_type: snapshot.resource_type,
            severity: rule.severity,
            passed,
            evidence,
            evaluated_at: evaluated_at.to_owned(),
        });
    }

    verdicts
}

// ---------------------------------------------------------------------------
// evaluate_cycle
// ---------------------------------------------------------------------------

/// Evaluates every rule against the full snapshot set for one cycle.
///
/// Returns all verdicts sorted by `(control_id, rule_id, resource_id)`.
/// Each `(rule, snapshot)` pair is independent; a failing resource never
/// affects the verdict of another, and a rule whose target type has no
/// snapshots simply contributes zero verdicts.
#[must_use]
pub fn evaluate_cycle(
    rules: &[Rule],
    snapshots: &[ResourceSnapshot],
    evaluated_at: &str,
) -> Vec<Verdict> {
    let mut all_verdicts = Vec::new();

    for rule in rules {
        let verdicts = evaluate_rule(rule, snapshots, evaluated_at);
        if verdicts.is_empty() {
            debug!(
                rule_id = %rule.id,
                resource_type = %rule.resource_type,
                "no snapshots of the rule's target type"
            );
        }
        all_verdicts.extend(verdicts);
    }

    all_verdicts.sort();
    all_verdicts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use argus_rules::{ResourceType, Severity, ThresholdOp};
    use serde_json::json;

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

    const CYCLE_TS: &str = "2026-03-01T06:05:00Z";

    // -------------------------------------------------------------------
    // Worked examples from the data-contract
    // -------------------------------------------------------------------

    #[test]
    fn public_bucket_fails_with_evidence() {
        let rule = bucket_rule();
        let snaps = vec![bucket_snapshot("bucket-1", true)];

        let verdicts = evaluate_rule(&rule, &snaps, CYCLE_TS);
        assert_eq!(verdicts.len(), 1);
        let v = &verdicts[0];
        assert!(!v.passed);
        assert_eq!(v.resource_id, "bucket-1");
        assert_eq!(v.control_id, "CC6.6");
        assert_eq!(v.evidence.get("public_read"), Some(&json!(true)));
        assert_eq!(v.evaluated_at, CYCLE_TS);
    }

    #[test]
    fn private_bucket_passes() {
        let rule = bucket_rule();
        let snaps = vec![bucket_snapshot("bucket-2", false)];

        let verdicts = evaluate_rule(&rule, &snaps, CYCLE_TS);
        assert_eq!(verdicts.len(), 1);
        assert!(verdicts[0].passed);
        assert_eq!(verdicts[0].evidence.get("public_read"), Some(&json!(false)));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let rule = bucket_rule();
        let snaps = vec![bucket_snapshot("bucket-1", true)];

        let first = evaluate_rule(&rule, &snaps, CYCLE_TS);
        let second = evaluate_rule(&rule, &snaps, CYCLE_TS);
        assert_eq!(first, second);
        assert_eq!(first[0].fingerprint, second[0].fingerprint);
    }

    // -------------------------------------------------------------------
    // Missing / malformed attributes
    // -------------------------------------------------------------------

    #[test]
    fn missing_attribute_fails_single_verdict_only() {
        let rule = bucket_rule();
        let mut bare = bucket_snapshot("bucket-bare", false);
        bare.attributes.clear();
        let snaps = vec![bare, bucket_snapshot("bucket-ok", false)];

        let verdicts = evaluate_rule(&rule, &snaps, CYCLE_TS);
        assert_eq!(verdicts.len(), 2);

        let bare_v = verdicts.iter().find(|v| v.resource_id == "bucket-bare").unwrap();
        assert!(!bare_v.passed);
        assert_eq!(
            bare_v.evidence.get("public_read"),
            Some(&json!({ "missing": true }))
        );

        let ok_v = verdicts.iter().find(|v| v.resource_id == "bucket-ok").unwrap();
        assert!(ok_v.passed, "missing attribute on one snapshot must not affect others");
    }

    #[test]
    fn non_numeric_value_fails_threshold() {
        let rule = Rule {
            predicate: Predicate::NumericThreshold {
                attribute: "minimum_password_length".to_owned(),
                op: ThresholdOp::Ge,
                limit: 14.0,
            },
            resource_type: ResourceType::IamPolicy,
            control_id: "CC6.1".to_owned(),
            ..bucket_rule()
        };
        let mut snap = bucket_snapshot("account-policy", false);
        snap.resource_type = ResourceType::IamPolicy;
        snap.attributes.clear();
        snap.attributes
            .insert("minimum_password_length".to_owned(), json!("fourteen"));

        let verdicts = evaluate_rule(&rule, &[snap], CYCLE_TS);
        assert_eq!(verdicts.len(), 1);
        assert!(!verdicts[0].passed);
        // The malformed raw value is preserved as evidence.
        assert_eq!(
            verdicts[0].evidence.get("minimum_password_length"),
            Some(&json!("fourteen"))
        );
    }

    // -------------------------------------------------------------------
    // Predicate variants
    // -------------------------------------------------------------------

    #[test]
    fn attribute_absent_passes_when_missing() {
        let mut attributes = AttributeMap::new();
        attributes.insert("other".to_owned(), json!(1));
        assert!(check_predicate(
            &Predicate::AttributeAbsent { attribute: "public_acl".to_owned() },
            &attributes
        ));
        attributes.insert("public_acl".to_owned(), json!("grant"));
        assert!(!check_predicate(
            &Predicate::AttributeAbsent { attribute: "public_acl".to_owned() },
            &attributes
        ));
    }

    #[test]
    fn numeric_threshold_variants() {
        let mut attributes = AttributeMap::new();
        attributes.insert("max_password_age".to_owned(), json!(90));

        let le = Predicate::NumericThreshold {
            attribute: "max_password_age".to_owned(),
            op: ThresholdOp::Le,
            limit: 90.0,
        };
        assert!(check_predicate(&le, &attributes));

        let lt = Predicate::NumericThreshold {
            attribute: "max_password_age".to_owned(),
            op: ThresholdOp::Lt,
            limit: 90.0,
        };
        assert!(!check_predicate(&lt, &attributes));
    }

    #[test]
    fn set_membership_and_negation() {
        let mut attributes = AttributeMap::new();
        attributes.insert("state".to_owned(), json!("available"));

        let member = Predicate::SetMembership {
            attribute: "state".to_owned(),
            allowed: vec![json!("in-use")],
            negate: false,
        };
        assert!(!check_predicate(&member, &attributes));

        let negated = Predicate::SetMembership {
            attribute: "state".to_owned(),
            allowed: vec![json!("available")],
            negate: true,
        };
        assert!(!check_predicate(&negated, &attributes));

        attributes.insert("state".to_owned(), json!("in-use"));
        assert!(check_predicate(&member, &attributes));
        assert!(check_predicate(&negated, &attributes));
    }

    #[test]
    fn all_of_requires_every_nested_predicate() {
        let mut attributes = AttributeMap::new();
        attributes.insert("minimum_password_length".to_owned(), json!(14));
        attributes.insert("require_symbols".to_owned(), json!(true));

        let all = Predicate::AllOf {
            predicates: vec![
                Predicate::NumericThreshold {
                    attribute: "minimum_password_length".to_owned(),
                    op: ThresholdOp::Ge,
                    limit: 14.0,
                },
                Predicate::AttributeEquals {
                    attribute: "require_symbols".to_owned(),
                    expected: json!(true),
                },
            ],
        };
        assert!(check_predicate(&all, &attributes));

        attributes.insert("require_symbols".to_owned(), json!(false));
        assert!(!check_predicate(&all, &attributes));
    }

    #[test]
    fn all_of_evidence_covers_every_required_attribute() {
        let rule = Rule {
            predicate: Predicate::AllOf {
                predicates: vec![
                    Predicate::NumericThreshold {
                        attribute: "minimum_password_length".to_owned(),
                        op: ThresholdOp::Ge,
                        limit: 14.0,
                    },
                    Predicate::AttributeEquals {
                        attribute: "require_symbols".to_owned(),
                        expected: json!(true),
                    },
                ],
            },
            resource_type: ResourceType::IamPolicy,
            control_id: "CC6.1".to_owned(),
            ..bucket_rule()
        };

        let mut snap = bucket_snapshot("account-policy", false);
        snap.resource_type = ResourceType::IamPolicy;
        snap.attributes.clear();
        snap.attributes.insert("minimum_password_length".to_owned(), json!(8));

        let verdicts = evaluate_rule(&rule, &[snap], CYCLE_TS);
        let v = &verdicts[0];
        assert!(!v.passed);
        assert_eq!(v.evidence.get("minimum_password_length"), Some(&json!(8)));
        assert_eq!(
            v.evidence.get("require_symbols"),
            Some(&json!({ "missing": true }))
        );
    }

    // -------------------------------------------------------------------
    // evaluate_cycle
    // -------------------------------------------------------------------

    #[test]
    fn cycle_skips_mismatched_resource_types() {
        let rule = bucket_rule();
        let mut user = bucket_snapshot("deploy-bot", false);
        user.resource_type = ResourceType::IamUser;
        let snaps = vec![user, bucket_snapshot("bucket-1", true)];

        let verdicts = evaluate_cycle(&[rule], &snaps, CYCLE_TS);
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].resource_id, "bucket-1");
    }

    #[test]
    fn cycle_verdicts_are_sorted() {
        let bucket = bucket_rule();
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

        let mut trail = bucket_snapshot("trail-main", false);
        trail.resource_type = ResourceType::CloudTrailTrail;
        trail.attributes.clear();
        trail.attributes.insert("is_logging".to_owned(), json!(true));

        let snaps = vec![
            trail,
            bucket_snapshot("bucket-b", true),
            bucket_snapshot("bucket-a", false),
        ];

        // Rule order reversed relative to control order on purpose.
        let verdicts = evaluate_cycle(&[trail_rule, bucket], &snaps, CYCLE_TS);
        let keys: Vec<(&str, &str)> = verdicts
            .iter()
            .map(|v| (v.control_id.as_str(), v.resource_id.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("CC6.6", "bucket-a"),
                ("CC6.6", "bucket-b"),
                ("CC7.1", "trail-main"),
            ]
        );
    }

    #[test]
    fn cycle_with_no_matching_snapshots_yields_no_verdicts() {
        let trail_rule = Rule {
            resource_type: ResourceType::CloudTrailTrail,
            control_id: "CC7.1".to_owned(),
            ..bucket_rule()
        };
        let snaps = vec![bucket_snapshot("bucket-1", false)];
        let verdicts = evaluate_cycle(&[trail_rule], &snaps, CYCLE_TS);
        assert!(verdicts.is_empty());
    }
}

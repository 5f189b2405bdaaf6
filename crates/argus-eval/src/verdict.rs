//! The [`Verdict`] type -- the pass/fail outcome of one rule applied to one
//! resource snapshot, with content-based fingerprinting.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use argus_rules::Severity;
use argus_snapshot::ResourceType;

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// The outcome of evaluating one rule against one resource snapshot.
///
/// Verdicts are never mutated after creation; the history of verdicts for a
/// `(rule, resource)` pair across cycles is append-only. Every field that
/// feeds the fingerprint is deterministic, so identical `(rule, snapshot)`
/// inputs always produce byte-identical verdicts.
///
/// Verdicts are deterministically ordered by
/// `(control_id, rule_id, resource_id)` for stable, reproducible output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Content-based fingerprint: SHA-256 hex digest of the rule id, rule
    /// version, resource id, pass flag, and canonical evidence.
    pub fingerprint: String,

    /// The rule that produced this verdict.
    pub rule_id: String,

    /// The SOC 2 control the rule maps to.
    pub control_id: String,

    /// The resource snapshot this verdict describes.
    pub resource_id: String,

    /// The kind of resource evaluated.
    pub resource_type: ResourceType,

    /// Severity inherited from the rule; meaningful when `passed` is false.
    pub severity: Severity,

    /// Whether the resource satisfied the rule's predicate.
    pub passed: bool,

    /// The attribute subset that determined the outcome. Attributes the
    /// predicate required but the snapshot lacked appear as
    /// `{"missing": true}` objects.
    pub evidence: BTreeMap<String, serde_json::Value>,

    /// RFC 3339 timestamp of the evaluation cycle that produced this
    /// verdict. Supplied by the caller, never sampled during evaluation.
    pub evaluated_at: String,
}

impl Verdict {
    /// Computes the deterministic fingerprint for a verdict's content.
    ///
    /// The digest covers rule identity (id and version), the resource id,
    /// the pass flag, and the canonical JSON form of the evidence. The
    /// evaluation timestamp is deliberately excluded so re-running a cycle
    /// over unchanged inputs reproduces the same fingerprints.
    #[must_use]
    pub fn compute_fingerprint(
        rule_id: &str,
        rule_version: &str,
        resource_id: &str,
        passed: bool,
        evidence: &BTreeMap<String, serde_json::Value>,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(rule_id.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(rule_version.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(resource_id.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(if passed { b"pass" as &[u8] } else { b"fail" });
        hasher.update(b"\x1f");
        // BTreeMap gives stable key order, so this serialization is canonical.
        let evidence_json =
            serde_json::to_string(evidence).unwrap_or_else(|_| String::from("{}"));
        hasher.update(evidence_json.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Deterministic ordering by `(control_id, rule_id, resource_id)`.
impl Ord for Verdict {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.control_id, &self.rule_id, &self.resource_id).cmp(&(
            &other.control_id,
            &other.rule_id,
            &other.resource_id,
        ))
    }
}

impl PartialOrd for Verdict {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} on {} '{}': {}",
            self.control_id,
            self.rule_id,
            self.resource_type,
            self.resource_id,
            if self.passed { "PASS" } else { "FAIL" }
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

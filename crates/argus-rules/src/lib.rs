//! Argus Rules -- the declarative compliance rule model.
//!
//! This crate defines the [`Rule`] struct representing a single control
//! check, along with the closed [`Predicate`] set rules are built from and
//! validation logic. Predicates are data, not code: every check is one of a
//! small number of tagged variants so that rule behaviour stays auditable
//! and evaluation stays pure.
//!
//! # Note on shared enums
//!
//! [`ResourceType`] is re-exported from `argus-snapshot` (the input-domain
//! crate) to avoid a circular dependency; [`Severity`] is defined here
//! because every downstream crate depends on `argus-rules`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod declarative;

pub use argus_snapshot::ResourceType;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Severity of a control check, ordered from highest to lowest impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Critical -- a failure is an immediate audit blocker.
    Critical,
    /// High -- should be remediated before the next audit window.
    High,
    /// Medium -- should be remediated in a timely manner.
    Medium,
    /// Low -- minor posture issue, fix when convenient.
    Low,
    /// Informational -- advisory only.
    Info,
}

impl Severity {
    /// Returns a numeric score for this severity level.
    ///
    /// Higher values indicate higher severity:
    /// - `Critical` = 4
    /// - `High` = 3
    /// - `Medium` = 2
    /// - `Low` = 1
    /// - `Info` = 0
    #[must_use]
    pub const fn numeric_score(self) -> u8 {
        match self {
            Self::Critical => 4,
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
            Self::Info => 0,
        }
    }

    /// Returns all severity variants in descending order (Critical first).
    #[must_use]
    pub const fn all() -> &'static [Severity] {
        &[
            Self::Critical,
            Self::High,
            Self::Medium,
            Self::Low,
            Self::Info,
        ]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// ThresholdOp
// ---------------------------------------------------------------------------

/// Comparison operator for [`Predicate::NumericThreshold`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdOp {
    /// Attribute value must be strictly less than the limit.
    Lt,
    /// Attribute value must be less than or equal to the limit.
    Le,
    /// Attribute value must be strictly greater than the limit.
    Gt,
    /// Attribute value must be greater than or equal to the limit.
    Ge,
    /// Attribute value must equal the limit.
    Eq,
}

impl ThresholdOp {
    /// Applies the comparison to `(actual, limit)`.
    #[must_use]
    pub fn compare(self, actual: f64, limit: f64) -> bool {
        match self {
            Self::Lt => actual < limit,
            Self::Le => actual <= limit,
            Self::Gt => actual > limit,
            Self::Ge => actual >= limit,
            Self::Eq => (actual - limit).abs() < f64::EPSILON,
        }
    }
}

impl fmt::Display for ThresholdOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Eq => "eq",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Predicate
// ---------------------------------------------------------------------------

/// Maximum nesting depth allowed for [`Predicate::AllOf`].
const MAX_PREDICATE_DEPTH: u32 = 8;

/// A declarative check over a snapshot's attribute map.
///
/// The variant set is closed on purpose: rules stay auditable because each
/// check is data with fixed semantics rather than arbitrary executable code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Passes when the attribute is present and equals `expected` exactly.
    AttributeEquals {
        /// Attribute name to read.
        attribute: String,
        /// Expected JSON value.
        expected: serde_json::Value,
    },

    /// Passes when the attribute is NOT present in the snapshot.
    AttributeAbsent {
        /// Attribute name that must be missing.
        attribute: String,
    },

    /// Passes when the attribute is a number satisfying `op` against `limit`.
    NumericThreshold {
        /// Attribute name to read.
        attribute: String,
        /// Comparison operator.
        op: ThresholdOp,
        /// Comparison limit.
        limit: f64,
    },

    /// Passes when the attribute value is (or is not, with `negate`) a
    /// member of `allowed`.
    SetMembership {
        /// Attribute name to read.
        attribute: String,
        /// The membership set.
        allowed: Vec<serde_json::Value>,
        /// When `true`, the attribute value must NOT be in `allowed`.
        #[serde(default)]
        negate: bool,
    },

    /// Passes when every nested predicate passes.
    AllOf {
        /// Nested predicates, all of which must pass.
        predicates: Vec<Predicate>,
    },
}

impl Predicate {
    /// Collects the attribute names this predicate reads, in sorted order.
    ///
    /// Drives evidence extraction: a verdict's evidence is exactly the
    /// snapshot's values for these attributes.
    #[must_use]
    pub fn required_attributes(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_attributes(&mut names);
        names.sort_unstable();
        names.dedup();
        names
    }

    fn collect_attributes<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::AttributeEquals { attribute, .. }
            | Self::AttributeAbsent { attribute }
            | Self::NumericThreshold { attribute, .. }
            | Self::SetMembership { attribute, .. } => out.push(attribute),
            Self::AllOf { predicates } => {
                for p in predicates {
                    p.collect_attributes(out);
                }
            }
        }
    }

    /// Returns the nesting depth of this predicate (leaf = 1).
    #[must_use]
    pub fn depth(&self) -> u32 {
        match self {
            Self::AllOf { predicates } => {
                1 + predicates.iter().map(Self::depth).max().unwrap_or(0)
            }
            _ => 1,
        }
    }

    /// Validates structural constraints on this predicate.
    ///
    /// # Errors
    ///
    /// - [`RuleError::EmptyAttribute`] if any leaf names an empty attribute.
    /// - [`RuleError::EmptyPredicateSet`] if an `AllOf` or `SetMembership`
    ///   set is empty.
    /// - [`RuleError::NonFiniteLimit`] if a threshold limit is NaN/infinite.
    /// - [`RuleError::PredicateTooDeep`] if nesting exceeds the cap.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.depth() > MAX_PREDICATE_DEPTH {
            return Err(RuleError::PredicateTooDeep {
                depth: self.depth(),
                max: MAX_PREDICATE_DEPTH,
            });
        }
        self.validate_inner()
    }

    fn validate_inner(&self) -> Result<(), RuleError> {
        match self {
            Self::AttributeEquals { attribute, .. } | Self::AttributeAbsent { attribute } => {
                if attribute.is_empty() {
                    return Err(RuleError::EmptyAttribute);
                }
            }
            Self::NumericThreshold { attribute, limit, .. } => {
                if attribute.is_empty() {
                    return Err(RuleError::EmptyAttribute);
                }
                if !limit.is_finite() {
                    return Err(RuleError::NonFiniteLimit { limit: *limit });
                }
            }
            Self::SetMembership { attribute, allowed, .. } => {
                if attribute.is_empty() {
                    return Err(RuleError::EmptyAttribute);
                }
                if allowed.is_empty() {
                    return Err(RuleError::EmptyPredicateSet);
                }
            }
            Self::AllOf { predicates } => {
                if predicates.is_empty() {
                    return Err(RuleError::EmptyPredicateSet);
                }
                for p in predicates {
                    p.validate_inner()?;
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RuleError
// ---------------------------------------------------------------------------

/// Errors arising from rule validation.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The rule `id` field is empty.
    #[error("rule id must not be empty")]
    EmptyId,

    /// The `control_id` does not look like a control identifier.
    #[error("invalid control_id '{control_id}' for rule '{rule_id}': expected e.g. CC6.1")]
    InvalidControlId {
        /// The rule ID that failed validation.
        rule_id: String,
        /// The invalid control identifier.
        control_id: String,
    },

    /// The rule `version` field is not valid SemVer.
    #[error("invalid version '{version}' for rule '{rule_id}': expected SemVer (e.g. 1.0.0)")]
    InvalidVersion {
        /// The rule ID that failed validation.
        rule_id: String,
        /// The invalid version string.
        version: String,
    },

    /// A predicate leaf names an empty attribute.
    #[error("predicate attribute name must not be empty")]
    EmptyAttribute,

    /// An `all_of` or `set_membership` collection is empty.
    #[error("predicate collection must not be empty")]
    EmptyPredicateSet,

    /// A numeric threshold limit is NaN or infinite.
    #[error("numeric threshold limit must be finite, got {limit}")]
    NonFiniteLimit {
        /// The offending limit.
        limit: f64,
    },

    /// Predicate nesting exceeds the allowed depth.
    #[error("predicate nesting depth {depth} exceeds maximum of {max}")]
    PredicateTooDeep {
        /// The actual nesting depth.
        depth: u32,
        /// The maximum allowed depth.
        max: u32,
    },
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A single compliance control check.
///
/// Each rule names *what* resource kind it checks, *which* SOC 2 control it
/// maps to, and *how* it checks (a [`Predicate`]). Rules are immutable and
/// defined at configuration time.
///
/// # Ordering
///
/// `Rule` implements [`Ord`] by `id` for deterministic, reproducible
/// ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique rule identifier in the format `argus/{framework}/{name}`.
    pub id: String,

    /// Human-readable rule name.
    pub name: String,

    /// What the rule checks.
    pub description: String,

    /// Severity of a failing verdict.
    pub severity: Severity,

    /// The resource kind this rule applies to.
    pub resource_type: ResourceType,

    /// The SOC 2 control this rule maps to (e.g. `CC6.1`).
    pub control_id: String,

    /// The declarative check applied to each matching snapshot.
    pub predicate: Predicate,

    /// Remediation guidance for a failing resource.
    pub remediation: String,

    /// External reference links.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,

    /// Searchable tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Rule version in SemVer format (e.g. "1.0.0").
    pub version: String,
}

impl Rule {
    /// Validates all structural constraints on this rule.
    ///
    /// # Errors
    ///
    /// Returns a [`RuleError`] if any constraint is violated:
    ///
    /// - [`RuleError::EmptyId`] if `id` is empty.
    /// - [`RuleError::InvalidControlId`] if `control_id` is malformed.
    /// - [`RuleError::InvalidVersion`] if `version` is not valid SemVer.
    /// - Any predicate validation error.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.id.is_empty() {
            return Err(RuleError::EmptyId);
        }

        if !is_valid_control_id(&self.control_id) {
            return Err(RuleError::InvalidControlId {
                rule_id: self.id.clone(),
                control_id: self.control_id.clone(),
            });
        }

        if !is_valid_semver(&self.version) {
            return Err(RuleError::InvalidVersion {
                rule_id: self.id.clone(),
                version: self.version.clone(),
            });
        }

        self.predicate.validate()
    }
}

impl Eq for Rule {}

/// Deterministic ordering by `id`.
impl Ord for Rule {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl PartialOrd for Rule {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] ({}, {})",
            self.id, self.severity, self.control_id, self.resource_type
        )
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Basic SemVer validation: must match `MAJOR.MINOR.PATCH` where each part is
/// a non-negative integer. Pre-release and build metadata are not supported.
fn is_valid_semver(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() != 3 {
        return false;
    }
    parts.iter().all(|p| !p.is_empty() && p.parse::<u64>().is_ok())
}

/// Control identifier validation: an uppercase-letter prefix followed by
/// dot-separated numeric parts, e.g. `CC6.1`, `A1.2`, `CC9`.
fn is_valid_control_id(control_id: &str) -> bool {
    let prefix_len = control_id.chars().take_while(|c| c.is_ascii_uppercase()).count();
    if prefix_len == 0 || prefix_len > 8 {
        return false;
    }
    let rest = &control_id[prefix_len..];
    if rest.is_empty() {
        return false;
    }
    rest.split('.').all(|p| !p.is_empty() && p.parse::<u32>().is_ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

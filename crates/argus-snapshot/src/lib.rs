//! Argus Snapshot -- the resource snapshot data model consumed by the
//! evaluation core.
//!
//! A [`ResourceSnapshot`] is a point-in-time description of one cloud
//! resource, produced by an external snapshot provider (AWS SDK collectors,
//! fixtures, replayed audit logs). The core never talks to a cloud API: it
//! receives snapshots as already-parsed structured records, loaded here from
//! JSON files.
//!
//! # Note on shared enums
//!
//! [`ResourceType`] is defined here because every other Argus crate consumes
//! snapshots; upper crates re-export it rather than duplicating it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod loader;

pub use loader::{load_snapshots_from_dir, load_snapshots_from_file};

// ---------------------------------------------------------------------------
// SnapshotError
// ---------------------------------------------------------------------------

/// Errors arising from snapshot validation and loading.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// An I/O error occurred while reading a snapshot file.
    #[error("I/O error reading snapshot file '{path}': {source}")]
    Io {
        /// The path that could not be read.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The JSON content could not be parsed.
    #[error("JSON parse error in '{path}': {source}")]
    JsonParse {
        /// The path that contained invalid JSON.
        path: String,
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },

    /// The snapshot `resource_id` field is empty.
    #[error("snapshot resource_id must not be empty")]
    EmptyResourceId,

    /// The `captured_at` field is not a valid RFC 3339 timestamp.
    #[error("invalid captured_at '{captured_at}' for resource '{resource_id}': expected RFC 3339")]
    InvalidCapturedAt {
        /// The resource whose timestamp failed to parse.
        resource_id: String,
        /// The invalid timestamp string.
        captured_at: String,
    },

    /// Two snapshots share the same `(resource_type, resource_id)` pair.
    #[error("duplicate snapshot for {resource_type} '{resource_id}'")]
    DuplicateResource {
        /// The duplicated resource type.
        resource_type: ResourceType,
        /// The duplicated resource identifier.
        resource_id: String,
    },
}

// ---------------------------------------------------------------------------
// ResourceType
// ---------------------------------------------------------------------------

/// The kind of cloud resource a snapshot describes.
///
/// The wire form (serde) uses the SCREAMING_SNAKE identifiers emitted by the
/// snapshot providers (`"S3_BUCKET"`, `"CLOUDTRAIL_TRAIL"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    /// An IAM account-level policy document (e.g. the password policy).
    #[serde(rename = "IAM_POLICY")]
    IamPolicy,
    /// An individual IAM user.
    #[serde(rename = "IAM_USER")]
    IamUser,
    /// An S3 bucket and its access/encryption configuration.
    #[serde(rename = "S3_BUCKET")]
    S3Bucket,
    /// A CloudTrail trail.
    #[serde(rename = "CLOUDTRAIL_TRAIL")]
    CloudTrailTrail,
    /// A CloudWatch alarm.
    #[serde(rename = "CLOUDWATCH_ALARM")]
    CloudWatchAlarm,
    /// An EC2 security group.
    #[serde(rename = "SECURITY_GROUP")]
    SecurityGroup,
    /// An EBS volume.
    #[serde(rename = "EBS_VOLUME")]
    EbsVolume,
}

impl ResourceType {
    /// Returns all resource type variants.
    #[must_use]
    pub const fn all() -> &'static [ResourceType] {
        &[
            Self::IamPolicy,
            Self::IamUser,
            Self::S3Bucket,
            Self::CloudTrailTrail,
            Self::CloudWatchAlarm,
            Self::SecurityGroup,
            Self::EbsVolume,
        ]
    }

    /// Returns the wire identifier for this resource type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IamPolicy => "IAM_POLICY",
            Self::IamUser => "IAM_USER",
            Self::S3Bucket => "S3_BUCKET",
            Self::CloudTrailTrail => "CLOUDTRAIL_TRAIL",
            Self::CloudWatchAlarm => "CLOUDWATCH_ALARM",
            Self::SecurityGroup => "SECURITY_GROUP",
            Self::EbsVolume => "EBS_VOLUME",
        }
    }

    /// Resolves a wire identifier back to a `ResourceType`.
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ResourceSnapshot
// ---------------------------------------------------------------------------

/// Attribute map of a snapshot: attribute name to raw JSON value.
///
/// `BTreeMap` keeps key ordering stable so serialized snapshots and the
/// evidence extracted from them are deterministic.
pub type AttributeMap = BTreeMap<String, serde_json::Value>;

/// A point-in-time description of one cloud resource.
///
/// Snapshots are immutable once created: the evaluation core only reads
/// them, and every verdict references the snapshot it was derived from by
/// `resource_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Provider-scoped resource identifier (bucket name, user name, ARN...).
    pub resource_id: String,

    /// The kind of resource described.
    pub resource_type: ResourceType,

    /// Raw attribute name/value pairs as reported by the provider.
    #[serde(default)]
    pub attributes: AttributeMap,

    /// RFC 3339 timestamp of when the provider captured this state.
    pub captured_at: String,
}

impl ResourceSnapshot {
    /// Validates the structural invariants of this snapshot.
    ///
    /// # Errors
    ///
    /// - [`SnapshotError::EmptyResourceId`] if `resource_id` is empty.
    /// - [`SnapshotError::InvalidCapturedAt`] if `captured_at` is not a
    ///   parseable RFC 3339 timestamp.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.resource_id.is_empty() {
            return Err(SnapshotError::EmptyResourceId);
        }
        if chrono::DateTime::parse_from_rfc3339(&self.captured_at).is_err() {
            return Err(SnapshotError::InvalidCapturedAt {
                resource_id: self.resource_id.clone(),
                captured_at: self.captured_at.clone(),
            });
        }
        Ok(())
    }

    /// Returns the attribute value for `name`, if present.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }
}

impl fmt::Display for ResourceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' ({} attributes, captured {})",
            self.resource_type,
            self.resource_id,
            self.attributes.len(),
            self.captured_at
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

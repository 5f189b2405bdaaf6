//! JSON snapshot loading.
//!
//! Snapshot providers drop their collected state as JSON files: either a
//! single [`ResourceSnapshot`] object or an array of them per file. The
//! loader walks a directory recursively, parses every `.json` file, validates
//! each snapshot, rejects duplicate `(resource_type, resource_id)` pairs, and
//! returns the set sorted for deterministic downstream evaluation.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::{ResourceSnapshot, ResourceType, SnapshotError};

/// One snapshot file: a single record or an array of records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Many(Vec<ResourceSnapshot>),
    One(ResourceSnapshot),
}

impl SnapshotFile {
    fn into_vec(self) -> Vec<ResourceSnapshot> {
        match self {
            Self::Many(v) => v,
            Self::One(s) => vec![s],
        }
    }
}

/// Loads snapshots from a single JSON file.
///
/// # Errors
///
/// - [`SnapshotError::Io`] if the file cannot be read.
/// - [`SnapshotError::JsonParse`] if the JSON is malformed or does not match
///   the snapshot schema.
/// - Validation errors from [`ResourceSnapshot::validate`] for any record.
pub fn load_snapshots_from_file(path: &Path) -> Result<Vec<ResourceSnapshot>, SnapshotError> {
    let contents = std::fs::read_to_string(path).map_err(|e| SnapshotError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: SnapshotFile =
        serde_json::from_str(&contents).map_err(|e| SnapshotError::JsonParse {
            path: path.display().to_string(),
            source: e,
        })?;

    let snapshots = file.into_vec();
    for snap in &snapshots {
        snap.validate()?;
    }
    Ok(snapshots)
}

/// Loads all snapshots from `.json` files in a directory, recursively.
///
/// Files without a `.json` extension are silently skipped. The returned
/// snapshots are sorted by `(resource_type, resource_id)` and duplicate
/// `(resource_type, resource_id)` pairs are rejected, so a cycle never
/// evaluates the same resource twice.
///
/// # Errors
///
/// Returns the first error encountered: I/O, JSON parse, validation, or
/// [`SnapshotError::DuplicateResource`].
pub fn load_snapshots_from_dir(dir: &Path) -> Result<Vec<ResourceSnapshot>, SnapshotError> {
    let mut snapshots: Vec<ResourceSnapshot> = Vec::new();
    let mut seen: BTreeSet<(ResourceType, String)> = BTreeSet::new();

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map_or_else(|| dir.display().to_string(), |p| p.display().to_string());
            SnapshotError::Io {
                path,
                source: std::io::Error::other(e),
            }
        })?;

        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {}
            _ => continue,
        }

        let loaded = load_snapshots_from_file(path)?;
        debug!(path = %path.display(), count = loaded.len(), "loaded snapshot file");

        for snap in loaded {
            let key = (snap.resource_type, snap.resource_id.clone());
            if !seen.insert(key) {
                return Err(SnapshotError::DuplicateResource {
                    resource_type: snap.resource_type,
                    resource_id: snap.resource_id,
                });
            }
            snapshots.push(snap);
        }
    }

    snapshots.sort_by(|a, b| {
        (a.resource_type, &a.resource_id).cmp(&(b.resource_type, &b.resource_id))
    });
    Ok(snapshots)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Snapshot baselines.
//!
//! A snapshot is the canonical JSON form of a value stored on disk and used
//! as the expected side of a structural comparison.
//!
//! ## Canonical form
//!
//! - object keys sorted recursively
//! - two-space pretty indentation
//! - trailing newline
//!
//! Canonicalisation serializes twice and fails with `DeterminismViolation`
//! if the two renderings differ, since a baseline that does not round-trip
//! cannot be diffed meaningfully.
//!
//! ## Responsibilities
//!
//! - Produce canonical text and its digest
//! - Create, verify and (in update mode) rewrite baseline files
//!
//! ## Non-Responsibilities
//!
//! - Deciding whether a mismatch fails a test (handled by
//!   [`crate::assertion::Assertion::matches_snapshot`])

pub mod digest;

use crate::compare::Difference;
use crate::errors::{ProbityError, Result};
use crate::json::{compare_json, JsonComparator};
use crate::{log_op_end, log_op_error, log_op_start};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub use digest::content_digest;

/// Environment variable enabling update mode (`1` or `true`).
pub const ENV_UPDATE_SNAPSHOTS: &str = "PROBITY_UPDATE_SNAPSHOTS";

/// File suffix of stored snapshots.
pub const SNAPSHOT_SUFFIX: &str = ".snap.json";

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, sort_keys(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

fn render(value: &Value) -> Result<String> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

/// Canonical form of an already-parsed JSON tree.
///
/// # Errors
///
/// Returns `DeterminismViolation` if two renderings differ.
pub fn canonicalize(value: &Value) -> Result<String> {
    let sorted = sort_keys(value.clone());
    let first = render(&sorted)?;
    let second = render(&sort_keys(value.clone()))?;
    if first != second {
        return Err(ProbityError::DeterminismViolation {
            reason: format!(
                "two renderings differ in length ({} vs {} bytes)",
                first.len(),
                second.len()
            ),
        });
    }
    Ok(first)
}

/// Canonical JSON text of `value`.
///
/// ```
/// use probity_core::snapshot::to_canonical_json;
/// use serde_json::json;
///
/// let text = to_canonical_json(&json!({"b": 1, "a": [true]})).unwrap();
/// assert_eq!(text, "{\n  \"a\": [\n    true\n  ],\n  \"b\": 1\n}\n");
/// ```
///
/// # Errors
///
/// Returns `Serialization` if `value` cannot be serialized, or
/// `DeterminismViolation` if its serialization is unstable.
pub fn to_canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let first = serde_json::to_value(value)?;
    let second = serde_json::to_value(value)?;
    let canonical = canonicalize(&first)?;
    if canonicalize(&second)? != canonical {
        return Err(ProbityError::DeterminismViolation {
            reason: "value serialized differently on two passes".to_string(),
        });
    }
    Ok(canonical)
}

/// Parse `text` as JSON, naming `source` in the error.
///
/// # Errors
///
/// Returns `InvalidJson` on parse failure.
pub fn parse_json(source: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| ProbityError::InvalidJson {
        source_name: source.to_string(),
        reason: e.to_string(),
    })
}

/// Canonicalize both values, then diff the canonical trees.
///
/// # Errors
///
/// Returns `Serialization` or `DeterminismViolation` from canonicalisation.
pub fn diff_serialized<A, E>(
    actual: &A,
    expected: &E,
    comparator: &JsonComparator,
) -> Result<Vec<Difference>>
where
    A: Serialize + ?Sized,
    E: Serialize + ?Sized,
{
    let actual = parse_json("actual", &to_canonical_json(actual)?)?;
    let expected = parse_json("expected", &to_canonical_json(expected)?)?;
    Ok(compare_json(&actual, &expected, comparator))
}

/// Result of [`SnapshotStore::verify`].
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    /// No baseline existed; it was written
    Created { digest: String },
    Matched { digest: String },
    /// Update mode rewrote a differing baseline
    Updated {
        previous_digest: String,
        digest: String,
    },
    Mismatched {
        expected_digest: String,
        actual_digest: String,
        differences: Vec<Difference>,
    },
}

/// Directory of snapshot baselines.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    update: bool,
}

impl SnapshotStore {
    /// Store rooted at `dir`; update mode follows `PROBITY_UPDATE_SNAPSHOTS`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let update = std::env::var(ENV_UPDATE_SNAPSHOTS)
            .map(|v| matches!(v.trim(), "1" | "true"))
            .unwrap_or(false);
        Self {
            dir: dir.into(),
            update,
        }
    }

    pub fn with_update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_update_mode(&self) -> bool {
        self.update
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, SNAPSHOT_SUFFIX))
    }

    fn validate_name(name: &str) -> Result<()> {
        let reason = if name.trim().is_empty() {
            Some("name is empty")
        } else if name.contains(['/', '\\']) {
            Some("name contains a path separator")
        } else if name == "." || name == ".." {
            Some("name is a relative directory")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ProbityError::InvalidSnapshotName {
                name: name.to_string(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn write(&self, path: &Path, canonical: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| ProbityError::io(&self.dir, e))?;
        std::fs::write(path, canonical).map_err(|e| ProbityError::io(path, e))
    }

    /// Compare `value` with the baseline `name`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSnapshotName`, `Io`, `InvalidJson` (corrupt baseline),
    /// `Serialization` or `DeterminismViolation`.
    pub fn verify<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
        comparator: &JsonComparator,
    ) -> Result<SnapshotOutcome> {
        let start = Instant::now();
        log_op_start!("snapshot_verify", snapshot = name);
        let result = self.verify_inner(name, value, comparator);
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => {
                log_op_end!(
                    "snapshot_verify",
                    duration_ms = duration_ms,
                    snapshot = name,
                    outcome = outcome_label(outcome)
                );
            }
            Err(err) => {
                log_op_error!("snapshot_verify", err, duration_ms = duration_ms, snapshot = name);
            }
        }
        result
    }

    fn verify_inner<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
        comparator: &JsonComparator,
    ) -> Result<SnapshotOutcome> {
        Self::validate_name(name)?;
        let path = self.path_for(name);
        let canonical = to_canonical_json(value)?;
        let digest = content_digest(&canonical);

        if !path.exists() {
            self.write(&path, &canonical)?;
            return Ok(SnapshotOutcome::Created { digest });
        }

        let stored = std::fs::read_to_string(&path).map_err(|e| ProbityError::io(&path, e))?;
        let stored_digest = content_digest(&stored);
        if stored == canonical {
            return Ok(SnapshotOutcome::Matched { digest });
        }

        let baseline = parse_json(&path.display().to_string(), &stored)?;
        let actual = parse_json("actual", &canonical)?;
        let differences = compare_json(&actual, &baseline, comparator);
        if differences.is_empty() {
            // Equal within tolerance or formatted differently
            return Ok(SnapshotOutcome::Matched { digest });
        }
        if self.update {
            self.write(&path, &canonical)?;
            return Ok(SnapshotOutcome::Updated {
                previous_digest: stored_digest,
                digest,
            });
        }
        Ok(SnapshotOutcome::Mismatched {
            expected_digest: stored_digest,
            actual_digest: digest,
            differences,
        })
    }
}

fn outcome_label(outcome: &SnapshotOutcome) -> &'static str {
    match outcome {
        SnapshotOutcome::Created { .. } => "created",
        SnapshotOutcome::Matched { .. } => "matched",
        SnapshotOutcome::Updated { .. } => "updated",
        SnapshotOutcome::Mismatched { .. } => "mismatched",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_sorts_nested_keys() {
        let text = to_canonical_json(&json!({"z": {"b": 1, "a": 2}, "a": null})).unwrap();
        let a = text.find("\"a\": null").unwrap();
        let z = text.find("\"z\"").unwrap();
        assert!(a < z);
        assert!(text.ends_with("}\n"));
        let inner_a = text.find("\"a\": 2").unwrap();
        let inner_b = text.find("\"b\": 1").unwrap();
        assert!(inner_a < inner_b);
    }

    #[test]
    fn test_canonical_is_stable() {
        let value = json!({"k": [1, 2, {"y": 1, "x": 2}]});
        assert_eq!(
            to_canonical_json(&value).unwrap(),
            to_canonical_json(&value).unwrap()
        );
    }

    #[test]
    fn test_invalid_names_rejected() {
        for bad in ["", "  ", "a/b", "..", "c\\d"] {
            let err = SnapshotStore::validate_name(bad).unwrap_err();
            assert_eq!(err.code(), "ERR_INVALID_SNAPSHOT_NAME", "{bad:?}");
        }
        assert!(SnapshotStore::validate_name("order-total_v2").is_ok());
    }

    #[test]
    fn test_parse_json_error_names_source() {
        let err = parse_json("left.json", "{").unwrap_err();
        assert_eq!(err.code(), "ERR_INVALID_JSON");
        assert!(err.to_string().contains("left.json"));
    }

    #[test]
    fn test_diff_serialized_ignores_key_order() {
        let diffs = diff_serialized(
            &json!({"a": 1, "b": 2}),
            &json!({"b": 2, "a": 1}),
            &JsonComparator::default(),
        )
        .unwrap();
        assert!(diffs.is_empty());
    }
}

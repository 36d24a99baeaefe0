#![allow(clippy::unwrap_used, clippy::expect_used)]

use probity_core::context::AssertionContext;
use probity_core::json::JsonComparator;
use probity_core::reporting::CollectingAdapter;
use probity_core::snapshot::{content_digest, to_canonical_json, SnapshotOutcome, SnapshotStore};
use probity_core::{assert_that, ErrorKind};
use serde::Serialize;
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Debug, Serialize)]
struct Invoice {
    number: String,
    amount: f64,
    tags: Vec<&'static str>,
}

fn invoice(amount: f64) -> Invoice {
    Invoice {
        number: "INV-1".to_string(),
        amount,
        tags: vec!["paid"],
    }
}

fn store(dir: &TempDir) -> SnapshotStore {
    SnapshotStore::new(dir.path()).with_update(false)
}

#[test]
fn test_first_verify_creates_baseline() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    let outcome = store
        .verify("invoice", &invoice(10.0), &JsonComparator::default())
        .unwrap();

    let written = std::fs::read_to_string(store.path_for("invoice")).unwrap();
    assert_eq!(written, to_canonical_json(&invoice(10.0)).unwrap());
    assert_eq!(
        outcome,
        SnapshotOutcome::Created {
            digest: content_digest(&written)
        }
    );
}

#[test]
fn test_second_verify_matches() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let cmp = JsonComparator::default();

    store.verify("invoice", &invoice(10.0), &cmp).unwrap();
    let outcome = store.verify("invoice", &invoice(10.0), &cmp).unwrap();
    assert!(matches!(outcome, SnapshotOutcome::Matched { .. }));

    // Within tolerance counts as a match and leaves the baseline alone.
    let before = std::fs::read_to_string(store.path_for("invoice")).unwrap();
    let outcome = store
        .verify("invoice", &invoice(10.000_000_001), &cmp)
        .unwrap();
    assert!(matches!(outcome, SnapshotOutcome::Matched { .. }));
    let after = std::fs::read_to_string(store.path_for("invoice")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_changed_value_is_mismatched_with_paths() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let cmp = JsonComparator::default();

    store.verify("invoice", &invoice(10.0), &cmp).unwrap();
    let outcome = store.verify("invoice", &invoice(12.5), &cmp).unwrap();

    match outcome {
        SnapshotOutcome::Mismatched {
            expected_digest,
            actual_digest,
            differences,
        } => {
            assert_ne!(expected_digest, actual_digest);
            assert_eq!(differences.len(), 1);
            assert_eq!(differences[0].path.to_string(), "amount");
        }
        other => panic!("expected mismatch, got {:?}", other),
    }
}

#[test]
fn test_update_mode_rewrites_baseline() {
    let dir = TempDir::new().unwrap();
    let cmp = JsonComparator::default();
    store(&dir).verify("invoice", &invoice(10.0), &cmp).unwrap();

    let updating = store(&dir).with_update(true);
    let outcome = updating.verify("invoice", &invoice(12.5), &cmp).unwrap();
    assert!(matches!(outcome, SnapshotOutcome::Updated { .. }));

    let outcome = store(&dir).verify("invoice", &invoice(12.5), &cmp).unwrap();
    assert!(matches!(outcome, SnapshotOutcome::Matched { .. }));
}

#[test]
fn test_invalid_name_is_rejected_before_io() {
    let dir = TempDir::new().unwrap();
    let err = store(&dir)
        .verify("../escape", &invoice(1.0), &JsonComparator::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSnapshotName);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_corrupt_baseline_is_invalid_json() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    std::fs::write(store.path_for("broken"), "{ not json").unwrap();
    let err = store
        .verify("broken", &invoice(1.0), &JsonComparator::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidJson);
}

#[test]
fn test_matches_snapshot_assertion() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let ctx = AssertionContext::begin("snapshots").unwrap();
    ctx.configure(|c| c.reporting_adapter = Arc::new(CollectingAdapter::new()));

    assert_that(invoice(10.0)).matches_snapshot(&store, "invoice");
    assert_that(invoice(10.0)).matches_snapshot(&store, "invoice");
    assert!(ctx.is_empty());

    assert_that(invoice(11.0)).matches_snapshot(&store, "invoice");
    let failure = ctx.dequeue().unwrap();
    assert!(failure.message.contains("snapshot 'invoice' does not match"));
    assert_eq!(failure.sub_failures.len(), 1);
}

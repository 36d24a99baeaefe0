#![allow(clippy::unwrap_used, clippy::expect_used)]

use probity_core::context::AssertionContext;
use probity_core::errors::ProbityError;
use probity_core::json::JsonComparator;
use probity_core::logging_facility::test_capture::init_test_capture;
use probity_core::reporting::CollectingAdapter;
use probity_core::schema::{EVENT_END, EVENT_END_ERROR, EVENT_FAILED, EVENT_START};
use probity_core::snapshot::SnapshotStore;
use probity_core::{assert_that, log_op_end, log_op_error, log_op_start};
use std::sync::Arc;

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name);

    capture.assert_event_exists(op_name, EVENT_START);
}

#[test]
fn test_log_op_end_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let end_events: Vec<_> = capture
        .events_for_op(op_name)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END))
        .collect();

    assert_eq!(end_events.len(), 1, "Should have exactly one end event");
    assert_eq!(end_events[0].field("duration_ms"), Some("42"));
}

#[test]
fn test_log_op_error_includes_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = ProbityError::EmptyFailureQueue {
        scope: "s".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 10);

    let error_event = capture
        .events_for_op(op_name)
        .into_iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("Should have error event");

    assert_eq!(error_event.field("err_code"), Some("ERR_EMPTY_FAILURE_QUEUE"));
    assert_eq!(error_event.field("duration_ms"), Some("10"));
}

#[test]
fn test_log_macros_with_multiple_fields() {
    let capture = init_test_capture();
    let op_name = "test_log_macros_fields_unique_4";

    log_op_start!(op_name, scope = "checkout", attempt = 2);

    let start_event = capture
        .events_for_op(op_name)
        .into_iter()
        .next()
        .expect("Should have start event");

    assert_eq!(start_event.field("scope"), Some("checkout"));
    assert_eq!(start_event.field("attempt"), Some("2"));
}

#[test]
fn test_end_and_error_macros_carry_trailing_fields() {
    let capture = init_test_capture();
    let op_name = "test_trailing_fields_unique_5";

    log_op_end!(op_name, duration_ms = 3, outcome = "matched");
    let err = ProbityError::NoActiveContext;
    log_op_error!(op_name, err, duration_ms = 4, snapshot = "orders");

    let events = capture.events_for_op(op_name);
    let end = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END))
        .expect("Should have end event");
    assert_eq!(end.field("outcome"), Some("matched"));

    let error = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("Should have error event");
    assert_eq!(error.field("snapshot"), Some("orders"));
    assert_eq!(error.field("err_code"), Some("ERR_NO_ACTIVE_CONTEXT"));
    assert_eq!(error.field("err_kind"), Some("NoActiveContext"));
    assert_eq!(error.level, tracing::Level::ERROR);
}

#[test]
#[should_panic(expected = "Expected event")]
fn test_test_capture_assert_event_exists_fails() {
    let capture = init_test_capture();

    capture.assert_event_exists("nonexistent_op_truly_unique_999", EVENT_START);
}

#[test]
fn test_context_lifecycle_is_logged() {
    let capture = init_test_capture();
    let scope = "logging-lifecycle-unique-5";

    let guard = AssertionContext::begin(scope).unwrap();
    guard.configure(|c| c.reporting_adapter = Arc::new(CollectingAdapter::new()));
    assert_that(1).named("lifecycle-check-unique-5").is_equal_to(2);
    drop(guard);

    let ours = |e: &probity_core::logging_facility::CapturedEvent| {
        e.field("scope") == Some(scope)
    };
    assert_eq!(
        capture.count_events(|e| ours(e) && e.event.as_deref() == Some(EVENT_START)),
        1
    );
    let end = capture
        .events_for_op("context_dispose")
        .into_iter()
        .find(|e| ours(e))
        .expect("dispose should be logged");
    assert_eq!(end.field("failure_count"), Some("1"));

    assert_eq!(
        capture.count_events(|e| e.event.as_deref() == Some(EVENT_FAILED)
            && e.field("assertion") == Some("lifecycle-check-unique-5")),
        1
    );
}

#[test]
fn test_snapshot_verify_logs_outcome() {
    let capture = init_test_capture();
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path()).with_update(false);

    store
        .verify("logged-unique-6", &serde_json::json!({"a": 1}), &JsonComparator::default())
        .unwrap();

    let end = capture
        .events_for_op("snapshot_verify")
        .into_iter()
        .find(|e| {
            e.field("snapshot") == Some("logged-unique-6") && e.event.as_deref() == Some(EVENT_END)
        })
        .expect("verify end should be logged");
    assert_eq!(end.field("outcome"), Some("created"));
}

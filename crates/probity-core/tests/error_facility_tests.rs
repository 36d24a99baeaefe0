use probity_core::errors::{ErrorKind, ProbityError};

#[test]
fn test_context_already_active_names_both_scopes() {
    let err = ProbityError::ContextAlreadyActive {
        active: "outer".to_string(),
        requested: "inner".to_string(),
    };

    assert_eq!(err.kind(), ErrorKind::ContextAlreadyActive);
    assert_eq!(err.code(), "ERR_CONTEXT_ALREADY_ACTIVE");
    assert!(err.to_string().contains("'outer'"));
    assert!(err.to_string().contains("'inner'"));
}

#[test]
fn test_empty_queue_names_scope() {
    let err = ProbityError::EmptyFailureQueue {
        scope: "checkout".to_string(),
    };

    assert_eq!(err.kind(), ErrorKind::EmptyFailureQueue);
    assert_eq!(err.code(), "ERR_EMPTY_FAILURE_QUEUE");
    assert!(err.to_string().contains("checkout"));
}

#[test]
fn test_usage_errors_are_distinguished() {
    let usage = [
        ErrorKind::ContextAlreadyActive,
        ErrorKind::ContextInsideRuntime,
        ErrorKind::EmptyFailureQueue,
        ErrorKind::NoActiveContext,
    ];
    for kind in usage {
        assert!(kind.is_usage(), "{:?}", kind);
    }

    let environmental = [
        ErrorKind::InvalidJson,
        ErrorKind::InvalidSnapshotName,
        ErrorKind::DeterminismViolation,
        ErrorKind::Io,
        ErrorKind::Serialization,
    ];
    for kind in environmental {
        assert!(!kind.is_usage(), "{:?}", kind);
    }
}

#[test]
fn test_error_kind_code_mapping() {
    // Each kind has a stable, unique code
    let kinds = vec![
        (ErrorKind::ContextAlreadyActive, "ERR_CONTEXT_ALREADY_ACTIVE"),
        (ErrorKind::ContextInsideRuntime, "ERR_CONTEXT_INSIDE_RUNTIME"),
        (ErrorKind::EmptyFailureQueue, "ERR_EMPTY_FAILURE_QUEUE"),
        (ErrorKind::NoActiveContext, "ERR_NO_ACTIVE_CONTEXT"),
        (ErrorKind::InvalidJson, "ERR_INVALID_JSON"),
        (ErrorKind::InvalidSnapshotName, "ERR_INVALID_SNAPSHOT_NAME"),
        (ErrorKind::DeterminismViolation, "ERR_DETERMINISM_VIOLATION"),
        (ErrorKind::Io, "ERR_IO"),
        (ErrorKind::Serialization, "ERR_SERIALIZATION"),
    ];

    for (kind, expected_code) in kinds {
        assert_eq!(kind.code(), expected_code);
    }
}

#[test]
fn test_io_error_keeps_path_and_source() {
    let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err = ProbityError::io("/tmp/baseline.snap.json", source);

    assert_eq!(err.kind(), ErrorKind::Io);
    let text = err.to_string();
    assert!(text.contains("/tmp/baseline.snap.json"));
    assert!(text.contains("gone"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_serde_json_error_converts_to_serialization() {
    let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: ProbityError = parse_err.into();
    assert_eq!(err.kind(), ErrorKind::Serialization);
    assert_eq!(err.code(), "ERR_SERIALIZATION");
}

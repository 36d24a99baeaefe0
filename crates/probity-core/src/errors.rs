use thiserror::Error;

/// Result type alias using ProbityError
pub type Result<T> = std::result::Result<T, ProbityError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling and for matching in tests. Assertion failures are not
/// errors and have no kind here: they travel as [`crate::Failure`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Usage (always fatal)
    ContextAlreadyActive,
    ContextInsideRuntime,
    EmptyFailureQueue,
    NoActiveContext,

    // Snapshot / JSON
    InvalidJson,
    InvalidSnapshotName,
    DeterminismViolation,

    // Integration/IO
    Io,
    Serialization,
}

impl ErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ContextAlreadyActive => "ERR_CONTEXT_ALREADY_ACTIVE",
            ErrorKind::ContextInsideRuntime => "ERR_CONTEXT_INSIDE_RUNTIME",
            ErrorKind::EmptyFailureQueue => "ERR_EMPTY_FAILURE_QUEUE",
            ErrorKind::NoActiveContext => "ERR_NO_ACTIVE_CONTEXT",
            ErrorKind::InvalidJson => "ERR_INVALID_JSON",
            ErrorKind::InvalidSnapshotName => "ERR_INVALID_SNAPSHOT_NAME",
            ErrorKind::DeterminismViolation => "ERR_DETERMINISM_VIOLATION",
            ErrorKind::Io => "ERR_IO",
            ErrorKind::Serialization => "ERR_SERIALIZATION",
        }
    }

    /// Usage errors signal a misuse of the context API; they are never
    /// buffered or retried.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            ErrorKind::ContextAlreadyActive
                | ErrorKind::ContextInsideRuntime
                | ErrorKind::EmptyFailureQueue
                | ErrorKind::NoActiveContext
        )
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for Probity operations
#[derive(Error, Debug)]
pub enum ProbityError {
    // ===== Usage Errors =====
    /// A context was begun while another one is active on the same flow
    #[error("Assertion context '{requested}' cannot begin: context '{active}' is already active on this flow")]
    ContextAlreadyActive { active: String, requested: String },

    /// A thread-bound context was begun on a thread driving an async runtime
    #[error("Assertion context '{requested}' cannot be bound to a runtime thread; use context::scope inside async code")]
    ContextInsideRuntime { requested: String },

    /// Dequeue was called on a context with no buffered failures
    #[error("Assertion context '{scope}' has no buffered failures to dequeue")]
    EmptyFailureQueue { scope: String },

    /// An operation required an active context but none was found
    #[error("No assertion context is active on this flow")]
    NoActiveContext,

    // ===== Snapshot / JSON Errors =====
    /// Input could not be parsed as JSON
    #[error("Invalid JSON in {source_name}: {reason}")]
    InvalidJson { source_name: String, reason: String },

    /// Snapshot name is empty or would escape the snapshot directory
    #[error("Invalid snapshot name '{name}': {reason}")]
    InvalidSnapshotName { name: String, reason: String },

    /// Canonical serialization produced different bytes for identical input
    #[error("Canonical form is not stable: {reason}")]
    DeterminismViolation { reason: String },

    // ===== Integration Errors =====
    /// Underlying I/O failure
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ProbityError {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProbityError::ContextAlreadyActive { .. } => ErrorKind::ContextAlreadyActive,
            ProbityError::ContextInsideRuntime { .. } => ErrorKind::ContextInsideRuntime,
            ProbityError::EmptyFailureQueue { .. } => ErrorKind::EmptyFailureQueue,
            ProbityError::NoActiveContext => ErrorKind::NoActiveContext,
            ProbityError::InvalidJson { .. } => ErrorKind::InvalidJson,
            ProbityError::InvalidSnapshotName { .. } => ErrorKind::InvalidSnapshotName,
            ProbityError::DeterminismViolation { .. } => ErrorKind::DeterminismViolation,
            ProbityError::Io { .. } => ErrorKind::Io,
            ProbityError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Wrap an I/O error with the path it occurred at
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        ProbityError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

impl From<serde_json::Error> for ProbityError {
    fn from(err: serde_json::Error) -> Self {
        ProbityError::Serialization(err.to_string())
    }
}

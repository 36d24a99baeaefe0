//! Canonical schema constants for structured logging and events
//!
//! These constants keep log fields consistent between the assertion
//! orchestrator, the context lifecycle and the CLI.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Assertion identifiers
pub const FIELD_ASSERTION: &str = "assertion";
pub const FIELD_LOCATION: &str = "location";
pub const FIELD_SCOPE: &str = "scope";
pub const FIELD_SCOPE_ID: &str = "scope_id";

// Collection sizes
pub const FIELD_DIFF_COUNT: &str = "diff_count";
pub const FIELD_FAILURE_COUNT: &str = "failure_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_PASSED: &str = "passed";
pub const EVENT_FAILED: &str = "failed";

//! Structured logging facility for Probity
//!
//! This module provides:
//! - Single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use probity_core::logging_facility::{init, Profile};
//!
//! // Initialize once at process startup
//! init(Profile::from_env_or(Profile::Development));
//! ```
//!
//! # Logging Macros
//!
//! - `log_op_start!(op, ...)`: info event at the start of `op`
//! - `log_op_end!(op, duration_ms = ...)`: info event at its end
//! - `log_op_error!(op, err, duration_ms = ...)`: error event with kind and code
//!
//! Assertion evaluations log outside these macros: passes at `debug` with
//! `event = "passed"`, failures at `warn` with `event = "failed"`.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};

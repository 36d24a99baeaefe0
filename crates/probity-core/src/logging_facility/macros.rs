//! Op-boundary logging macros.
//!
//! Every event carries `component`, `op` and `event`. Event names come from
//! `probity_core::schema`. Extra `tracing` fields may follow the required
//! arguments.

/// Shared body of the op-boundary macros.
#[doc(hidden)]
#[macro_export]
macro_rules! __probity_op_event {
    ($level:expr, $event:expr, $op:expr; $($field:tt)*) => {
        ::tracing::event!(
            $level,
            component = module_path!(),
            op = $op,
            event = $event,
            $($field)*
        )
    };
}

/// Info event marking the start of `op`.
///
/// ```
/// # use probity_core::log_op_start;
/// log_op_start!("context_begin");
/// log_op_start!("context_begin", scope = "checkout");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__probity_op_event!(
            ::tracing::Level::INFO,
            $crate::schema::EVENT_START,
            $op;
            $($($field)*)?
        )
    };
}

/// Info event marking the successful end of `op`. `duration_ms` is required.
///
/// ```
/// # use probity_core::log_op_end;
/// log_op_end!("snapshot_verify", duration_ms = 42, outcome = "matched");
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__probity_op_event!(
            ::tracing::Level::INFO,
            $crate::schema::EVENT_END,
            $op;
            duration_ms = $duration,
            $($($field)*)?
        )
    };
}

/// Error event for `op`, tagged with the error's stable kind and code.
///
/// ```
/// # use probity_core::{log_op_error, errors::ProbityError};
/// let err = ProbityError::NoActiveContext;
/// log_op_error!("dequeue", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let err: &$crate::errors::ProbityError = &$err;
        $crate::__probity_op_event!(
            ::tracing::Level::ERROR,
            $crate::schema::EVENT_END_ERROR,
            $op;
            duration_ms = $duration,
            err_kind = ?err.kind(),
            err_code = err.code(),
            error = %err,
            $($($field)*)?
        )
    }};
}

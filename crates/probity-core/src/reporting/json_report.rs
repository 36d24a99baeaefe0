//! JSON array report file.

use super::{AssertionEvent, AssertionObserver};
use crate::errors::{ProbityError, Result};
use crate::failure::Failure;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Observer that keeps every failure and rewrites `path` as a JSON array
/// after each one, so the file is complete even if the process aborts.
#[derive(Debug)]
pub struct JsonReportWriter {
    path: PathBuf,
    failures: Mutex<Vec<Failure>>,
}

impl JsonReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            failures: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Failures recorded so far.
    pub fn failures(&self) -> Vec<Failure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record `failure` and rewrite the file.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` or `Io` if the file cannot be written.
    pub fn record(&self, failure: Failure) -> Result<()> {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        failures.push(failure);
        let body = serde_json::to_string_pretty(&*failures)?;
        std::fs::write(&self.path, body).map_err(|e| ProbityError::io(&self.path, e))
    }
}

impl AssertionObserver for JsonReportWriter {
    fn on_assertion(&self, event: &AssertionEvent) {
        let Some(failure) = &event.failure else {
            return;
        };
        if let Err(err) = self.record(failure.clone()) {
            tracing::warn!(
                component = module_path!(),
                err_code = err.code(),
                error = %err,
                "failed to write JSON report"
            );
        }
    }
}

//! Reporting interface between the assertion core and its host.
//!
//! ## Responsibilities
//!
//! - [`ReportingAdapter`]: receives failures that must surface now, either
//!   one at a time or as a context's aggregate on dispose. May panic.
//! - [`AssertionObserver`]: fire-and-forget notification of every
//!   evaluation, pass or fail. Must not panic; that is the implementor's
//!   responsibility.
//!
//! Adapters are registered explicitly in [`crate::config::Configuration`].
//! Nothing is detected at runtime.

pub mod json_report;
pub mod markdown;
pub mod statistics;

use crate::config::Configuration;
use crate::failure::{Failure, SourceLocation};
use serde::Serialize;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

pub use json_report::JsonReportWriter;
pub use markdown::render_markdown;
pub use statistics::{AssertionStatistics, NameTally, StatisticsSnapshot};

/// Emitted for every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssertionEvent {
    pub passed: bool,
    pub failure: Option<Failure>,
    pub assertion_name: Option<String>,
    pub location: Option<SourceLocation>,
}

impl AssertionEvent {
    pub fn passed(assertion_name: Option<String>, location: Option<SourceLocation>) -> Self {
        Self {
            passed: true,
            failure: None,
            assertion_name,
            location,
        }
    }

    pub fn failed(failure: Failure) -> Self {
        Self {
            passed: false,
            assertion_name: failure.assertion_name.clone(),
            location: failure.location.clone(),
            failure: Some(failure),
        }
    }
}

/// Host-side sink for failures.
pub trait ReportingAdapter: Send + Sync {
    /// Surface a single failure immediately.
    fn report_failure(&self, failure: &Failure);

    /// Surface a context's remaining failures as one report.
    fn report_failures(&self, message: &str, failures: &[Failure]);

    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Observer of every evaluation. Implementations are called concurrently.
pub trait AssertionObserver: Send + Sync {
    fn on_assertion(&self, event: &AssertionEvent);
}

/// Render an aggregate report as text.
pub fn render_aggregate(message: &str, failures: &[Failure], colorize: bool) -> String {
    let mut out = message.to_string();
    for (i, failure) in failures.iter().enumerate() {
        out.push_str(&format!("\n\n{}) {}", i + 1, failure.render(colorize)));
    }
    out
}

/// Default adapter: panics with the rendered failure, like `assert!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanicAdapter;

impl ReportingAdapter for PanicAdapter {
    fn report_failure(&self, failure: &Failure) {
        panic!("{}", failure.render(Configuration::current().colorize));
    }

    fn report_failures(&self, message: &str, failures: &[Failure]) {
        panic!(
            "{}",
            render_aggregate(message, failures, Configuration::current().colorize)
        );
    }

    fn name(&self) -> &'static str {
        "panic"
    }
}

/// Logs failures through `tracing` and never panics.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAdapter;

impl ReportingAdapter for LogAdapter {
    fn report_failure(&self, failure: &Failure) {
        tracing::error!(
            component = module_path!(),
            assertion = failure.assertion_name.as_deref().unwrap_or(""),
            location = %failure.location.as_ref().map(ToString::to_string).unwrap_or_default(),
            "{}",
            failure.render(false)
        );
    }

    fn report_failures(&self, message: &str, failures: &[Failure]) {
        tracing::error!(
            component = module_path!(),
            failure_count = failures.len(),
            "{}",
            render_aggregate(message, failures, false)
        );
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Writes one line per failure to a sink.
pub struct ConsoleAdapter {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleAdapter {
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
        }
    }

    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }

    fn line(failure: &Failure) -> String {
        let location = failure
            .location
            .as_ref()
            .map(|l| format!("{} ", l))
            .unwrap_or_default();
        let mut line = format!(
            "FAIL {}{} (expected: {}, actual: {})",
            location, failure.message, failure.expected, failure.actual
        );
        if !failure.sub_failures.is_empty() {
            let subs: Vec<&str> = failure
                .sub_failures
                .iter()
                .map(|s| s.message.as_str())
                .collect();
            line.push_str(&format!(" [{}]", subs.join("; ")));
        }
        line.replace('\n', " ")
    }

    fn write_lines(&self, lines: &[String]) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        for line in lines {
            if let Err(err) = writeln!(sink, "{}", line) {
                tracing::warn!(component = module_path!(), error = %err, "console report write failed");
                return;
            }
        }
        sink.flush().ok();
    }
}

impl ReportingAdapter for ConsoleAdapter {
    fn report_failure(&self, failure: &Failure) {
        self.write_lines(&[Self::line(failure)]);
    }

    fn report_failures(&self, message: &str, failures: &[Failure]) {
        let mut lines = vec![format!("FAILURES {}", message)];
        lines.extend(failures.iter().map(Self::line));
        self.write_lines(&lines);
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// One call received by a [`CollectingAdapter`].
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Single(Failure),
    Aggregate {
        message: String,
        failures: Vec<Failure>,
    },
}

/// Stores every report in memory; never panics.
#[derive(Debug, Default)]
pub struct CollectingAdapter {
    reports: Mutex<Vec<Report>>,
}

impl CollectingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, report: Report) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report);
    }
}

impl ReportingAdapter for CollectingAdapter {
    fn report_failure(&self, failure: &Failure) {
        self.push(Report::Single(failure.clone()));
    }

    fn report_failures(&self, message: &str, failures: &[Failure]) {
        self.push(Report::Aggregate {
            message: message.to_string(),
            failures: failures.to_vec(),
        });
    }

    fn name(&self) -> &'static str {
        "collecting"
    }
}

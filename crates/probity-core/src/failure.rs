//! Failure records produced by failed assertions.

use crate::compare::Difference;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Where an assertion was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
    /// Literal source line, when it could be read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl SourceLocation {
    pub fn from_caller(location: &Location<'_>) -> Self {
        Self {
            file: location.file().to_string(),
            line: location.line(),
            column: location.column(),
            text: None,
        }
    }

    /// Attach the literal source line if the file can be found.
    pub fn with_source_text(mut self) -> Self {
        self.text = source_line(&self.file, self.line);
        self
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

type SourceCache = HashMap<String, Option<Arc<Vec<String>>>>;

static SOURCE_CACHE: OnceLock<Mutex<SourceCache>> = OnceLock::new();

/// Read line `line` (1-based) of `file`, caching file contents.
///
/// Caller paths are usually relative to the workspace root while tests run
/// from the crate directory, so every ancestor of the working directory is
/// tried.
fn source_line(file: &str, line: u32) -> Option<String> {
    let cache = SOURCE_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let lines = {
        let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .entry(file.to_string())
            .or_insert_with(|| load_lines(file).map(Arc::new))
            .clone()
    }?;
    let index = usize::try_from(line).ok()?.checked_sub(1)?;
    lines.get(index).map(|l| l.trim().to_string())
}

fn load_lines(file: &str) -> Option<Vec<String>> {
    let path = resolve_source(Path::new(file))?;
    let content = std::fs::read_to_string(path).ok()?;
    Some(content.lines().map(str::to_string).collect())
}

fn resolve_source(path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }
    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .map(|dir| dir.join(path))
        .find(|candidate| candidate.is_file())
}

/// One failed evaluation.
///
/// Nested differences are folded into `sub_failures` rather than producing
/// one failure per difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub message: String,
    pub actual: String,
    pub expected: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_failures: Vec<Failure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion_name: Option<String>,
    /// Failure type adapters should raise instead of their default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_kind: Option<String>,
}

impl Failure {
    pub fn new(
        message: impl Into<String>,
        actual: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            actual: actual.into(),
            expected: expected.into(),
            sub_failures: Vec::new(),
            location: None,
            timestamp: Utc::now(),
            assertion_name: None,
            custom_kind: None,
        }
    }

    /// Fold `differences` into one failure.
    ///
    /// At most `max` differences become sub-failures; any excess is replaced
    /// by a single `... and N more differences` marker.
    pub fn from_differences(
        message: impl Into<String>,
        actual: impl Into<String>,
        expected: impl Into<String>,
        differences: &[Difference],
        max: usize,
    ) -> Self {
        let mut sub_failures: Vec<Failure> = differences
            .iter()
            .take(max)
            .map(|d| Failure::new(d.to_string(), d.actual.clone(), d.expected.clone()))
            .collect();
        if differences.len() > max {
            sub_failures.push(Failure::new(
                format!("... and {} more differences", differences.len() - max),
                "",
                "",
            ));
        }
        Self::new(message, actual, expected).with_sub_failures(sub_failures)
    }

    pub fn with_sub_failures(mut self, sub_failures: Vec<Failure>) -> Self {
        self.sub_failures = sub_failures;
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_assertion_name(mut self, name: impl Into<String>) -> Self {
        self.assertion_name = Some(name.into());
        self
    }

    pub fn with_custom_kind(mut self, kind: impl Into<String>) -> Self {
        self.custom_kind = Some(kind.into());
        self
    }

    /// Multi-line rendering used by the panic and console adapters.
    pub fn render(&self, colorize: bool) -> String {
        let mut out = String::new();
        if let Some(kind) = &self.custom_kind {
            out.push_str(&format!("[{}] ", kind));
        }
        out.push_str(&self.message);

        if !self.expected.is_empty() || !self.actual.is_empty() {
            let (expected, actual) = if colorize {
                (
                    self.expected.green().to_string(),
                    self.actual.red().to_string(),
                )
            } else {
                (self.expected.clone(), self.actual.clone())
            };
            out.push_str(&format!("\n  expected: {}", expected));
            out.push_str(&format!("\n  actual:   {}", actual));
        }

        for sub in &self.sub_failures {
            out.push_str(&format!("\n  - {}", sub.message));
        }

        if let Some(location) = &self.location {
            out.push_str(&format!("\n  at {}", location));
            if let Some(text) = &location.text {
                out.push_str(&format!("\n  > {}", text));
            }
        }
        out
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

/// Substitute `{actual}`, `{expected}` and `{name}` in a message template.
///
/// ```
/// use probity_core::failure::format_template;
///
/// let msg = format_template("expected {name} to be {expected} but was {actual}", "1", "2", "x");
/// assert_eq!(msg, "expected x to be 2 but was 1");
/// ```
pub fn format_template(template: &str, actual: &str, expected: &str, name: &str) -> String {
    template
        .replace("{actual}", actual)
        .replace("{expected}", expected)
        .replace("{name}", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{ComparisonPath, DifferenceKind};

    fn diffs(n: usize) -> Vec<Difference> {
        (0..n)
            .map(|i| {
                Difference::new(
                    ComparisonPath::root().index(i),
                    DifferenceKind::Mismatch,
                    i.to_string(),
                    "0",
                )
            })
            .collect()
    }

    #[test]
    fn test_from_differences_within_bound() {
        let f = Failure::from_differences("m", "a", "e", &diffs(3), 10);
        assert_eq!(f.sub_failures.len(), 3);
        assert_eq!(f.sub_failures[1].message, "mismatch at [1]: expected 0, found 1");
    }

    #[test]
    fn test_from_differences_truncates_with_marker() {
        let f = Failure::from_differences("m", "a", "e", &diffs(15), 10);
        assert_eq!(f.sub_failures.len(), 11);
        assert_eq!(f.sub_failures[10].message, "... and 5 more differences");
    }

    #[test]
    fn test_render_plain() {
        let f = Failure::new("values differ", "1", "2")
            .with_custom_kind("InvariantBroken")
            .with_location(SourceLocation {
                file: "src/x.rs".to_string(),
                line: 3,
                column: 5,
                text: Some("assert_that(1).is_equal_to(2);".to_string()),
            });
        let rendered = f.render(false);
        assert!(rendered.starts_with("[InvariantBroken] values differ"));
        assert!(rendered.contains("expected: 2"));
        assert!(rendered.contains("actual:   1"));
        assert!(rendered.contains("at src/x.rs:3:5"));
        assert!(rendered.contains("> assert_that(1).is_equal_to(2);"));
        assert_eq!(f.to_string(), rendered);
    }

    #[test]
    fn test_message_excludes_timestamp() {
        let a = Failure::new("m", "1", "2");
        let b = Failure::new("m", "1", "2");
        assert_eq!(a.render(false), b.render(false));
    }

    #[test]
    fn test_source_text_is_read_for_this_file() {
        let location = SourceLocation::from_caller(Location::caller()).with_source_text();
        let text = location.text.unwrap_or_default();
        assert!(text.contains("SourceLocation::from_caller"), "got: {text}");
    }

    #[test]
    fn test_missing_source_file_yields_none() {
        let location = SourceLocation {
            file: "does/not/exist.rs".to_string(),
            line: 1,
            column: 1,
            text: None,
        }
        .with_source_text();
        assert!(location.text.is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let f = Failure::from_differences("m", "a", "e", &diffs(1), 10).with_assertion_name("n");
        let json = serde_json::to_string(&f).unwrap();
        let back: Failure = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
    }
}

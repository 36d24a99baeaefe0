//! Assertion orchestration.
//!
//! Every check evaluates its condition exactly once and then either passes
//! or fails:
//!
//! - **Pass**: a passed [`AssertionEvent`] goes to the listener and observer.
//! - **Fail**: a [`Failure`] is built with the caller's source location,
//!   announced to the listener and observer, then dispatched. It is buffered
//!   in the active context if there is one. Otherwise it goes to the
//!   reporting adapter, which panics by default.
//!
//! Entry points are `#[track_caller]`. A helper that wraps them should be
//! `#[track_caller]` too, so the location recorded is its caller's rather
//! than its own.
//!
//! ```
//! use probity_core::assert_that;
//!
//! let total = assert_that(40 + 2).named("total").is_equal_to(42).into_inner();
//! assert_eq!(total, 42);
//! ```

use crate::compare::Comparator;
use crate::config::Configuration;
use crate::context;
use crate::describe::Describe;
use crate::failure::{format_template, Failure, SourceLocation};
use crate::json::{compare_json, JsonComparator};
use crate::multiset;
use crate::reporting::AssertionEvent;
use crate::snapshot::{SnapshotOutcome, SnapshotStore};
use probity_core_types::schema;
use serde::Serialize;
use std::fmt::Debug;
use std::future::Future;
use std::panic::Location;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

/// Metadata shared by every check of one fluent chain.
#[derive(Debug, Clone)]
struct Site {
    name: Option<String>,
    custom_kind: Option<String>,
    location: &'static Location<'static>,
}

impl Site {
    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("value")
    }

    fn pass(&self) {
        let config = Configuration::current();
        let event = AssertionEvent::passed(
            self.name.clone(),
            Some(SourceLocation::from_caller(self.location)),
        );
        notify(&config, &event);
        tracing::debug!(
            component = module_path!(),
            event = schema::EVENT_PASSED,
            assertion = self.display_name(),
            location = %self.location,
        );
    }

    fn fail(&self, failure: Failure) {
        let config = Configuration::current();
        let mut location = SourceLocation::from_caller(self.location);
        if config.include_source_line {
            location = location.with_source_text();
        }
        let mut failure = failure.with_location(location);
        if let Some(name) = &self.name {
            failure = failure.with_assertion_name(name.clone());
        }
        if let Some(kind) = &self.custom_kind {
            failure = failure.with_custom_kind(kind.clone());
        }
        dispatch(&config, failure);
    }

    fn conclude(&self, passed: bool, failure: impl FnOnce() -> Failure) {
        if passed {
            self.pass();
        } else {
            self.fail(failure());
        }
    }

    fn message(&self, template: &str, actual: &str, expected: &str) -> String {
        format_template(template, actual, expected, self.display_name())
    }
}

fn notify(config: &Configuration, event: &AssertionEvent) {
    if let Some(listener) = &config.listener {
        listener.on_assertion(event);
    }
    if let Some(observer) = &config.observer {
        observer.on_assertion(event);
    }
}

/// Announce a failure, then buffer it in the active context or hand it to
/// the adapter.
fn dispatch(config: &Configuration, failure: Failure) {
    let event = AssertionEvent::failed(failure);
    notify(config, &event);
    let Some(failure) = event.failure else {
        return;
    };

    tracing::warn!(
        component = module_path!(),
        event = schema::EVENT_FAILED,
        assertion = failure.assertion_name.as_deref().unwrap_or("value"),
        location = %failure.location.as_ref().map(ToString::to_string).unwrap_or_default(),
        sub_failure_count = failure.sub_failures.len(),
        "{}",
        failure.message
    );

    let failure = match context::current() {
        Some(ctx) => match ctx.enqueue(failure) {
            Ok(()) => return,
            Err(failure) => failure,
        },
        None => failure,
    };

    if config.throw_on_failure {
        config.reporting_adapter.report_failure(&failure);
    }
}

/// Start a fluent assertion about `value`.
#[track_caller]
pub fn assert_that<T>(value: T) -> Assertion<T> {
    Assertion {
        value,
        site: Site {
            name: None,
            custom_kind: None,
            location: Location::caller(),
        },
    }
}

/// Check a plain condition. `template` may use `{name}`.
#[track_caller]
pub fn check(condition: bool, template: &str) {
    check_at(condition, None, template, Location::caller());
}

/// [`check`] with an assertion name.
#[track_caller]
pub fn check_named(condition: bool, name: &str, template: &str) {
    check_at(condition, Some(name.to_string()), template, Location::caller());
}

fn check_at(
    condition: bool,
    name: Option<String>,
    template: &str,
    location: &'static Location<'static>,
) {
    let site = Site {
        name,
        custom_kind: None,
        location,
    };
    site.conclude(condition, || {
        Failure::new(site.message(template, "false", "true"), "false", "true")
    });
}

/// Check a condition, naming the assertion after its source text.
///
/// ```
/// use probity_core::ensure;
///
/// let items = vec![1, 2, 3];
/// ensure!(items.len() == 3);
/// ensure!(items[0] < items[2], "items out of order: {:?}", items);
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr $(,)?) => {
        $crate::assertion::check_named(
            $cond,
            ::std::stringify!($cond),
            ::std::concat!("condition failed: ", ::std::stringify!($cond)),
        )
    };
    ($cond:expr, $($arg:tt)+) => {
        $crate::assertion::check_named(
            $cond,
            ::std::stringify!($cond),
            &::std::format!($($arg)+),
        )
    };
}

/// Run `fut` on a separate task and check that it finishes within `limit`.
///
/// An overrunning task is detached, not aborted. Returns its output when it
/// finished in time. Must be awaited inside a tokio runtime.
#[track_caller]
pub fn completes_within_async<F>(
    limit: Duration,
    fut: F,
) -> impl Future<Output = Option<F::Output>>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let site = Site {
        name: None,
        custom_kind: None,
        location: Location::caller(),
    };
    let fut = context::propagate(fut);
    async move {
        let task = tokio::spawn(fut);
        match tokio::time::timeout(limit, task).await {
            Ok(Ok(output)) => {
                site.pass();
                Some(output)
            }
            Ok(Err(join_err)) => {
                site.fail(Failure::new(
                    format!("expected {} to complete but it failed: {}", site.display_name(), join_err),
                    "failed",
                    format!("{:?}", limit),
                ));
                None
            }
            Err(_) => {
                site.fail(Failure::new(
                    format!(
                        "expected {} to complete within {:?} but it was still running",
                        site.display_name(),
                        limit
                    ),
                    "still running",
                    format!("{:?}", limit),
                ));
                None
            }
        }
    }
}

/// A value under assertion.
pub struct Assertion<T> {
    value: T,
    site: Site,
}

impl<T> Assertion<T> {
    /// Name used in messages and reported with the failure.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.site.name = Some(name.into());
        self
    }

    /// Tag failures with a kind adapters should raise instead of their default.
    pub fn with_custom_kind(mut self, kind: impl Into<String>) -> Self {
        self.site.custom_kind = Some(kind.into());
        self
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Debug> Assertion<T> {
    fn actual(&self) -> String {
        format!("{:?}", self.value)
    }

    /// Check `predicate` against the value, evaluating it exactly once.
    ///
    /// `template` may use `{actual}` and `{name}`.
    pub fn satisfies(self, predicate: impl FnOnce(&T) -> bool, template: &str) -> Self {
        let passed = predicate(&self.value);
        self.site.conclude(passed, || {
            let actual = self.actual();
            Failure::new(
                self.site.message(template, &actual, "<predicate>"),
                actual,
                "<predicate>",
            )
        });
        self
    }

    pub fn is_equal_to<E>(self, expected: E) -> Self
    where
        T: PartialEq<E>,
        E: Debug,
    {
        let passed = self.value == expected;
        self.site.conclude(passed, || {
            self.mismatch(
                "expected {name} to be {expected} but was {actual}",
                format!("{:?}", expected),
            )
        });
        self
    }

    pub fn is_not_equal_to<E>(self, unexpected: E) -> Self
    where
        T: PartialEq<E>,
        E: Debug,
    {
        let passed = self.value != unexpected;
        self.site.conclude(passed, || {
            self.mismatch(
                "expected {name} to differ from {expected}",
                format!("not {:?}", unexpected),
            )
        });
        self
    }

    /// Inclusive range check: `low <= value <= high`.
    pub fn is_between(self, low: T, high: T) -> Self
    where
        T: PartialOrd,
    {
        let passed = low <= self.value && self.value <= high;
        self.site.conclude(passed, || {
            self.mismatch(
                "expected {name} to be between {expected} but was {actual}",
                format!("{:?} and {:?} inclusive", low, high),
            )
        });
        self
    }

    /// Complement of [`is_between`](Self::is_between): `value < low || value > high`.
    pub fn is_not_between(self, low: T, high: T) -> Self
    where
        T: PartialOrd,
    {
        let passed = self.value < low || self.value > high;
        self.site.conclude(passed, || {
            self.mismatch(
                "expected {name} to be outside {expected} but was {actual}",
                format!("{:?} and {:?} inclusive", low, high),
            )
        });
        self
    }

    fn mismatch(&self, template: &str, expected: String) -> Failure {
        let actual = self.actual();
        Failure::new(self.site.message(template, &actual, &expected), actual, expected)
    }

    /// Deep structural comparison; every difference becomes a sub-failure.
    pub fn is_structurally_equal_to<E>(self, expected: &E) -> Self
    where
        T: Describe,
        E: Describe + Debug,
    {
        let config = Configuration::current();
        let differences = config.comparator().compare(&self.value, expected);
        self.site.conclude(differences.is_empty(), || {
            let actual = self.actual();
            let expected = format!("{:?}", expected);
            let message = format!(
                "{} ({} difference(s))",
                self.site.message(
                    "expected {name} to be structurally equal to {expected}",
                    &actual,
                    &expected
                ),
                differences.len()
            );
            Failure::from_differences(message, actual, expected, &differences, config.max_sub_failures)
        });
        self
    }

    /// Floating-point comparison with a relative tolerance. Without an
    /// explicit `epsilon` the configured default applies.
    pub fn is_approximately(self, expected: f64, epsilon: Option<f64>) -> Self
    where
        T: Copy + Into<f64>,
    {
        let epsilon = epsilon.unwrap_or_else(|| Configuration::current().tolerance_default);
        let actual: f64 = self.value.into();
        let passed = crate::approx::approximately_equal(actual, expected, epsilon);
        self.site.conclude(passed, || {
            self.mismatch(
                "expected {name} to be approximately {expected} but was {actual}",
                format!("{:?} ± {:e}", expected, epsilon),
            )
        });
        self
    }

    fn multiset_check<I, E>(
        &self,
        expected: &[E],
        template: &str,
        holds: impl FnOnce(multiset::Relation) -> bool,
    ) where
        T: AsRef<[I]>,
        I: Describe,
        E: Describe + Debug,
    {
        let comparator: Comparator = Configuration::current().comparator();
        let actual = self.value.as_ref();
        let histogram = multiset::histogram(actual, expected, &comparator);
        let passed = holds(histogram.relation());
        self.site.conclude(passed, || {
            let actual_text = self.actual();
            let expected_text = format!("{:?}", expected);
            let mut subs = Vec::new();
            for item in histogram.right_surplus() {
                subs.push(Failure::new(format!("missing element {}", item), "", item));
            }
            for item in histogram.left_surplus() {
                subs.push(Failure::new(format!("unexpected element {}", item), item, ""));
            }
            Failure::new(
                self.site.message(template, &actual_text, &expected_text),
                actual_text,
                expected_text,
            )
            .with_sub_failures(subs)
        });
    }

    /// Same elements with the same multiplicities, in any order.
    pub fn is_equivalent_to<I, E>(self, expected: &[E]) -> Self
    where
        T: AsRef<[I]>,
        I: Describe,
        E: Describe + Debug,
    {
        self.multiset_check(
            expected,
            "expected {name} to be equivalent to {expected} in any order but was {actual}",
            |r| r == multiset::Relation::Equivalent,
        );
        self
    }

    /// The value holds every element of `expected`, possibly more.
    pub fn contains_all<I, E>(self, expected: &[E]) -> Self
    where
        T: AsRef<[I]>,
        I: Describe,
        E: Describe + Debug,
    {
        self.multiset_check(
            expected,
            "expected {name} to contain all of {expected} but was {actual}",
            |r| r.left_contains_right(),
        );
        self
    }

    /// Every element of the value appears in `expected`.
    pub fn is_contained_in<I, E>(self, expected: &[E]) -> Self
    where
        T: AsRef<[I]>,
        I: Describe,
        E: Describe + Debug,
    {
        self.multiset_check(
            expected,
            "expected every element of {name} to appear in {expected} but was {actual}",
            |r| r.left_within_right(),
        );
        self
    }
}

impl<T: Serialize> Assertion<T> {
    fn serialized(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.value)
    }

    /// Serialize the value and compare it with a JSON document.
    pub fn matches_json(self, expected: &serde_json::Value) -> Self {
        let config = Configuration::current();
        match self.serialized() {
            Ok(actual) => {
                let comparator = JsonComparator::from(config.comparator());
                let differences = compare_json(&actual, expected, &comparator);
                self.site.conclude(differences.is_empty(), || {
                    Failure::from_differences(
                        format!(
                            "expected {} to match JSON ({} difference(s))",
                            self.site.display_name(),
                            differences.len()
                        ),
                        actual.to_string(),
                        expected.to_string(),
                        &differences,
                        config.max_sub_failures,
                    )
                });
            }
            Err(err) => self.site.fail(Failure::new(
                format!("could not serialize {}: {}", self.site.display_name(), err),
                "<unserializable>",
                expected.to_string(),
            )),
        }
        self
    }

    /// Compare the value with the stored snapshot `name`, writing the
    /// baseline when it does not exist yet.
    pub fn matches_snapshot(self, store: &SnapshotStore, name: &str) -> Self {
        let config = Configuration::current();
        let comparator = JsonComparator::from(config.comparator());
        match store.verify(name, &self.value, &comparator) {
            Ok(SnapshotOutcome::Mismatched {
                expected_digest,
                actual_digest,
                differences,
            }) => self.site.fail(Failure::from_differences(
                format!(
                    "snapshot '{}' does not match ({} difference(s))",
                    name,
                    differences.len()
                ),
                actual_digest,
                expected_digest,
                &differences,
                config.max_sub_failures,
            )),
            Ok(_) => self.site.pass(),
            Err(err) => self.site.fail(Failure::new(
                format!("snapshot '{}' could not be verified: {}", name, err),
                err.code(),
                store.path_for(name).display().to_string(),
            )),
        }
        self
    }
}

impl<F, R> Assertion<F>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    /// Run the action on a background thread and check that it finishes
    /// within `limit`. An overrunning action keeps running detached.
    ///
    /// Returns the action's output when it finished in time.
    pub fn completes_within(self, limit: Duration) -> Option<R> {
        let Assertion { value, site } = self;
        let (tx, rx) = mpsc::channel();
        let job = context::bind(value);
        let spawned = std::thread::Builder::new()
            .name("probity-deadline".to_string())
            .spawn(move || {
                // The receiver is gone once the deadline has passed.
                let _ = tx.send(job());
            });
        if let Err(err) = spawned {
            site.fail(Failure::new(
                format!("could not start {}: {}", site.display_name(), err),
                "not started",
                format!("{:?}", limit),
            ));
            return None;
        }

        match rx.recv_timeout(limit) {
            Ok(output) => {
                site.pass();
                Some(output)
            }
            Err(RecvTimeoutError::Timeout) => {
                site.fail(Failure::new(
                    format!(
                        "expected {} to complete within {:?} but it was still running",
                        site.display_name(),
                        limit
                    ),
                    "still running",
                    format!("{:?}", limit),
                ));
                None
            }
            Err(RecvTimeoutError::Disconnected) => {
                site.fail(Failure::new(
                    format!("expected {} to complete but it panicked", site.display_name()),
                    "panicked",
                    format!("{:?}", limit),
                ));
                None
            }
        }
    }
}

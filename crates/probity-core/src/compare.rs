//! Structural comparison engine.
//!
//! [`Comparator::compare`] walks two described values in lockstep and returns
//! every localized disagreement as a [`Difference`]. Mismatches are the
//! result, never an error: comparison of deep or cyclic inputs always
//! terminates, reporting `TooDeep` differences at the depth bound and
//! treating a revisited shared pointer as equal.
//!
//! ## Guarantees
//!
//! - **Determinism**: identical inputs produce identical difference lists,
//!   ordered by actual-side traversal with expected-only entries last.
//! - **Ordered sequences**: sequences compare pairwise by index. Unordered
//!   comparison is the job of [`crate::multiset`].
//! - **Tolerance**: only float-vs-float scalars use the approximate rule.

use crate::approx::{approximately_equal, DEFAULT_EPSILON};
use crate::config::Configuration;
use crate::describe::{short_type_name, Child, Describe, Scalar, Shape};
use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Default bound on member/index descent.
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// Summary used for the absent side of a `Missing`/`Unexpected` difference.
pub const ABSENT: &str = "<absent>";

/// One step in a [`ComparisonPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Named member of an object
    Member(String),
    /// Position in a sequence
    Index(usize),
    /// Rendered key of a map entry
    Key(String),
}

/// Location of a difference inside the compared values.
///
/// Paths are immutable: descending produces a new path with one more
/// segment appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ComparisonPath {
    segments: Vec<PathSegment>,
}

impl ComparisonPath {
    /// The empty path, naming the compared values themselves.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn member(&self, name: impl Into<String>) -> Self {
        self.with(PathSegment::Member(name.into()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.with(PathSegment::Index(index))
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        self.with(PathSegment::Key(key.into()))
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    fn with(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self { segments }
    }
}

impl fmt::Display for ComparisonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Member(name) if i == 0 => write!(f, "{}", name)?,
                PathSegment::Member(name) => write!(f, ".{}", name)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
                PathSegment::Key(key) => write!(f, "[{}]", key)?,
            }
        }
        Ok(())
    }
}

impl Serialize for ComparisonPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Classification of a single difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DifferenceKind {
    /// Present in expected, absent in actual
    Missing,
    /// Present in actual, absent in expected
    Unexpected,
    /// Both present, values differ
    Mismatch,
    /// Both present, types or shape categories differ
    TypeMismatch,
    /// Sequences of different lengths
    CountMismatch,
    /// Recursion stopped at the depth bound
    TooDeep,
}

impl DifferenceKind {
    /// Stable lowercase label used in messages and reports.
    pub fn label(&self) -> &'static str {
        match self {
            DifferenceKind::Missing => "missing",
            DifferenceKind::Unexpected => "unexpected",
            DifferenceKind::Mismatch => "mismatch",
            DifferenceKind::TypeMismatch => "type mismatch",
            DifferenceKind::CountMismatch => "count mismatch",
            DifferenceKind::TooDeep => "too deep",
        }
    }
}

impl fmt::Display for DifferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One localized disagreement between two compared values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Difference {
    pub path: ComparisonPath,
    pub kind: DifferenceKind,
    /// Summary of the actual side
    pub actual: String,
    /// Summary of the expected side
    pub expected: String,
}

impl Difference {
    pub fn new(
        path: ComparisonPath,
        kind: DifferenceKind,
        actual: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self {
            path,
            kind,
            actual: actual.into(),
            expected: expected.into(),
        }
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}: expected {}, found {}",
            self.kind, self.path, self.expected, self.actual
        )
    }
}

/// Structural comparator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparator {
    epsilon: f64,
    max_depth: usize,
}

impl Default for Comparator {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Comparator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Comparator using the tolerance and depth bound of `config`.
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            epsilon: config.tolerance_default,
            max_depth: config.max_recursion_depth,
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Compare `actual` against `expected`, returning every difference.
    ///
    /// An empty result means the values are structurally equal.
    pub fn compare(&self, actual: &dyn Describe, expected: &dyn Describe) -> Vec<Difference> {
        let mut walk = Walk {
            comparator: self,
            visited: HashSet::new(),
            differences: Vec::new(),
        };
        walk.shapes(
            actual.describe(),
            expected.describe(),
            &ComparisonPath::root(),
            0,
        );
        tracing::trace!(
            component = module_path!(),
            op = "compare",
            diff_count = walk.differences.len(),
        );
        walk.differences
    }

    /// True when [`compare`](Self::compare) finds no differences.
    pub fn is_equal(&self, actual: &dyn Describe, expected: &dyn Describe) -> bool {
        self.compare(actual, expected).is_empty()
    }

    pub(crate) fn scalars_equal(&self, actual: &Scalar<'_>, expected: &Scalar<'_>) -> bool {
        match (actual, expected) {
            (Scalar::Float(a), Scalar::Float(e)) => approximately_equal(*a, *e, self.epsilon),
            (a, e) => a.exactly_equals(e),
        }
    }
}

/// State of one top-level comparison. `visited` holds every shared-pointer
/// identity reached so far in this call and is never reused across calls.
struct Walk<'c> {
    comparator: &'c Comparator,
    visited: HashSet<usize>,
    differences: Vec<Difference>,
}

impl Walk<'_> {
    fn push(
        &mut self,
        path: &ComparisonPath,
        kind: DifferenceKind,
        actual: impl Into<String>,
        expected: impl Into<String>,
    ) {
        self.differences
            .push(Difference::new(path.clone(), kind, actual, expected));
    }

    fn children(
        &mut self,
        actual: &Child<'_>,
        expected: &Child<'_>,
        path: &ComparisonPath,
        depth: usize,
    ) {
        self.shapes(actual.get().describe(), expected.get().describe(), path, depth);
    }

    fn shapes(
        &mut self,
        actual: Shape<'_>,
        expected: Shape<'_>,
        path: &ComparisonPath,
        depth: usize,
    ) {
        match (actual, expected) {
            (Shape::Indirect { identity, target }, expected) => match identity {
                // Each identity is walked once per call, so cycles stop and
                // shared subgraphs cost one visit.
                Some(id) => {
                    if !self.visited.insert(id) {
                        tracing::trace!(component = module_path!(), path = %path, "already visited");
                        return;
                    }
                    self.shapes(target.get().describe(), expected, path, depth);
                }
                None => self.shapes(target.get().describe(), expected, path, depth),
            },
            (actual, Shape::Indirect { target, .. }) => {
                self.shapes(actual, target.get().describe(), path, depth)
            }
            (Shape::Null, Shape::Null) => {}
            (Shape::Null, expected) => {
                self.push(path, DifferenceKind::Mismatch, "null", expected.summary())
            }
            (actual, Shape::Null) => {
                self.push(path, DifferenceKind::Mismatch, actual.summary(), "null")
            }
            (actual, expected)
                if depth > self.comparator.max_depth
                    && (actual.is_composite() || expected.is_composite()) =>
            {
                self.push(
                    path,
                    DifferenceKind::TooDeep,
                    actual.summary(),
                    expected.summary(),
                )
            }
            (
                Shape::Scalar {
                    type_name: actual_type,
                    value: actual_value,
                },
                Shape::Scalar {
                    type_name: expected_type,
                    value: expected_value,
                },
            ) => {
                if actual_type != expected_type && !path.is_root() {
                    self.push(
                        path,
                        DifferenceKind::TypeMismatch,
                        format!("{} ({})", actual_value, short_type_name(actual_type)),
                        format!("{} ({})", expected_value, short_type_name(expected_type)),
                    );
                } else if !self.comparator.scalars_equal(&actual_value, &expected_value) {
                    self.push(
                        path,
                        DifferenceKind::Mismatch,
                        actual_value.to_string(),
                        expected_value.to_string(),
                    );
                }
            }
            (Shape::Map(actual), Shape::Map(expected)) => {
                let expected_by_key: HashMap<&str, &Child<'_>> =
                    expected.iter().map(|(k, v)| (k.as_str(), v)).collect();
                for (key, value) in &actual {
                    let key_path = path.key(key.as_str());
                    match expected_by_key.get(key.as_str()) {
                        Some(expected_value) => {
                            self.children(value, expected_value, &key_path, depth + 1)
                        }
                        None => self.push(
                            &key_path,
                            DifferenceKind::Unexpected,
                            value.get().describe().summary(),
                            ABSENT,
                        ),
                    }
                }
                let actual_keys: HashSet<&str> = actual.iter().map(|(k, _)| k.as_str()).collect();
                for (key, value) in &expected {
                    if !actual_keys.contains(key.as_str()) {
                        self.push(
                            &path.key(key.as_str()),
                            DifferenceKind::Missing,
                            ABSENT,
                            value.get().describe().summary(),
                        );
                    }
                }
            }
            (Shape::Seq(actual), Shape::Seq(expected)) => {
                if actual.len() != expected.len() {
                    self.push(
                        path,
                        DifferenceKind::CountMismatch,
                        format!("{} items", actual.len()),
                        format!("{} items", expected.len()),
                    );
                    return;
                }
                for (index, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
                    self.children(a, e, &path.index(index), depth + 1);
                }
            }
            (
                Shape::Object {
                    members: actual, ..
                },
                Shape::Object {
                    members: expected, ..
                },
            ) => {
                let expected_by_name: HashMap<&str, &Child<'_>> =
                    expected.iter().map(|(k, v)| (*k, v)).collect();
                for (name, value) in &actual {
                    let member_path = path.member(*name);
                    match expected_by_name.get(name) {
                        Some(expected_value) => {
                            self.children(value, expected_value, &member_path, depth + 1)
                        }
                        None => self.push(
                            &member_path,
                            DifferenceKind::Unexpected,
                            value.get().describe().summary(),
                            ABSENT,
                        ),
                    }
                }
                let actual_names: HashSet<&str> = actual.iter().map(|(k, _)| *k).collect();
                for (name, value) in &expected {
                    if !actual_names.contains(name) {
                        self.push(
                            &path.member(*name),
                            DifferenceKind::Missing,
                            ABSENT,
                            value.get().describe().summary(),
                        );
                    }
                }
            }
            (actual, expected) => self.push(
                path,
                DifferenceKind::TypeMismatch,
                format!("{} ({})", actual.summary(), actual.category()),
                format!("{} ({})", expected.summary(), expected.category()),
            ),
        }
    }
}

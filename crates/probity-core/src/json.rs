//! Structural comparison of JSON trees.
//!
//! The walk mirrors [`crate::compare`] over `serde_json::Value`: object
//! members by key union, arrays by length then index, scalars by value. JSON
//! trees are acyclic, so there is no visited set; the depth bound still
//! applies.
//!
//! Numbers compare exactly when both sides are integers. Otherwise both are
//! read as `f64` and go through the approximate rule.

use crate::approx::approximately_equal;
use crate::compare::{Comparator, ComparisonPath, Difference, DifferenceKind, ABSENT};
use serde_json::{Map, Number, Value};
use std::collections::HashSet;

/// JSON comparator settings. Shares epsilon and depth bound with [`Comparator`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JsonComparator {
    settings: Comparator,
}

impl JsonComparator {
    pub fn new(settings: Comparator) -> Self {
        Self { settings }
    }

    pub fn with_epsilon(self, epsilon: f64) -> Self {
        Self::new(self.settings.with_epsilon(epsilon))
    }

    pub fn with_max_depth(self, max_depth: usize) -> Self {
        Self::new(self.settings.with_max_depth(max_depth))
    }

    pub fn compare(&self, actual: &Value, expected: &Value) -> Vec<Difference> {
        compare_json(actual, expected, self)
    }
}

impl From<Comparator> for JsonComparator {
    fn from(settings: Comparator) -> Self {
        Self::new(settings)
    }
}

/// Compare two JSON trees, returning every difference.
///
/// ```
/// use probity_core::json::{compare_json, JsonComparator};
/// use serde_json::json;
///
/// let diffs = compare_json(
///     &json!({"name": "Test", "value": 456}),
///     &json!({"name": "Test", "value": 123}),
///     &JsonComparator::default(),
/// );
/// assert_eq!(diffs.len(), 1);
/// assert_eq!(diffs[0].path.to_string(), "value");
/// ```
pub fn compare_json(actual: &Value, expected: &Value, comparator: &JsonComparator) -> Vec<Difference> {
    let mut out = Vec::new();
    walk(
        actual,
        expected,
        &ComparisonPath::root(),
        0,
        &comparator.settings,
        &mut out,
    );
    out
}

/// Short rendering of a JSON node for difference summaries.
pub fn summarize(value: &Value) -> String {
    match value {
        Value::Array(items) => format!("[{} items]", items.len()),
        Value::Object(members) => format!("{{{} entries}}", members.len()),
        scalar => scalar.to_string(),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

fn numbers_equal(actual: &Number, expected: &Number, epsilon: f64) -> bool {
    if let (Some(a), Some(e)) = (actual.as_i64(), expected.as_i64()) {
        return a == e;
    }
    if let (Some(a), Some(e)) = (actual.as_u64(), expected.as_u64()) {
        return a == e;
    }
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(e)) => approximately_equal(a, e, epsilon),
        _ => false,
    }
}

fn record(out: &mut Vec<Difference>, path: &ComparisonPath, kind: DifferenceKind, a: String, e: String) {
    out.push(Difference::new(path.clone(), kind, a, e));
}

fn walk(
    actual: &Value,
    expected: &Value,
    path: &ComparisonPath,
    depth: usize,
    settings: &Comparator,
    out: &mut Vec<Difference>,
) {
    match (actual, expected) {
        (Value::Null, Value::Null) => {}
        (Value::Null, _) | (_, Value::Null) => record(
            out,
            path,
            DifferenceKind::Mismatch,
            summarize(actual),
            summarize(expected),
        ),
        _ if depth > settings.max_depth() && (is_container(actual) || is_container(expected)) => {
            record(
                out,
                path,
                DifferenceKind::TooDeep,
                summarize(actual),
                summarize(expected),
            )
        }
        (Value::Bool(a), Value::Bool(e)) => {
            if a != e {
                record(out, path, DifferenceKind::Mismatch, a.to_string(), e.to_string())
            }
        }
        (Value::String(a), Value::String(e)) => {
            if a != e {
                record(
                    out,
                    path,
                    DifferenceKind::Mismatch,
                    summarize(actual),
                    summarize(expected),
                )
            }
        }
        (Value::Number(a), Value::Number(e)) => {
            if !numbers_equal(a, e, settings.epsilon()) {
                record(out, path, DifferenceKind::Mismatch, a.to_string(), e.to_string())
            }
        }
        (Value::Object(a), Value::Object(e)) => objects(a, e, path, depth, settings, out),
        (Value::Array(a), Value::Array(e)) => {
            if a.len() != e.len() {
                record(
                    out,
                    path,
                    DifferenceKind::CountMismatch,
                    format!("{} items", a.len()),
                    format!("{} items", e.len()),
                );
                return;
            }
            for (index, (a, e)) in a.iter().zip(e).enumerate() {
                walk(a, e, &path.index(index), depth + 1, settings, out);
            }
        }
        (a, e) if path.is_root() && !is_container(a) && !is_container(e) => {
            record(out, path, DifferenceKind::Mismatch, summarize(a), summarize(e))
        }
        (a, e) => record(
            out,
            path,
            DifferenceKind::TypeMismatch,
            format!("{} ({})", summarize(a), kind_name(a)),
            format!("{} ({})", summarize(e), kind_name(e)),
        ),
    }
}

fn objects(
    actual: &Map<String, Value>,
    expected: &Map<String, Value>,
    path: &ComparisonPath,
    depth: usize,
    settings: &Comparator,
    out: &mut Vec<Difference>,
) {
    for (key, value) in actual {
        let member = path.member(key.as_str());
        match expected.get(key) {
            Some(other) => walk(value, other, &member, depth + 1, settings, out),
            None => out.push(Difference::new(
                member,
                DifferenceKind::Unexpected,
                summarize(value),
                ABSENT,
            )),
        }
    }
    let seen: HashSet<&str> = actual.keys().map(String::as_str).collect();
    for (key, value) in expected {
        if !seen.contains(key.as_str()) {
            out.push(Difference::new(
                path.member(key.as_str()),
                DifferenceKind::Missing,
                ABSENT,
                summarize(value),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn diff(actual: Value, expected: Value) -> Vec<Difference> {
        compare_json(&actual, &expected, &JsonComparator::default())
    }

    #[test]
    fn test_identical_documents() {
        let doc = json!({"a": [1, 2, {"b": null}], "c": "x"});
        assert!(diff(doc.clone(), doc).is_empty());
    }

    #[test]
    fn test_nested_path_rendering() {
        let diffs = diff(
            json!({"orders": [{"qty": 1}, {"qty": 2}]}),
            json!({"orders": [{"qty": 1}, {"qty": 3}]}),
        );
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].path.to_string(), "orders[1].qty");
        assert_eq!(diffs[0].kind, DifferenceKind::Mismatch);
    }

    #[test]
    fn test_integers_compare_exactly() {
        let big = json!(9_007_199_254_740_993u64);
        let close = json!(9_007_199_254_740_992u64);
        assert_eq!(diff(big, close).len(), 1);
    }

    #[test]
    fn test_mixed_numbers_use_tolerance() {
        assert!(diff(json!(1), json!(1.0)).is_empty());
        let loose = JsonComparator::default().with_epsilon(0.01);
        assert!(compare_json(&json!(100.1), &json!(100), &loose).is_empty());
    }

    #[test]
    fn test_scalar_kind_mismatch_nested_vs_root() {
        assert_eq!(diff(json!("1"), json!(1))[0].kind, DifferenceKind::Mismatch);
        assert_eq!(
            diff(json!({"a": "1"}), json!({"a": 1}))[0].kind,
            DifferenceKind::TypeMismatch
        );
    }

    #[test]
    fn test_missing_and_unexpected_members() {
        let diffs = diff(json!({"a": 1, "b": 2}), json!({"a": 1, "c": 3}));
        let kinds: Vec<_> = diffs.iter().map(|d| (d.kind, d.path.to_string())).collect();
        assert_eq!(
            kinds,
            vec![
                (DifferenceKind::Unexpected, "b".to_string()),
                (DifferenceKind::Missing, "c".to_string()),
            ]
        );
    }

    #[test]
    fn test_array_length_mismatch() {
        let diffs = diff(json!([1, 2, 3]), json!([1, 2]));
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].kind, DifferenceKind::CountMismatch);
    }

    #[test]
    fn test_depth_bound_reports_once() {
        let mut deep = json!(0);
        for _ in 0..30 {
            deep = json!({ "next": deep });
        }
        let mut other = json!(1);
        for _ in 0..30 {
            other = json!({ "next": other });
        }
        let diffs = diff(deep, other);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].kind, DifferenceKind::TooDeep);
    }
}

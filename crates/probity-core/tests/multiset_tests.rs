#![allow(clippy::unwrap_used, clippy::expect_used)]

use probity_core::compare::Comparator;
use probity_core::multiset::{contains, is_contained_in, is_equivalent, relate, relate_maps, Relation};
use std::collections::HashMap;

#[test]
fn test_equivalent_ignores_order() {
    let cmp = Comparator::default();
    assert!(is_equivalent(&[3, 2, 4, 1], &[1, 2, 3, 4], &cmp));
}

#[test]
fn test_contains_checks_expected_against_actual() {
    let cmp = Comparator::default();
    assert!(contains(&[1, 2], &[1, 2, 3, 4], &cmp));
    assert!(!contains(&[1, 5], &[1, 2, 3, 4], &cmp));
}

#[test]
fn test_missing_element_breaks_equivalence() {
    let cmp = Comparator::default();
    assert!(!is_equivalent(&[1, 2, 3], &[1, 2, 3, 4], &cmp));
}

#[test]
fn test_is_contained_in_direction() {
    let cmp = Comparator::default();
    assert!(is_contained_in(&[1, 2, 3, 4], &[2, 4], &cmp));
    assert!(!is_contained_in(&[2, 4], &[1, 2, 3, 4], &cmp));
}

#[test]
fn test_float_elements_match_within_tolerance() {
    let cmp = Comparator::default();
    assert_eq!(
        relate(&[1.000_000_1, 2.0], &[2.0, 1.0], &cmp),
        Relation::Equivalent
    );
    assert_eq!(
        relate(&[1.000_000_1, 2.0], &[2.0, 1.0], &cmp.with_epsilon(0.0)),
        Relation::Unrelated
    );
}

#[test]
fn test_strings_compare_by_value() {
    let cmp = Comparator::default();
    let actual = vec!["b".to_string(), "a".to_string()];
    assert!(is_equivalent(&["a", "b"], &actual, &cmp));
}

#[test]
fn test_map_exclusion_skips_key_on_both_sides() {
    let cmp = Comparator::default();
    let actual: HashMap<i32, f64> = [(1, 11.0), (2, 2.0), (3, 3.0)].into_iter().collect();
    let expected: HashMap<i32, f64> = [(1, 11.0), (2, 22.0), (3, 3.0)].into_iter().collect();

    assert_eq!(
        relate_maps(&actual, &expected, |k| *k == 2, &cmp),
        Relation::Equivalent
    );
    assert_eq!(
        relate_maps(&actual, &expected, |_| false, &cmp),
        Relation::Unrelated
    );
}

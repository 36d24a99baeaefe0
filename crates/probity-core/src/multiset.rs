//! Order-independent collection comparison.
//!
//! Elements are counted in a histogram: +1 for every left occurrence and −1
//! for every right occurrence. Buckets are found by structural equality
//! through a [`Comparator`] rather than by hashing, so float tolerance
//! applies to elements the same way it applies to scalars.
//!
//! | Final counts | Relation |
//! |---|---|
//! | all zero | [`Relation::Equivalent`] |
//! | all ≥ 0 | [`Relation::Superset`] (left contains right) |
//! | all ≤ 0 | [`Relation::Subset`] (left is contained in right) |
//! | mixed | [`Relation::Unrelated`] |

use crate::compare::Comparator;
use crate::describe::Describe;

/// Relation of a left multiset to a right one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Equivalent,
    /// Left holds every element of right, and more
    Superset,
    /// Every element of left appears in right, which holds more
    Subset,
    Unrelated,
}

impl Relation {
    /// Left holds at least every element of right.
    pub fn left_contains_right(&self) -> bool {
        matches!(self, Relation::Equivalent | Relation::Superset)
    }

    /// Every element of left appears in right.
    pub fn left_within_right(&self) -> bool {
        matches!(self, Relation::Equivalent | Relation::Subset)
    }
}

struct Bucket<'a> {
    representative: &'a dyn Describe,
    count: i64,
}

/// Signed element counts for a left/right pair of collections.
pub struct Histogram<'a> {
    comparator: Comparator,
    buckets: Vec<Bucket<'a>>,
}

impl<'a> Histogram<'a> {
    pub fn new(comparator: &Comparator) -> Self {
        Self {
            comparator: *comparator,
            buckets: Vec::new(),
        }
    }

    /// Count one left occurrence.
    pub fn add_left(&mut self, item: &'a dyn Describe) {
        self.bump(item, 1);
    }

    /// Count one right occurrence.
    pub fn add_right(&mut self, item: &'a dyn Describe) {
        self.bump(item, -1);
    }

    fn bump(&mut self, item: &'a dyn Describe, delta: i64) {
        let comparator = self.comparator;
        match self
            .buckets
            .iter_mut()
            .find(|b| comparator.is_equal(item, b.representative))
        {
            Some(bucket) => bucket.count += delta,
            None => self.buckets.push(Bucket {
                representative: item,
                count: delta,
            }),
        }
    }

    pub fn relation(&self) -> Relation {
        let any_positive = self.buckets.iter().any(|b| b.count > 0);
        let any_negative = self.buckets.iter().any(|b| b.count < 0);
        match (any_positive, any_negative) {
            (false, false) => Relation::Equivalent,
            (true, false) => Relation::Superset,
            (false, true) => Relation::Subset,
            (true, true) => Relation::Unrelated,
        }
    }

    /// Summaries of elements left holds more often than right, with multiplicity.
    pub fn left_surplus(&self) -> Vec<String> {
        self.expand(|count| count > 0)
    }

    /// Summaries of elements right holds more often than left, with multiplicity.
    pub fn right_surplus(&self) -> Vec<String> {
        self.expand(|count| count < 0)
    }

    fn expand(&self, select: impl Fn(i64) -> bool) -> Vec<String> {
        let mut out = Vec::new();
        for bucket in self.buckets.iter().filter(|b| select(b.count)) {
            let summary = bucket.representative.describe().summary();
            for _ in 0..bucket.count.unsigned_abs() {
                out.push(summary.clone());
            }
        }
        out
    }
}

/// Build the histogram for `left` against `right`.
pub fn histogram<'a, L, R>(left: &'a [L], right: &'a [R], comparator: &Comparator) -> Histogram<'a>
where
    L: Describe,
    R: Describe,
{
    let mut histogram = Histogram::new(comparator);
    for item in left {
        histogram.add_left(item);
    }
    for item in right {
        histogram.add_right(item);
    }
    histogram
}

/// Relation of `left` to `right`.
pub fn relate<L, R>(left: &[L], right: &[R], comparator: &Comparator) -> Relation
where
    L: Describe,
    R: Describe,
{
    histogram(left, right, comparator).relation()
}

/// Same elements with the same multiplicities, in any order.
///
/// ```
/// use probity_core::compare::Comparator;
/// use probity_core::multiset::is_equivalent;
///
/// let cmp = Comparator::default();
/// assert!(is_equivalent(&[1, 2, 3, 4], &[3, 2, 4, 1], &cmp));
/// assert!(!is_equivalent(&[1, 2, 3, 4], &[1, 2, 3], &cmp));
/// ```
pub fn is_equivalent<E, A>(expected: &[E], actual: &[A], comparator: &Comparator) -> bool
where
    E: Describe,
    A: Describe,
{
    relate(actual, expected, comparator) == Relation::Equivalent
}

/// `actual` holds every element of `expected`.
///
/// ```
/// use probity_core::compare::Comparator;
/// use probity_core::multiset::contains;
///
/// assert!(contains(&[1, 2], &[1, 2, 3, 4], &Comparator::default()));
/// ```
pub fn contains<E, A>(expected: &[E], actual: &[A], comparator: &Comparator) -> bool
where
    E: Describe,
    A: Describe,
{
    relate(actual, expected, comparator).left_contains_right()
}

/// Every element of `actual` appears in `expected`.
pub fn is_contained_in<E, A>(expected: &[E], actual: &[A], comparator: &Comparator) -> bool
where
    E: Describe,
    A: Describe,
{
    relate(actual, expected, comparator).left_within_right()
}

/// Relation of two maps as multisets of `(key, value)` entries.
///
/// Entries whose key matches `exclude` are skipped on both sides.
pub fn relate_maps<'a, K, V, A, E, F>(
    actual: A,
    expected: E,
    exclude: F,
    comparator: &Comparator,
) -> Relation
where
    K: Describe + 'a,
    V: Describe + 'a,
    A: IntoIterator<Item = (&'a K, &'a V)>,
    E: IntoIterator<Item = (&'a K, &'a V)>,
    F: Fn(&K) -> bool,
{
    let left: Vec<(&K, &V)> = actual.into_iter().filter(|(k, _)| !exclude(*k)).collect();
    let right: Vec<(&K, &V)> = expected.into_iter().filter(|(k, _)| !exclude(*k)).collect();
    relate(&left, &right, comparator)
}

//! Floating-point equality rules.
//!
//! Two rules exist. The tolerant rule bounds the relative error by the
//! expected magnitude:
//!
//! ```text
//! |actual - expected| <= epsilon * max(1, |expected|)
//! ```
//!
//! so values near zero fall back to an absolute bound of `epsilon`. The
//! exact rule bypasses tolerance entirely and requires bit-identical values.

/// Default tolerance used when neither the caller nor the configuration
/// supplies one.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Relative-tolerance comparison.
///
/// Two NaNs are considered equal; infinities are equal only to an infinity
/// of the same sign.
///
/// ```
/// use probity_core::approx::approximately_equal;
///
/// assert!(approximately_equal(100.1, 100.0, 0.01));
/// assert!(!approximately_equal(100.1, 100.0, 0.000001));
/// ```
pub fn approximately_equal(actual: f64, expected: f64, epsilon: f64) -> bool {
    if actual.is_nan() || expected.is_nan() {
        return actual.is_nan() && expected.is_nan();
    }
    if actual.is_infinite() || expected.is_infinite() {
        return actual == expected;
    }
    (actual - expected).abs() <= epsilon * expected.abs().max(1.0)
}

/// Bit-exact comparison: `0.0` and `-0.0` differ, identical NaN payloads match.
pub fn exactly_equal(actual: f64, expected: f64) -> bool {
    actual.to_bits() == expected.to_bits()
}

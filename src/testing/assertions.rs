//! Assertions for pipeline outputs.

use crate::weather::Row;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Assert that two collections are equal in order and content.
///
/// # Panics
///
/// Panics if the collections differ in length or content.
pub fn assert_collections_equal<T: Debug + PartialEq>(actual: &[T], expected: &[T]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Collection length mismatch:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert_eq!(
            a, e,
            "Collection mismatch at index {i}:\n  Expected: {e:?}\n  Actual: {a:?}"
        );
    }
}

/// Assert that two collections hold the same elements with the same
/// multiplicities, ignoring order.
///
/// # Panics
///
/// Panics listing the missing and unexpected elements.
pub fn assert_collections_unordered_equal<T: Debug + Eq + Hash>(actual: &[T], expected: &[T]) {
    let mut counts: HashMap<&T, i64> = HashMap::new();
    for e in expected {
        *counts.entry(e).or_default() += 1;
    }
    for a in actual {
        *counts.entry(a).or_default() -= 1;
    }
    let missing: Vec<_> = counts.iter().filter(|(_, n)| **n > 0).map(|(t, _)| *t).collect();
    let extra: Vec<_> = counts.iter().filter(|(_, n)| **n < 0).map(|(t, _)| *t).collect();
    assert!(
        missing.is_empty() && extra.is_empty(),
        "Collection content mismatch:\n  Missing: {missing:?}\n  Extra: {extra:?}\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
}

fn close(a: Option<f64>, b: Option<f64>, rel_tol: f64) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            let scale = a.abs().max(b.abs()).max(1.0);
            (a - b).abs() <= rel_tol * scale
        }
        _ => false,
    }
}

/// Assert that one row matches another, comparing averages with a relative
/// tolerance (absolute below magnitude 1).
///
/// # Panics
///
/// Panics if the key columns differ or an average is outside the tolerance.
pub fn assert_row_approx_eq(actual: &Row, expected: &Row, rel_tol: f64) {
    assert_eq!(
        actual.sort_key(),
        expected.sort_key(),
        "Row key mismatch:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
    assert!(
        close(actual.avg_temperature, expected.avg_temperature, rel_tol)
            && close(actual.avg_windspeed, expected.avg_windspeed, rel_tol),
        "Row averages differ beyond {rel_tol}:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
}

/// Assert that two row sets match after sorting both by `(city, date)`.
///
/// # Panics
///
/// Panics on a count mismatch or on the first row that differs.
pub fn assert_rows_approx_eq(actual: &[Row], expected: &[Row], rel_tol: f64) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Row count mismatch:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
    let mut actual: Vec<&Row> = actual.iter().collect();
    let mut expected: Vec<&Row> = expected.iter().collect();
    actual.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    expected.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    for (a, e) in actual.into_iter().zip(expected) {
        assert_row_approx_eq(a, e, rel_tol);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(city: &str, t: f64) -> Row {
        Row {
            city: city.into(),
            date: "2024-03-01".into(),
            avg_temperature: Some(t),
            avg_windspeed: Some(1.0),
        }
    }

    #[test]
    fn unordered_comparison_respects_multiplicity() {
        assert_collections_unordered_equal(&[3, 1, 2, 1], &[1, 1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "Missing")]
    fn unordered_comparison_catches_a_missing_duplicate() {
        assert_collections_unordered_equal(&[1, 2], &[1, 1, 2]);
    }

    #[test]
    fn row_sets_compare_regardless_of_order() {
        assert_rows_approx_eq(
            &[row("NYC", 15.000_000_000_001), row("LA", 30.0)],
            &[row("LA", 30.0), row("NYC", 15.0)],
            1e-9,
        );
    }

    #[test]
    #[should_panic(expected = "averages differ")]
    fn rows_outside_tolerance_fail() {
        assert_row_approx_eq(&row("LA", 30.1), &row("LA", 30.0), 1e-9);
    }
}

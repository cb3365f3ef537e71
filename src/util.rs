//! Shared numeric helpers for the induction loop.
//!
//! The learner compares fractional instance weights all over the place;
//! a fixed tolerance keeps those comparisons stable across accumulation
//! order.

/// Tolerance for weight and gain comparisons.
pub(crate) const SMALL: f64 = 1e-6;

/// True if `a` is greater than `b` beyond the tolerance.
pub(crate) fn gr(a: f64, b: f64) -> bool {
    a - b > SMALL
}

/// True if `a` is smaller than `b` beyond the tolerance.
pub(crate) fn sm(a: f64, b: f64) -> bool {
    b - a > SMALL
}

/// True if `a` and `b` are equal within the tolerance.
pub(crate) fn eq(a: f64, b: f64) -> bool {
    a == b || ((a - b) < SMALL && (b - a) < SMALL)
}

/// True if `a` is greater than or equal to `b` within the tolerance.
pub(crate) fn gr_or_eq(a: f64, b: f64) -> bool {
    b - a < SMALL
}

/// Base-2 logarithm.
pub(crate) fn log2(x: f64) -> f64 {
    x.ln() / std::f64::consts::LN_2
}

/// Index of the first maximum element; 0 for an empty slice.
pub(crate) fn max_index(values: &[f64]) -> usize {
    let mut max = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[max] {
            max = i;
        }
    }
    max
}

/// Normalize `values` in place so they sum to one. No-op when the sum
/// is not strictly positive.
pub(crate) fn normalize(values: &mut [f64]) {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        for v in values.iter_mut() {
            *v /= sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerant_comparisons() {
        assert!(gr(1.0, 0.5));
        assert!(!gr(0.5 + 1e-9, 0.5));
        assert!(sm(0.5, 1.0));
        assert!(eq(0.5, 0.5 + 1e-9));
        assert!(gr_or_eq(0.5, 0.5));
        assert!(gr_or_eq(0.5 + 1e-9, 0.5));
        assert!(!gr_or_eq(0.4, 0.5));
    }

    #[test]
    fn test_log2() {
        assert!((log2(8.0) - 3.0).abs() < 1e-12);
        assert!((log2(1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_max_index_first_wins_ties() {
        assert_eq!(max_index(&[0.2, 0.5, 0.5, 0.1]), 1);
        assert_eq!(max_index(&[0.0, 0.0]), 0);
    }

    #[test]
    fn test_normalize() {
        let mut v = vec![1.0, 3.0];
        normalize(&mut v);
        assert!((v[0] - 0.25).abs() < 1e-12);
        assert!((v[1] - 0.75).abs() < 1e-12);

        let mut zeros = vec![0.0, 0.0];
        normalize(&mut zeros);
        assert_eq!(zeros, vec![0.0, 0.0]);
    }
}

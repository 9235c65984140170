//! Differencing and its inverse.

/// Difference a series `d` times.
///
/// # Arguments
/// * `series` - Input series
/// * `d` - Number of differencing rounds
///
/// # Returns
/// The differenced series, `d` values shorter; empty when the input is too
/// short to difference `d` times.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            return vec![];
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Undo `d` rounds of differencing for values that continue `history`.
///
/// # Arguments
/// * `differenced` - Future values on the `d`-times differenced scale
/// * `history` - Observed series the future values continue
/// * `d` - Number of differencing rounds to undo
///
/// # Returns
/// The future values on the original scale, anchored on the last values of
/// `history`.
pub fn integrate(differenced: &[f64], history: &[f64], d: usize) -> Vec<f64> {
    let mut result = differenced.to_vec();
    for level in (0..d).rev() {
        let anchor = difference(history, level).last().copied().unwrap_or(0.0);
        result = result
            .iter()
            .scan(anchor, |acc, &step| {
                *acc += step;
                Some(*acc)
            })
            .collect();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn first_difference() {
        assert_eq!(difference(&[1.0, 3.0, 6.0, 10.0], 1), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn zero_order_is_identity() {
        assert_eq!(difference(&[4.0, 2.0], 0), vec![4.0, 2.0]);
    }

    #[test]
    fn too_short_to_difference() {
        assert!(difference(&[5.0], 1).is_empty());
        assert!(difference(&[], 1).is_empty());
        assert!(difference(&[1.0, 2.0], 2).is_empty());
    }

    #[test]
    fn constant_series_differences_to_zero() {
        assert_eq!(difference(&[100.0; 4], 1), vec![0.0; 3]);
    }

    #[test]
    fn integrate_continues_from_last_level() {
        let history = vec![10.0, 12.0, 15.0];
        let out = integrate(&[1.0, -2.0, 0.5], &history, 1);

        assert_relative_eq!(out[0], 16.0, epsilon = 1e-12);
        assert_relative_eq!(out[1], 14.0, epsilon = 1e-12);
        assert_relative_eq!(out[2], 14.5, epsilon = 1e-12);
    }

    #[test]
    fn integrate_order_two_extends_quadratic() {
        let history: Vec<f64> = (0..5).map(|i| (i * i) as f64).collect();
        // Second differences of i^2 are constant 2.
        let out = integrate(&[2.0, 2.0], &history, 2);

        assert_relative_eq!(out[0], 25.0, epsilon = 1e-12);
        assert_relative_eq!(out[1], 36.0, epsilon = 1e-12);
    }
}

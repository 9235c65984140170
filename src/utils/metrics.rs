//! Accuracy metrics for forecast evaluation.
//!
//! All functions compare an `actual` sequence against an index-aligned
//! `predicted` sequence. Errors are non-negative by construction; the relative
//! error is either finite and non-negative or `+inf` when the scale is undefined.

use crate::error::{ForecastError, Result};

/// Accuracy of one prediction window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracyMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean of the actual values (the scale used for relative error)
    pub actual_mean: f64,
}

impl AccuracyMetrics {
    /// MAE as a percentage of the mean actual value.
    pub fn relative_error_pct(&self) -> f64 {
        relative_error_pct(self.mae, self.actual_mean)
    }
}

/// Compute MAE, RMSE and the actual mean in one call.
pub fn calculate_metrics(actual: &[f64], predicted: &[f64]) -> Result<AccuracyMetrics> {
    check_aligned(actual, predicted)?;
    Ok(AccuracyMetrics {
        mae: mean_of(actual, predicted, |e| e.abs()),
        rmse: mean_of(actual, predicted, |e| e * e).sqrt(),
        actual_mean: actual.iter().sum::<f64>() / actual.len() as f64,
    })
}

/// Mean absolute error.
///
/// # Example
/// ```
/// use atm_forecast::utils::metrics::mae;
///
/// assert_eq!(mae(&[1.0, 2.0, 3.0], &[2.0, 2.0, 1.0]).unwrap(), 1.0);
/// ```
pub fn mae(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_aligned(actual, predicted)?;
    Ok(mean_of(actual, predicted, |e| e.abs()))
}

/// Root mean squared error.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_aligned(actual, predicted)?;
    Ok(mean_of(actual, predicted, |e| e * e).sqrt())
}

/// Test MAE as a percentage of the test-window mean.
///
/// A zero mean leaves the scale undefined; that is reported as `+inf`
/// ("worst case") rather than as a division error.
pub fn relative_error_pct(test_mae: f64, test_actual_mean: f64) -> f64 {
    if test_actual_mean == 0.0 {
        return f64::INFINITY;
    }
    (test_mae / test_actual_mean * 100.0).abs()
}

/// Whether a relative error value signals an undefined scale.
pub fn is_undefined_scale(relative_error_pct: f64) -> bool {
    relative_error_pct == f64::INFINITY
}

fn check_aligned(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() {
        return Err(ForecastError::LengthMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    Ok(())
}

fn mean_of(actual: &[f64], predicted: &[f64], loss: impl Fn(f64) -> f64) -> f64 {
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| loss(a - p))
        .sum::<f64>()
        / actual.len() as f64
}

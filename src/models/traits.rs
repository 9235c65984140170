//! Interface between the evaluation sweep and a forecasting model.

use std::ops::Range;

use crate::core::ExogMatrix;
use crate::error::Result;

/// A model that can be fitted to a target series with exogenous regressors.
///
/// Fitting takes `&self` and returns a separate fitted value, so one
/// configured model can be shared across worker threads.
pub trait ExogForecaster: Send + Sync {
    /// Parameters produced by a successful fit.
    type Fitted: FittedForecaster;

    /// Fit to `target`, one row of `exog` per observation.
    fn fit(&self, target: &[f64], exog: &ExogMatrix) -> Result<Self::Fitted>;

    /// Model name used in logs.
    fn name(&self) -> &str;
}

/// A fitted model able to produce point predictions.
pub trait FittedForecaster {
    /// Number of observations the model was fitted on.
    fn nobs(&self) -> usize;

    /// Predictions for indices `range`, counted from the first training
    /// observation. Rows of `future_exog` cover indices from `nobs()` on.
    fn predict(&self, range: Range<usize>, future_exog: &ExogMatrix) -> Result<Vec<f64>>;

    /// One-step-ahead predictions over the whole training window.
    fn fitted_values(&self) -> &[f64];
}

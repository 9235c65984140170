//! Linear regression with ARIMA(1,1,1) errors.
//!
//! The target level is explained by the covariates, and the regression
//! residual follows an ARIMA(1,1,1) process:
//!
//! ```text
//! y_t = x_t' beta + u_t,    (1 - phi B)(1 - B) u_t = (1 + theta B) e_t,    e_t ~ N(0, sigma^2)
//! ```
//!
//! Differencing both sides gives `dy_t = dx_t' beta + w_t` with `w_t` ARMA(1,1),
//! whose exact likelihood is evaluated by [`ArmaFilter`]. For fixed
//! `(phi, theta)` the likelihood is maximised in closed form over `beta`
//! (GLS on the filtered innovations) and `sigma^2`, so the numerical search
//! runs over two bounded coefficients only.

use std::ops::Range;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::ExogMatrix;
use crate::error::{ForecastError, Result};
use crate::models::arimax::diff::{difference, integrate};
use crate::models::arimax::kalman::{ArmaFilter, Innovations};
use crate::models::{ExogForecaster, FittedForecaster};
use crate::utils::linalg::NormalEquations;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};

/// Coefficient bound keeping the AR part stationary and the MA part invertible.
const COEF_BOUND: f64 = 0.99;

/// Relative ridge added to the GLS normal equations.
const RIDGE: f64 = 1e-8;

/// ARIMA order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ARIMASpec {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
    /// MA order (q)
    pub q: usize,
}

impl ARIMASpec {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Estimated parameters with `k` covariates: AR + MA + regression + noise variance.
    pub fn num_params(&self, k: usize) -> usize {
        self.p + self.q + k + 1
    }

    /// Smallest series length that can be fitted with `k` covariates.
    pub fn min_observations(&self, k: usize) -> usize {
        self.d + self.p + self.q + k + 2
    }
}

impl Default for ARIMASpec {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

/// Numerical controls for a single fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Maximum optimizer iterations.
    pub max_iter: usize,
    /// Optimizer tolerance on the per-observation negative log-likelihood.
    pub tolerance: f64,
    /// Wall-clock budget for one fit in milliseconds.
    pub max_fit_millis: Option<u64>,
    /// Treat hitting `max_iter` without converging as a fit failure.
    pub require_convergence: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            max_fit_millis: None,
            require_convergence: true,
        }
    }
}

impl FitOptions {
    fn optimizer_config(&self) -> NelderMeadConfig {
        NelderMeadConfig {
            max_iter: self.max_iter,
            tolerance: self.tolerance,
            initial_step: 0.1,
            max_duration: self.max_fit_millis.map(Duration::from_millis),
            ..Default::default()
        }
    }
}

/// Unfitted ARIMA(1,1,1) model with exogenous regressors.
///
/// Fitting borrows the model and returns an independent [`FittedARIMAX`],
/// so the same `ARIMAX` can fit any number of series.
#[derive(Debug, Clone, Default)]
pub struct ARIMAX {
    spec: ARIMASpec,
    options: FitOptions,
}

impl ARIMAX {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: FitOptions) -> Self {
        Self {
            spec: ARIMASpec::default(),
            options,
        }
    }

    pub fn spec(&self) -> ARIMASpec {
        self.spec
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// Estimate `phi`, `theta`, `beta` and `sigma^2` by maximum likelihood.
    ///
    /// `exog` must have one row per target observation. Numerical trouble
    /// (non-convergence, timeout, singular regression) is reported as
    /// [`ForecastError::FitFailure`].
    pub fn fit(&self, target: &[f64], exog: &ExogMatrix) -> Result<FittedARIMAX> {
        let n = target.len();
        let k = exog.ncols();
        if exog.nrows() != n {
            return Err(ForecastError::LengthMismatch {
                expected: n,
                got: exog.nrows(),
            });
        }
        let needed = self.spec.min_observations(k);
        if n < needed {
            return Err(ForecastError::InsufficientData { needed, got: n });
        }
        if target.iter().any(|v| !v.is_finite()) || exog.has_non_finite() {
            return Err(ForecastError::InvalidParameter(
                "fit inputs must be finite; coerce missing values first".to_string(),
            ));
        }

        let dy = difference(target, self.spec.d);
        let dx: Vec<Vec<f64>> = (0..k)
            .map(|j| difference(exog.column(j), self.spec.d))
            .collect();

        let search = nelder_mead(
            |coef| {
                concentrate(&ArmaFilter::new(coef[0], coef[1]), &dy, &dx)
                    .map_or(f64::INFINITY, |p| p.objective())
            },
            &[0.0, 0.0],
            Some(&[(-COEF_BOUND, COEF_BOUND), (-COEF_BOUND, COEF_BOUND)]),
            self.options.optimizer_config(),
        );

        if search.timed_out {
            return Err(ForecastError::FitFailure {
                reason: format!(
                    "timed out after {} iterations ({} ms budget)",
                    search.iterations,
                    self.options.max_fit_millis.unwrap_or_default()
                ),
            });
        }
        if !search.converged && self.options.require_convergence {
            return Err(ForecastError::FitFailure {
                reason: format!("did not converge after {} iterations", search.iterations),
            });
        }
        if !search.optimal_value.is_finite() {
            return Err(ForecastError::FitFailure {
                reason: "likelihood is not finite".to_string(),
            });
        }

        let (phi, theta) = (search.optimal_point[0], search.optimal_point[1]);
        let filter = ArmaFilter::new(phi, theta);
        let profile = concentrate(&filter, &dy, &dx).ok_or_else(|| ForecastError::FitFailure {
            reason: "regression system is singular".to_string(),
        })?;

        // Residual ARMA process and its one-step-ahead predictions.
        let regression: Vec<f64> = (0..dy.len())
            .map(|t| dot(&profile.beta, dx.iter().map(|c| c[t])))
            .collect();
        let w: Vec<f64> = dy.iter().zip(&regression).map(|(d, r)| d - r).collect();
        let residual_filter = filter.filter(&w);
        let w_hat = residual_filter.predictions(&w);

        // Level index t >= 1 corresponds to differenced index t - 1; index 0
        // has no lag history.
        let mut fitted = Vec::with_capacity(n);
        fitted.push(0.0);
        for t in 1..n {
            fitted.push(target[t - 1] + regression[t - 1] + w_hat[t - 1]);
        }

        let n_params = self.spec.num_params(k) as f64;
        let log_likelihood = profile.log_likelihood();
        let n_eff = profile.nobs as f64;

        debug!(
            phi,
            theta,
            sigma2 = profile.sigma2,
            iterations = search.iterations,
            "fitted ARIMAX(1,1,1)"
        );

        Ok(FittedARIMAX {
            spec: self.spec,
            phi,
            theta,
            beta: profile.beta,
            exog_names: exog.names().to_vec(),
            sigma2: profile.sigma2,
            log_likelihood,
            aic: -2.0 * log_likelihood + 2.0 * n_params,
            bic: -2.0 * log_likelihood + n_params * n_eff.ln(),
            converged: search.converged,
            iterations: search.iterations,
            target: target.to_vec(),
            last_exog_row: exog.row(n - 1),
            fitted: fitted.into_iter().map(finite_or_zero).collect(),
            residuals: residual_filter,
        })
    }
}

/// Likelihood with `beta` and `sigma^2` concentrated out, for fixed ARMA coefficients.
struct Profile {
    beta: Vec<f64>,
    sigma2: f64,
    sum_log_f: f64,
    nobs: usize,
}

impl Profile {
    fn log_sigma2(&self) -> f64 {
        self.sigma2.max(f64::MIN_POSITIVE).ln()
    }

    /// Per-observation negative log-likelihood, up to constants.
    fn objective(&self) -> f64 {
        self.log_sigma2() + self.sum_log_f / self.nobs as f64
    }

    fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -0.5 * (n * ((2.0 * std::f64::consts::PI).ln() + self.log_sigma2() + 1.0) + self.sum_log_f)
    }
}

fn concentrate(filter: &ArmaFilter, dy: &[f64], dx: &[Vec<f64>]) -> Option<Profile> {
    let vy = filter.filter(dy);
    let vx: Vec<Vec<f64>> = dx.iter().map(|c| filter.filter(c).errors).collect();

    let mut equations = NormalEquations::new(dx.len());
    let mut row = vec![0.0; dx.len()];
    for t in 0..dy.len() {
        for (r, col) in row.iter_mut().zip(&vx) {
            *r = col[t];
        }
        equations.add(&row, vy.errors[t], 1.0 / vy.variances[t]);
    }
    let beta = equations.solve(RIDGE * equations.max_diagonal().max(1.0))?;

    let mut ssr = 0.0;
    for t in 0..dy.len() {
        let v = vy.errors[t] - dot(&beta, vx.iter().map(|c| c[t]));
        ssr += v * v / vy.variances[t];
    }
    let sum_log_f = vy.variances.iter().map(|f| f.ln()).sum();

    let profile = Profile {
        beta,
        sigma2: ssr / dy.len() as f64,
        sum_log_f,
        nobs: dy.len(),
    };
    profile.objective().is_finite().then_some(profile)
}

fn dot(beta: &[f64], x: impl Iterator<Item = f64>) -> f64 {
    beta.iter().zip(x).map(|(b, x)| b * x).sum()
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Parameters and state of a fitted [`ARIMAX`].
///
/// Immutable once produced; owned by the run that fitted it.
#[derive(Debug, Clone)]
pub struct FittedARIMAX {
    spec: ARIMASpec,
    phi: f64,
    theta: f64,
    beta: Vec<f64>,
    exog_names: Vec<String>,
    sigma2: f64,
    log_likelihood: f64,
    aic: f64,
    bic: f64,
    converged: bool,
    iterations: usize,
    target: Vec<f64>,
    last_exog_row: Vec<f64>,
    fitted: Vec<f64>,
    residuals: Innovations,
}

impl FittedARIMAX {
    pub fn spec(&self) -> ARIMASpec {
        self.spec
    }

    /// AR coefficient `phi`.
    pub fn ar_coefficient(&self) -> f64 {
        self.phi
    }

    /// MA coefficient `theta`.
    pub fn ma_coefficient(&self) -> f64 {
        self.theta
    }

    /// Regression coefficients, in the order of [`FittedARIMAX::exog_names`].
    pub fn exog_coefficients(&self) -> &[f64] {
        &self.beta
    }

    pub fn exog_names(&self) -> &[String] {
        &self.exog_names
    }

    /// Innovation variance `sigma^2`.
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn bic(&self) -> f64 {
        self.bic
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Number of training observations.
    pub fn nobs(&self) -> usize {
        self.target.len()
    }

    /// One-step-ahead in-sample predictions, one per training observation.
    pub fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }

    /// One-step-ahead innovations of the differenced residual process.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals.errors
    }

    /// Point predictions for indices `range`, counted from the first
    /// training observation.
    ///
    /// Indices inside the training window get one-step-ahead predictions;
    /// indices past it are forecast recursively from the end of the training
    /// window using `future_exog`, whose row `h` holds the covariates of index
    /// `nobs + h`. Non-finite values are returned as 0.
    pub fn predict(&self, range: Range<usize>, future_exog: &ExogMatrix) -> Result<Vec<f64>> {
        if range.start > range.end {
            return Err(ForecastError::InvalidParameter(format!(
                "prediction range {}..{} is reversed",
                range.start, range.end
            )));
        }
        let n = self.nobs();
        let steps = range.end.saturating_sub(n);
        let forecast = if steps > 0 {
            self.forecast_steps(future_exog, steps)?
        } else {
            vec![]
        };

        Ok(range
            .map(|i| {
                if i < n {
                    self.fitted[i]
                } else {
                    finite_or_zero(forecast[i - n])
                }
            })
            .collect())
    }

    /// Recursive forecast for every row of `future_exog`.
    pub fn forecast(&self, future_exog: &ExogMatrix) -> Result<Vec<f64>> {
        let n = self.nobs();
        self.predict(n..n + future_exog.nrows(), future_exog)
    }

    fn forecast_steps(&self, future_exog: &ExogMatrix, steps: usize) -> Result<Vec<f64>> {
        if future_exog.ncols() != self.beta.len() {
            return Err(ForecastError::LengthMismatch {
                expected: self.beta.len(),
                got: future_exog.ncols(),
            });
        }
        if future_exog.nrows() < steps {
            return Err(ForecastError::LengthMismatch {
                expected: steps,
                got: future_exog.nrows(),
            });
        }

        let w_hat =
            ArmaFilter::new(self.phi, self.theta).propagate(self.residuals.next_state, steps);
        let mut previous = self.last_exog_row.clone();
        let mut diffs = Vec::with_capacity(steps);
        for (h, w) in w_hat.into_iter().enumerate() {
            let row = future_exog.row(h);
            let dx = row.iter().zip(&previous).map(|(x, p)| x - p);
            diffs.push(dot(&self.beta, dx) + w);
            previous = row;
        }

        Ok(integrate(&diffs, &self.target, self.spec.d))
    }
}

impl ExogForecaster for ARIMAX {
    type Fitted = FittedARIMAX;

    fn fit(&self, target: &[f64], exog: &ExogMatrix) -> Result<FittedARIMAX> {
        ARIMAX::fit(self, target, exog)
    }

    fn name(&self) -> &str {
        "ARIMAX(1,1,1)"
    }
}

impl FittedForecaster for FittedARIMAX {
    fn nobs(&self) -> usize {
        FittedARIMAX::nobs(self)
    }

    fn predict(&self, range: Range<usize>, future_exog: &ExogMatrix) -> Result<Vec<f64>> {
        FittedARIMAX::predict(self, range, future_exog)
    }

    fn fitted_values(&self) -> &[f64] {
        FittedARIMAX::fitted_values(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// y = 2 * x + u, u an ARIMA(1,1,1) with phi = 0.5, theta = 0.3.
    fn simulate(n: usize, seed: u64) -> (Vec<f64>, ExogMatrix) {
        let mut rng = StdRng::seed_from_u64(seed);
        let x: Vec<f64> = (0..n).map(|i| ((i % 7) as f64) * 10.0).collect();
        let mut u = 0.0;
        let mut w_prev = 0.0;
        let mut e_prev = 0.0;
        let mut y = Vec::with_capacity(n);
        for xi in &x {
            let e: f64 = rng.gen_range(-1.0..1.0);
            let w = 0.5 * w_prev + e + 0.3 * e_prev;
            u += w;
            y.push(500.0 + 2.0 * xi + u);
            w_prev = w;
            e_prev = e;
        }
        let exog = ExogMatrix::from_columns(vec![("DAY_OF_WEEK".into(), x)]).unwrap();
        (y, exog)
    }

    #[test]
    fn recovers_regression_coefficient() {
        let (y, exog) = simulate(300, 7);

        let model = ARIMAX::new().fit(&y, &exog).unwrap();

        assert!(model.converged());
        assert_relative_eq!(model.exog_coefficients()[0], 2.0, epsilon = 0.05);
        assert!(model.ar_coefficient().abs() < COEF_BOUND + 1e-12);
        assert!(model.ma_coefficient().abs() < COEF_BOUND + 1e-12);
        assert!(model.sigma2() > 0.0);
        assert_eq!(model.exog_names(), &["DAY_OF_WEEK".to_string()]);
    }

    #[test]
    fn fitted_values_cover_every_training_index() {
        let (y, exog) = simulate(60, 1);

        let model = ARIMAX::new().fit(&y, &exog).unwrap();

        assert_eq!(model.fitted_values().len(), 60);
        assert_eq!(model.fitted_values()[0], 0.0);
        assert!(model.fitted_values().iter().all(|v| v.is_finite()));
        assert_eq!(model.residuals().len(), 59);
    }

    #[test]
    fn one_step_predictions_track_the_series() {
        let (y, exog) = simulate(200, 3);

        let model = ARIMAX::new().fit(&y, &exog).unwrap();
        let fitted = model.fitted_values();
        let mae: f64 = y[1..]
            .iter()
            .zip(&fitted[1..])
            .map(|(a, p)| (a - p).abs())
            .sum::<f64>()
            / 199.0;

        // Innovations are uniform on [-1, 1].
        assert!(mae < 1.0, "mae = {mae}");
    }

    #[test]
    fn constant_series_is_predicted_exactly() {
        let y = vec![100.0; 40];
        let exog = ExogMatrix::from_columns(vec![("HOLIDAY".into(), vec![1.0; 40])]).unwrap();

        let model = ARIMAX::new().fit(&y, &exog).unwrap();

        for v in &model.fitted_values()[1..] {
            assert_relative_eq!(*v, 100.0, epsilon = 1e-9);
        }
        let future = ExogMatrix::from_columns(vec![("HOLIDAY".into(), vec![1.0; 5])]).unwrap();
        for v in model.forecast(&future).unwrap() {
            assert_relative_eq!(v, 100.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn forecast_follows_future_covariates() {
        // Noise-free regression: y = 3 * x exactly, so the ARMA part is flat.
        let x: Vec<f64> = (0..50).map(|i| ((i * 37) % 11) as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v).collect();
        let exog = ExogMatrix::from_columns(vec![("x".into(), x)]).unwrap();
        let options = FitOptions {
            require_convergence: false,
            ..Default::default()
        };

        let model = ARIMAX::with_options(options).fit(&y, &exog).unwrap();
        let future = ExogMatrix::from_columns(vec![("x".into(), vec![4.0, 9.0, 0.0])]).unwrap();
        let forecast = model.forecast(&future).unwrap();

        assert_relative_eq!(model.exog_coefficients()[0], 3.0, epsilon = 1e-6);
        assert_relative_eq!(forecast[0], 12.0, epsilon = 1e-4);
        assert_relative_eq!(forecast[1], 27.0, epsilon = 1e-4);
        assert_relative_eq!(forecast[2], 0.0, epsilon = 1e-4);
    }

    #[test]
    fn predict_spans_in_sample_and_out_of_sample() {
        let (y, exog) = simulate(80, 11);
        let (train_y, train_x) = (&y[..70], exog.slice(0, 70).unwrap());
        let test_x = exog.slice(70, 80).unwrap();

        let model = ARIMAX::new().fit(train_y, &train_x).unwrap();
        let both = model.predict(65..75, &test_x).unwrap();
        let ahead = model.forecast(&test_x).unwrap();

        assert_eq!(both.len(), 10);
        assert_eq!(&both[..5], &model.fitted_values()[65..70]);
        assert_eq!(&both[5..], &ahead[..5]);
    }

    #[test]
    fn works_without_covariates() {
        let (y, _) = simulate(60, 5);

        let model = ARIMAX::new().fit(&y, &ExogMatrix::empty(60)).unwrap();
        let forecast = model.forecast(&ExogMatrix::empty(4)).unwrap();

        assert!(model.exog_coefficients().is_empty());
        assert_eq!(forecast.len(), 4);
        assert!(forecast.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn insufficient_data() {
        let exog = ExogMatrix::from_columns(vec![
            ("a".into(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            ("b".into(), vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0]),
        ])
        .unwrap();
        let y = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

        let err = ARIMAX::new().fit(&y, &exog).unwrap_err();

        assert_eq!(err, ForecastError::InsufficientData { needed: 7, got: 6 });
    }

    #[test]
    fn misaligned_exog_is_rejected() {
        let exog = ExogMatrix::empty(9);
        let err = ARIMAX::new().fit(&[1.0; 10], &exog).unwrap_err();
        assert_eq!(
            err,
            ForecastError::LengthMismatch {
                expected: 10,
                got: 9
            }
        );
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let mut y = vec![1.0; 20];
        y[4] = f64::NAN;
        let err = ARIMAX::new().fit(&y, &ExogMatrix::empty(20)).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidParameter(_)));
    }

    #[test]
    fn zero_time_budget_is_a_fit_failure() {
        let (y, exog) = simulate(50, 2);
        let options = FitOptions {
            max_fit_millis: Some(0),
            ..Default::default()
        };

        let err = ARIMAX::with_options(options).fit(&y, &exog).unwrap_err();

        assert!(matches!(
            err,
            ForecastError::FitFailure { reason } if reason.contains("timed out")
        ));
    }

    #[test]
    fn iteration_cap_is_a_fit_failure_when_convergence_required() {
        let (y, exog) = simulate(50, 2);
        let strict = FitOptions {
            max_iter: 1,
            tolerance: 1e-15,
            ..Default::default()
        };

        let err = ARIMAX::with_options(strict.clone()).fit(&y, &exog).unwrap_err();
        assert!(matches!(err, ForecastError::FitFailure { .. }));

        let lenient = FitOptions {
            require_convergence: false,
            ..strict
        };
        let model = ARIMAX::with_options(lenient).fit(&y, &exog).unwrap();
        assert!(!model.converged());
    }

    #[test]
    fn future_exog_shape_is_checked() {
        let (y, exog) = simulate(40, 9);
        let model = ARIMAX::new().fit(&y, &exog).unwrap();

        let too_short = exog.slice(0, 2).unwrap();
        assert!(matches!(
            model.predict(40..45, &too_short),
            Err(ForecastError::LengthMismatch {
                expected: 5,
                got: 2
            })
        ));
        assert!(matches!(
            model.forecast(&ExogMatrix::empty(3)),
            Err(ForecastError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn information_criteria_are_finite() {
        let (y, exog) = simulate(100, 4);
        let model = ARIMAX::new().fit(&y, &exog).unwrap();

        assert!(model.log_likelihood().is_finite());
        assert!(model.aic() < model.bic());
        assert_eq!(model.nobs(), 100);
        assert_eq!(model.spec(), ARIMASpec::new(1, 1, 1));
    }

    #[test]
    fn refitting_is_deterministic() {
        let (y, exog) = simulate(120, 8);
        let a = ARIMAX::new().fit(&y, &exog).unwrap();
        let b = ARIMAX::new().fit(&y, &exog).unwrap();

        assert_eq!(a.ar_coefficient(), b.ar_coefficient());
        assert_eq!(a.ma_coefficient(), b.ma_coefficient());
        assert_eq!(a.fitted_values(), b.fitted_values());
    }
}

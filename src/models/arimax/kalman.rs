//! Exact Gaussian likelihood of an ARMA(1,1) process via a Kalman filter.
//!
//! The process `w_t = phi * w_{t-1} + e_t + theta * e_{t-1}` is written in
//! state-space form with state `a_t = (w_t, theta * e_t)`:
//!
//! ```text
//! a_{t+1} = [[phi, 1], [0, 0]] a_t + [1, theta]' e_{t+1}
//! w_t     = [1, 0] a_t
//! ```
//!
//! The filter starts from the stationary distribution, so no observations are
//! conditioned away. Variances are in units of the innovation variance, which
//! lets `sigma^2` be concentrated out of the likelihood.

/// Filter output for one observed sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Innovations {
    /// One-step-ahead prediction errors `v_t`.
    pub errors: Vec<f64>,
    /// Their variances `F_t` (relative to `sigma^2`); always >= 1.
    pub variances: Vec<f64>,
    /// Predicted state mean for the step after the last observation.
    pub next_state: [f64; 2],
}

impl Innovations {
    /// One-step-ahead predictions of the observations themselves.
    pub fn predictions(&self, observed: &[f64]) -> Vec<f64> {
        observed
            .iter()
            .zip(&self.errors)
            .map(|(y, v)| y - v)
            .collect()
    }
}

/// ARMA(1,1) filter for fixed coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmaFilter {
    phi: f64,
    theta: f64,
}

impl ArmaFilter {
    /// `phi` must lie strictly inside (-1, 1) for the stationary start to exist.
    pub fn new(phi: f64, theta: f64) -> Self {
        Self { phi, theta }
    }

    /// Stationary covariance of the state.
    pub fn initial_covariance(&self) -> [[f64; 2]; 2] {
        let (phi, theta) = (self.phi, self.theta);
        let gamma0 = (1.0 + 2.0 * phi * theta + theta * theta) / (1.0 - phi * phi);
        [[gamma0, theta], [theta, theta * theta]]
    }

    /// Run the filter over `observed`.
    pub fn filter(&self, observed: &[f64]) -> Innovations {
        let (phi, theta) = (self.phi, self.theta);
        let mut a = [0.0, 0.0];
        let mut p = self.initial_covariance();
        let mut errors = Vec::with_capacity(observed.len());
        let mut variances = Vec::with_capacity(observed.len());

        for &y in observed {
            let f = p[0][0];
            let v = y - a[0];
            errors.push(v);
            variances.push(f);

            // Measurement update.
            let k = [p[0][0] / f, p[1][0] / f];
            let a_upd = [a[0] + k[0] * v, a[1] + k[1] * v];
            let u00 = p[0][0] - k[0] * p[0][0];
            let u01 = p[0][1] - k[0] * p[0][1];
            let u11 = p[1][1] - k[1] * p[0][1];

            // Time update.
            a = [phi * a_upd[0] + a_upd[1], 0.0];
            let tpt = phi * phi * u00 + 2.0 * phi * u01 + u11;
            p = [[tpt + 1.0, theta], [theta, theta * theta]];
        }

        Innovations {
            errors,
            variances,
            next_state: a,
        }
    }

    /// Propagate a predicted state `horizon` steps with no new observations,
    /// returning the predicted observation at each step.
    pub fn propagate(&self, state: [f64; 2], horizon: usize) -> Vec<f64> {
        let mut a = state;
        let mut out = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            out.push(a[0]);
            a = [self.phi * a[0] + a[1], 0.0];
        }
        out
    }
}

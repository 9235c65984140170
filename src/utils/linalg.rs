//! Weighted least-squares normal equations for small regressor counts.
//!
//! Feature sets carry a handful of covariates, so the systems solved here are
//! tiny and a dense Cholesky factorisation is all that is needed.

/// Accumulates `X'WX` and `X'Wy` one observation at a time.
#[derive(Debug, Clone)]
pub struct NormalEquations {
    xtx: Vec<Vec<f64>>,
    xty: Vec<f64>,
}

impl NormalEquations {
    /// Create empty normal equations for `k` regressors.
    pub fn new(k: usize) -> Self {
        Self {
            xtx: vec![vec![0.0; k]; k],
            xty: vec![0.0; k],
        }
    }

    /// Number of regressors.
    pub fn dim(&self) -> usize {
        self.xty.len()
    }

    /// Largest diagonal entry of `X'WX`, used to scale regularisation.
    pub fn max_diagonal(&self) -> f64 {
        (0..self.dim()).map(|i| self.xtx[i][i]).fold(0.0, f64::max)
    }

    /// Add one observation `(x, y)` with weight `w`.
    pub fn add(&mut self, x: &[f64], y: f64, w: f64) {
        debug_assert_eq!(x.len(), self.dim());
        for i in 0..x.len() {
            let wxi = w * x[i];
            self.xty[i] += wxi * y;
            for j in 0..=i {
                self.xtx[i][j] += wxi * x[j];
            }
        }
    }

    /// Solve for the coefficients, adding `ridge` to the diagonal.
    ///
    /// Returns `None` when the (regularised) system is not positive definite.
    pub fn solve(&self, ridge: f64) -> Option<Vec<f64>> {
        let k = self.dim();
        let mut a = self.xtx.clone();
        for i in 0..k {
            for j in 0..i {
                a[j][i] = a[i][j];
            }
            a[i][i] += ridge;
        }
        solve_symmetric(&a, &self.xty)
    }
}

/// Solve `A x = b` for symmetric positive definite `A` by Cholesky decomposition.
pub fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n {
        return None;
    }
    if n == 0 {
        return Some(vec![]);
    }

    // A = L L'
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let sum = a[i][j] - (0..j).map(|k| l[i][k] * l[j][k]).sum::<f64>();
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][i] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // L z = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        z[i] = (b[i] - (0..i).map(|j| l[i][j] * z[j]).sum::<f64>()) / l[i][i];
    }

    // L' x = z
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        x[i] = (z[i] - ((i + 1)..n).map(|j| l[j][i] * x[j]).sum::<f64>()) / l[i][i];
    }

    Some(x)
}

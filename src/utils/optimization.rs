//! Bounded Nelder-Mead search used for likelihood maximisation.

use std::time::{Duration, Instant};

/// Outcome of a Nelder-Mead search.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// Best vertex found.
    pub optimal_point: Vec<f64>,
    /// Objective value at `optimal_point`.
    pub optimal_value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Number of objective evaluations.
    pub evaluations: usize,
    /// Whether the simplex met the tolerance before any limit was hit.
    pub converged: bool,
    /// Whether the wall-clock budget ran out.
    pub timed_out: bool,
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Convergence tolerance on the spread of objective values and on simplex size.
    pub tolerance: f64,
    /// Reflection coefficient (default: 1.0).
    pub alpha: f64,
    /// Expansion coefficient (default: 2.0).
    pub gamma: f64,
    /// Contraction coefficient (default: 0.5).
    pub rho: f64,
    /// Shrinkage coefficient (default: 0.5).
    pub sigma: f64,
    /// Initial simplex step size (default: 0.05).
    pub initial_step: f64,
    /// Optional wall-clock budget for the whole search.
    pub max_duration: Option<Duration>,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.05,
            max_duration: None,
        }
    }
}

/// Minimise `objective` starting from `initial`, clamping every vertex to `bounds`.
///
/// Non-finite objective values are treated as `+inf`, so a region where the
/// objective is undefined is simply never preferred. The search stops once
/// either the spread of objective values or the simplex radius drops below
/// `config.tolerance`.
///
/// # Arguments
/// * `objective` - The objective function to minimize
/// * `initial` - Initial guess for the optimal point
/// * `bounds` - Optional (min, max) bounds for each dimension
/// * `config` - Iteration, tolerance and wall-clock limits
///
/// # Returns
/// `NelderMeadResult` with the best vertex and whether the search converged
/// or ran out of time.
///
/// # Example
/// ```
/// use atm_forecast::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 0.4).powi(2) + (x[1] + 0.2).powi(2),
///     &[0.0, 0.0],
///     Some(&[(-0.99, 0.99), (-0.99, 0.99)]),
///     NelderMeadConfig::default(),
/// );
///
/// assert!(result.converged);
/// assert!((result.optimal_point[0] - 0.4).abs() < 1e-3);
/// assert!((result.optimal_point[1] + 0.2).abs() < 1e-3);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    if n == 0 {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: f64::NAN,
            iterations: 0,
            evaluations: 0,
            converged: false,
            timed_out: false,
        };
    }

    let started = Instant::now();
    let mut evaluations = 0usize;
    let mut eval = |point: &[f64]| {
        evaluations += 1;
        let value = objective(point);
        if value.is_finite() {
            value
        } else {
            f64::INFINITY
        }
    };

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(clamp(initial, bounds));
    for i in 0..n {
        let mut vertex = simplex[0].clone();
        let step = if vertex[i].abs() > 1e-10 {
            config.initial_step * vertex[i].abs()
        } else {
            config.initial_step
        };
        vertex[i] += step;
        // Stepping into a bound would collapse the simplex; step the other way.
        let clamped = clamp(&vertex, bounds);
        if (clamped[i] - simplex[0][i]).abs() < 1e-12 {
            vertex[i] -= 2.0 * step;
        }
        simplex.push(clamp(&vertex, bounds));
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    let mut iterations = 0;
    let mut converged = false;
    let mut timed_out = false;

    while iterations < config.max_iter {
        if let Some(budget) = config.max_duration {
            if started.elapsed() >= budget {
                timed_out = true;
                break;
            }
        }
        iterations += 1;

        let order = ranked(&values);
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        let spread = values[worst] - values[best];
        let centroid = centroid_without(&simplex, worst);
        let radius = simplex
            .iter()
            .map(|v| distance(v, &centroid))
            .fold(0.0, f64::max);
        if spread < config.tolerance || radius < config.tolerance {
            converged = true;
            break;
        }

        let reflected = clamp(&towards(&centroid, &simplex[worst], -config.alpha), bounds);
        let reflected_value = eval(&reflected);

        if reflected_value < values[best] {
            let expanded = clamp(&towards(&centroid, &reflected, config.gamma), bounds);
            let expanded_value = eval(&expanded);
            if expanded_value < reflected_value {
                simplex[worst] = expanded;
                values[worst] = expanded_value;
            } else {
                simplex[worst] = reflected;
                values[worst] = reflected_value;
            }
            continue;
        }

        if reflected_value < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = reflected_value;
            continue;
        }

        // Contract towards whichever of the reflected/worst vertex is better.
        let (anchor, anchor_value) = if reflected_value < values[worst] {
            (reflected, reflected_value)
        } else {
            (simplex[worst].clone(), values[worst])
        };
        let contracted = clamp(&towards(&centroid, &anchor, config.rho), bounds);
        let contracted_value = eval(&contracted);
        if contracted_value < anchor_value {
            simplex[worst] = contracted;
            values[worst] = contracted_value;
            continue;
        }

        let pivot = simplex[best].clone();
        for i in 0..=n {
            if i == best {
                continue;
            }
            simplex[i] = clamp(&towards(&pivot, &simplex[i], config.sigma), bounds);
            values[i] = eval(&simplex[i]);
        }
    }

    let best = ranked(&values)[0];

    NelderMeadResult {
        optimal_point: simplex[best].clone(),
        optimal_value: values[best],
        iterations,
        evaluations,
        converged,
        timed_out,
    }
}

/// Vertex indices ordered from best to worst objective value.
fn ranked(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

fn centroid_without(simplex: &[Vec<f64>], excluded: usize) -> Vec<f64> {
    let dims = simplex[0].len();
    let count = (simplex.len() - 1) as f64;
    let mut centroid = vec![0.0; dims];
    for (_, vertex) in simplex.iter().enumerate().filter(|(i, _)| *i != excluded) {
        for (c, x) in centroid.iter_mut().zip(vertex) {
            *c += x;
        }
    }
    centroid.iter_mut().for_each(|c| *c /= count);
    centroid
}

/// `origin + t * (point - origin)`; reflection, expansion, contraction and
/// shrinkage are all instances of this map.
fn towards(origin: &[f64], point: &[f64], t: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(point)
        .map(|(o, p)| o + t * (p - o))
        .collect()
}

fn clamp(point: &[f64], bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    match bounds {
        None => point.to_vec(),
        Some(b) => point
            .iter()
            .enumerate()
            .map(|(i, &x)| b.get(i).map_or(x, |&(lo, hi)| x.clamp(lo, hi)))
            .collect(),
    }
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

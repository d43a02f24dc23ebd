//! Derivative-free minimization (Nelder–Mead simplex).

use super::{FitBudget, ModelError, Result};

#[derive(Debug, Clone, Copy)]
pub struct NelderMeadOptions {
    pub max_iterations: usize,
    /// Converged when the spread of simplex values falls below
    /// `f_tol * (|f_best| + f_tol)`.
    pub f_tol: f64,
    /// ... or when every vertex is within `x_tol` of the best one.
    pub x_tol: f64,
    /// Initial simplex edge length (relative for non-zero coordinates).
    pub initial_step: f64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            f_tol: 1e-9,
            x_tol: 1e-8,
            initial_step: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
}

const ALPHA: f64 = 1.0;
const GAMMA: f64 = 2.0;
const RHO: f64 = 0.5;
const SIGMA: f64 = 0.5;

/// Minimize `f` from `x0`. Non-finite objective values are treated as +∞.
///
/// Returns `NotConverged` when the iteration cap is hit and `BudgetExceeded`
/// when the wall-clock budget runs out.
pub fn nelder_mead<F>(
    f: F,
    x0: &[f64],
    opts: &NelderMeadOptions,
    budget: &FitBudget,
) -> Result<Minimum>
where
    F: Fn(&[f64]) -> f64,
{
    let n = x0.len();
    let eval = |x: &[f64]| {
        let v = f(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    if n == 0 {
        return Ok(Minimum {
            x: Vec::new(),
            value: eval(x0),
            iterations: 0,
        });
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.to_vec());
    for i in 0..n {
        let mut v = x0.to_vec();
        v[i] = if v[i] == 0.0 {
            opts.initial_step
        } else {
            v[i] * (1.0 + opts.initial_step)
        };
        simplex.push(v);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    for iteration in 0..opts.max_iterations {
        budget.check()?;

        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let best = values[0];
        let worst = values[n];
        if best.is_finite() && worst.is_finite() {
            let f_spread = worst - best;
            let x_spread = simplex[1..]
                .iter()
                .flat_map(|v| v.iter().zip(&simplex[0]).map(|(a, b)| (a - b).abs()))
                .fold(0.0_f64, f64::max);
            if f_spread <= opts.f_tol * (best.abs() + opts.f_tol) || x_spread <= opts.x_tol {
                return Ok(Minimum {
                    x: simplex[0].clone(),
                    value: best,
                    iterations: iteration,
                });
            }
        }

        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|v| v[j]).sum::<f64>() / n as f64)
            .collect();
        let along = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&simplex[n])
                .map(|(c, w)| c + coef * (w - c))
                .collect()
        };

        let reflected = along(-ALPHA);
        let f_r = eval(&reflected);

        if f_r < values[0] {
            let expanded = along(-ALPHA * GAMMA);
            let f_e = eval(&expanded);
            if f_e < f_r {
                simplex[n] = expanded;
                values[n] = f_e;
            } else {
                simplex[n] = reflected;
                values[n] = f_r;
            }
            continue;
        }

        if f_r < values[n - 1] {
            simplex[n] = reflected;
            values[n] = f_r;
            continue;
        }

        let (contracted, f_c) = if f_r < values[n] {
            let c = along(-ALPHA * RHO);
            let fc = eval(&c);
            (c, fc)
        } else {
            let c = along(RHO);
            let fc = eval(&c);
            (c, fc)
        };
        if f_c < values[n].min(f_r) {
            simplex[n] = contracted;
            values[n] = f_c;
            continue;
        }

        // shrink toward the best vertex
        for i in 1..=n {
            let shrunk: Vec<f64> = simplex[0]
                .iter()
                .zip(&simplex[i])
                .map(|(b, v)| b + SIGMA * (v - b))
                .collect();
            values[i] = eval(&shrunk);
            simplex[i] = shrunk;
        }
    }

    Err(ModelError::NotConverged {
        iterations: opts.max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimizes_quadratic_bowl() {
        let f = |x: &[f64]| (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 1.0).powi(2);
        let m = nelder_mead(f, &[0.0, 0.0], &NelderMeadOptions::default(), &FitBudget::unlimited())
            .unwrap();
        assert!((m.x[0] - 3.0).abs() < 1e-4, "x0 = {}", m.x[0]);
        assert!((m.x[1] + 1.0).abs() < 1e-4, "x1 = {}", m.x[1]);
        assert!(m.value < 1e-8);
    }

    #[test]
    fn minimizes_rosenbrock() {
        let f = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let m = nelder_mead(
            f,
            &[-1.2, 1.0],
            &NelderMeadOptions::default(),
            &FitBudget::unlimited(),
        )
        .unwrap();
        assert!((m.x[0] - 1.0).abs() < 1e-3);
        assert!((m.x[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn flat_objective_converges_immediately() {
        let m = nelder_mead(
            |_| 0.0,
            &[0.0, 0.0, 0.0],
            &NelderMeadOptions::default(),
            &FitBudget::unlimited(),
        )
        .unwrap();
        assert_eq!(m.iterations, 0);
        assert_eq!(m.x, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn infinite_region_is_avoided() {
        let f = |x: &[f64]| {
            if x[0] < 0.5 {
                f64::NAN
            } else {
                (x[0] - 1.0).powi(2)
            }
        };
        let m = nelder_mead(f, &[2.0], &NelderMeadOptions::default(), &FitBudget::unlimited())
            .unwrap();
        assert!((m.x[0] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn iteration_cap_is_an_error() {
        let opts = NelderMeadOptions {
            max_iterations: 3,
            ..NelderMeadOptions::default()
        };
        let f = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        assert!(matches!(
            nelder_mead(f, &[-1.2, 1.0], &opts, &FitBudget::unlimited()),
            Err(ModelError::NotConverged { iterations: 3 })
        ));
    }
}

//! ARIMA(p, d, q) point forecasting.
//!
//! The series is differenced `d` times and an ARMA(p, q) is fitted to the
//! result by conditional sum of squares: the first `p` residuals are taken as
//! zero and the rest follow the ARMA recursion. The objective is minimized with
//! Nelder–Mead; parameter vectors whose AR part is non-stationary or whose MA
//! part is non-invertible score +∞.
//!
//! Forecasts run the recursion forward with future shocks at zero and are
//! integrated back `d` times.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::optimize::{nelder_mead, NelderMeadOptions};
use super::{FitBudget, ModelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Smallest series length that can be fitted (`p + d + q + 1`).
    pub fn min_observations(&self) -> usize {
        self.p + self.d + self.q + 1
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self::new(2, 1, 2)
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

#[derive(Debug, Clone)]
pub struct ArimaModel {
    order: ArimaOrder,
    options: NelderMeadOptions,
}

impl ArimaModel {
    pub fn new(order: ArimaOrder) -> Self {
        Self {
            order,
            options: NelderMeadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: NelderMeadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn fit(&self, values: &[f64], budget: &FitBudget) -> Result<FittedArima> {
        let ArimaOrder { p, d, q } = self.order;
        let needed = self.order.min_observations();
        if values.len() < needed {
            return Err(ModelError::InsufficientData {
                needed,
                got: values.len(),
                what: self.order.to_string(),
            });
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite(format!("observation at index {i}")));
        }

        let mut tails = Vec::with_capacity(d);
        let mut w = values.to_vec();
        for _ in 0..d {
            tails.push(w[w.len() - 1]);
            w = difference(&w);
        }

        let with_mean = d == 0;
        let offset = usize::from(with_mean);
        let mean0 = if with_mean {
            w.iter().sum::<f64>() / w.len() as f64
        } else {
            0.0
        };
        let mut x0 = vec![0.0; offset + p + q];
        if with_mean {
            x0[0] = mean0;
        }

        let split = |x: &[f64]| -> (f64, Vec<f64>, Vec<f64>) {
            let mean = if with_mean { x[0] } else { 0.0 };
            (
                mean,
                x[offset..offset + p].to_vec(),
                x[offset + p..offset + p + q].to_vec(),
            )
        };

        let objective = |x: &[f64]| {
            let (mean, ar, ma) = split(x);
            if !is_stationary(&ar) || !is_invertible(&ma) {
                return f64::INFINITY;
            }
            let e = residuals(&w, mean, &ar, &ma);
            e[p..].iter().map(|r| r * r).sum()
        };

        let min = nelder_mead(objective, &x0, &self.options, budget)?;
        let (mean, ar, ma) = split(&min.x);
        if !min.value.is_finite() {
            return Err(ModelError::NonFinite("conditional sum of squares".into()));
        }

        let e = residuals(&w, mean, &ar, &ma);
        let effective = (w.len() - p).max(1);
        let sigma2 = min.value / effective as f64;
        debug!(
            order = %self.order,
            css = min.value,
            iterations = min.iterations,
            "ARIMA fit converged"
        );

        Ok(FittedArima {
            order: self.order,
            mean,
            ar,
            ma,
            sigma2,
            css: min.value,
            iterations: min.iterations,
            differenced: w,
            residuals: e,
            tails,
        })
    }
}

/// A fitted ARIMA model, ready to forecast.
#[derive(Debug, Clone)]
pub struct FittedArima {
    order: ArimaOrder,
    mean: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    sigma2: f64,
    css: f64,
    iterations: usize,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
    /// Last value of each differencing level, outermost first.
    tails: Vec<f64>,
}

impl FittedArima {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn ar(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma(&self) -> &[f64] {
        &self.ma
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn css(&self) -> f64 {
        self.css
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Point forecasts for the next `horizon` steps on the original scale.
    pub fn forecast(&self, horizon: usize) -> Result<Vec<f64>> {
        let mut w = self.differenced.clone();
        let mut e = self.residuals.clone();
        let mut out = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let t = w.len();
            let mut pred = self.mean;
            for (i, phi) in self.ar.iter().enumerate() {
                pred += phi * (w[t - 1 - i] - self.mean);
            }
            for (j, theta) in self.ma.iter().enumerate() {
                if let Some(idx) = t.checked_sub(j + 1) {
                    pred += theta * e[idx];
                }
            }
            w.push(pred);
            e.push(0.0);
            out.push(pred);
        }

        for &tail in self.tails.iter().rev() {
            let mut level = tail;
            for v in out.iter_mut() {
                level += *v;
                *v = level;
            }
        }

        if let Some(i) = out.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite(format!("forecast at step {}", i + 1)));
        }
        Ok(out)
    }
}

fn difference(x: &[f64]) -> Vec<f64> {
    x.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Conditional residuals; the first `ar.len()` are zero.
fn residuals(w: &[f64], mean: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut e = vec![0.0; w.len()];
    for t in p..w.len() {
        let mut pred = mean;
        for (i, phi) in ar.iter().enumerate() {
            pred += phi * (w[t - 1 - i] - mean);
        }
        for (j, theta) in ma.iter().enumerate() {
            if let Some(idx) = t.checked_sub(j + 1) {
                pred += theta * e[idx];
            }
        }
        e[t] = w[t] - pred;
    }
    e
}

/// Whether `1 - a₁z - … - aₖzᵏ` has all roots outside the unit circle,
/// by the Durbin–Levinson step-down recursion.
pub fn is_stationary(coefs: &[f64]) -> bool {
    let mut a = coefs.to_vec();
    while let Some(&r) = a.last() {
        if !r.is_finite() || r.abs() >= 1.0 {
            return false;
        }
        let k = a.len() - 1;
        let denom = 1.0 - r * r;
        a = (0..k).map(|i| (a[i] + r * a[k - 1 - i]) / denom).collect();
    }
    true
}

/// Whether `1 + θ₁z + … + θₖzᵏ` has all roots outside the unit circle.
pub fn is_invertible(coefs: &[f64]) -> bool {
    let negated: Vec<f64> = coefs.iter().map(|c| -c).collect();
    is_stationary(&negated)
}

//! Forecasting models.
//!
//! - [`arima`]: ARIMA(p,d,q) by conditional sum of squares, for point forecasts
//! - [`additive`]: piecewise-linear trend plus Fourier seasonality, for backtesting
//!
//! Both fits are bounded by a [`FitBudget`]; running out of time or iterations
//! is a [`ModelError`], never a silent fallback.

pub mod additive;
pub mod arima;
pub mod linalg;
pub mod optimize;

pub use additive::{AdditiveModel, AdditiveParams, AdditiveSummary, FittedAdditive};
pub use arima::{ArimaModel, ArimaOrder, FittedArima};

use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("{what} needs at least {needed} observations, got {got}")]
    InsufficientData {
        needed: usize,
        got: usize,
        what: String,
    },

    #[error("optimizer did not converge within {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("fit exceeded its time budget of {budget_secs:.1}s")]
    BudgetExceeded { budget_secs: f64 },

    #[error("normal equations are not positive definite (pivot {pivot})")]
    NotPositiveDefinite { pivot: usize },

    #[error("non-finite {0}")]
    NonFinite(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Wall-clock limit for one model fit.
#[derive(Debug, Clone, Copy)]
pub struct FitBudget {
    started: Instant,
    limit: Duration,
}

impl FitBudget {
    pub fn new(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    /// A budget that never runs out in practice.
    pub fn unlimited() -> Self {
        Self::new(Duration::from_secs(60 * 60 * 24 * 365))
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn check(&self) -> Result<()> {
        if self.started.elapsed() > self.limit {
            return Err(ModelError::BudgetExceeded {
                budget_secs: self.limit.as_secs_f64(),
            });
        }
        Ok(())
    }
}

//! Prior-scale grid search for the additive model.
//!
//! Every (changepoint, seasonality) combination is cross-validated with the
//! tuning windows and scored by the mean of its per-horizon MAPE. Cells run on
//! the rayon pool unless parallelism is switched off; either way the results
//! come back in grid order, so the winner does not depend on scheduling.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use pricecast_core::domain::{HistoricalSeries, HyperparamResult};
use pricecast_core::models::AdditiveParams;
use pricecast_core::PipelineError;

use crate::config::{CvWindows, TuningConfig};
use crate::cross_validation::{average_mape, cross_validate, performance_metrics};

type Result<T> = std::result::Result<T, PipelineError>;

/// Cartesian grid of prior scales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorGrid {
    pub changepoint_prior_scales: Vec<f64>,
    pub seasonality_prior_scales: Vec<f64>,
}

impl Default for PriorGrid {
    /// 4 × 4: `{0.001, 0.01, 0.1, 0.5}` × `{0.01, 0.1, 1.0, 10.0}`.
    fn default() -> Self {
        Self {
            changepoint_prior_scales: vec![0.001, 0.01, 0.1, 0.5],
            seasonality_prior_scales: vec![0.01, 0.1, 1.0, 10.0],
        }
    }
}

impl PriorGrid {
    pub fn new(changepoint: Vec<f64>, seasonality: Vec<f64>) -> Self {
        Self {
            changepoint_prior_scales: changepoint,
            seasonality_prior_scales: seasonality,
        }
    }

    pub fn size(&self) -> usize {
        self.changepoint_prior_scales.len() * self.seasonality_prior_scales.len()
    }

    /// Combinations in row-major order (changepoint outer).
    pub fn combinations(&self) -> Vec<(f64, f64)> {
        self.changepoint_prior_scales
            .iter()
            .flat_map(|&cp| self.seasonality_prior_scales.iter().map(move |&s| (cp, s)))
            .collect()
    }
}

/// Grid search driver.
#[derive(Debug, Clone)]
pub struct GridSearch {
    windows: CvWindows,
    budget: Duration,
    parallel: bool,
}

impl GridSearch {
    pub fn new(windows: CvWindows, budget: Duration) -> Self {
        Self {
            windows,
            budget,
            parallel: true,
        }
    }

    pub fn from_config(config: &TuningConfig, budget: Duration) -> Self {
        Self::new(config.windows, budget).with_parallelism(config.parallel)
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn evaluate(
        &self,
        dates: &[NaiveDate],
        values: &[f64],
        (cp, s): (f64, f64),
    ) -> Result<HyperparamResult> {
        let params = AdditiveParams::with_prior_scales(cp, s);
        let folds = cross_validate(dates, values, &params, &self.windows, self.budget)?;
        let avg_mape = average_mape(&performance_metrics(&folds));
        debug!(
            changepoint_prior_scale = cp,
            seasonality_prior_scale = s,
            avg_mape,
            "grid cell evaluated"
        );
        Ok(HyperparamResult {
            changepoint_prior_scale: cp,
            seasonality_prior_scale: s,
            avg_mape,
        })
    }

    pub fn search(&self, series: &HistoricalSeries, grid: &PriorGrid) -> Result<TuningOutcome> {
        self.search_with_progress(series, grid, |_, _, _| {})
    }

    /// Runs the search, invoking `progress_callback(index, total, result)`
    /// as each cell finishes. With parallelism on, calls arrive out of order.
    pub fn search_with_progress<F>(
        &self,
        series: &HistoricalSeries,
        grid: &PriorGrid,
        progress_callback: F,
    ) -> Result<TuningOutcome>
    where
        F: Fn(usize, usize, &HyperparamResult) + Send + Sync,
    {
        series.require_non_empty()?;
        let dates = series.calendar_dates()?;
        let values = series.values();
        let combos = grid.combinations();
        let total = combos.len();
        if total == 0 {
            return Err(PipelineError::ModelFitFailure(
                "hyperparameter grid is empty".into(),
            ));
        }

        let run = |(idx, combo): (usize, &(f64, f64))| -> Result<HyperparamResult> {
            let result = self.evaluate(&dates, &values, *combo)?;
            progress_callback(idx, total, &result);
            Ok(result)
        };
        let evaluated: Vec<HyperparamResult> = if self.parallel {
            combos.par_iter().enumerate().map(run).collect::<Result<Vec<_>>>()?
        } else {
            combos.iter().enumerate().map(run).collect::<Result<Vec<_>>>()?
        };

        let best = select_best(&evaluated).ok_or_else(|| {
            PipelineError::ModelFitFailure(format!(
                "none of the {total} prior-scale combinations produced a finite MAPE"
            ))
        })?;

        info!(
            ticker = %series.ticker(),
            cells = total,
            best_changepoint = best.changepoint_prior_scale,
            best_seasonality = best.seasonality_prior_scale,
            best_mape = best.avg_mape,
            "grid search complete"
        );
        Ok(TuningOutcome {
            best,
            evaluated,
            windows: self.windows,
        })
    }
}

/// Search `changepoint_grid` × `seasonality_grid` and return the best cell.
pub fn grid_search(
    series: &HistoricalSeries,
    changepoint_grid: &[f64],
    seasonality_grid: &[f64],
    windows: &CvWindows,
    budget: Duration,
) -> Result<HyperparamResult> {
    let grid = PriorGrid::new(changepoint_grid.to_vec(), seasonality_grid.to_vec());
    Ok(GridSearch::new(*windows, budget).search(series, &grid)?.best)
}

/// Lowest finite `avg_mape`; the first such cell wins ties.
pub fn select_best(evaluated: &[HyperparamResult]) -> Option<HyperparamResult> {
    let mut best: Option<HyperparamResult> = None;
    for r in evaluated.iter().filter(|r| r.avg_mape.is_finite()) {
        if best.map_or(true, |b| r.avg_mape < b.avg_mape) {
            best = Some(*r);
        }
    }
    best
}

/// Outcome of a grid search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningOutcome {
    pub best: HyperparamResult,
    /// All cells, in grid order.
    pub evaluated: Vec<HyperparamResult>,
    pub windows: CvWindows,
}

impl TuningOutcome {
    pub fn best_params(&self) -> (f64, f64) {
        (
            self.best.changepoint_prior_scale,
            self.best.seasonality_prior_scale,
        )
    }
}

//! One dashboard run: load → filter → ARIMA → backtest → tuning → report.
//!
//! The warehouse session is opened at the start and dropped on every exit
//! path, including early `?` returns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, info_span, warn};

use pricecast_core::data::Warehouse;
use pricecast_core::domain::Ticker;
use pricecast_core::PipelineError;

use crate::config::PricecastConfig;
use crate::cross_validation::backtest;
use crate::data_loader::{load_prices, open_session};
use crate::forecast::fit_and_forecast;
use crate::report::DashboardReport;
use crate::sweep::{GridSearch, PriorGrid};

/// Pipeline stage, reported to progress observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Loading,
    Filtering,
    Forecasting,
    Backtesting,
    Tuning { done: usize, total: usize },
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Loading => f.write_str("Loading prices"),
            Stage::Filtering => f.write_str("Filtering series"),
            Stage::Forecasting => f.write_str("Fitting ARIMA"),
            Stage::Backtesting => f.write_str("Cross-validating"),
            Stage::Tuning { done, total } => write!(f, "Tuning priors {done}/{total}"),
        }
    }
}

pub fn run_pipeline(
    config: &PricecastConfig,
    warehouse: &dyn Warehouse,
    ticker: &Ticker,
) -> Result<DashboardReport, PipelineError> {
    run_pipeline_with_progress(config, warehouse, ticker, |_| {})
}

/// Runs the pipeline, calling `on_stage` as each stage starts. Tuning
/// progress is reported from worker threads.
pub fn run_pipeline_with_progress<F>(
    config: &PricecastConfig,
    warehouse: &dyn Warehouse,
    ticker: &Ticker,
    on_stage: F,
) -> Result<DashboardReport, PipelineError>
where
    F: Fn(Stage) + Send + Sync,
{
    let _span = info_span!("pipeline", ticker = %ticker).entered();
    let budget = config.fit_budget();
    let retry = config.retry.policy();

    on_stage(Stage::Loading);
    let mut tickers = config.tickers.clone();
    if !tickers.contains(ticker) {
        warn!(ticker = %ticker, "ticker is not in the configured set, querying it anyway");
        tickers.push(ticker.clone());
    }
    let mut session = open_session(warehouse, &retry)?;
    let loaded = load_prices(&mut session, &tickers, &retry)?;
    session.close();

    on_stage(Stage::Filtering);
    let series = loaded.series(ticker, config.date_encoding)?;
    series.require_non_empty()?;

    on_stage(Stage::Forecasting);
    let forecast = fit_and_forecast(&series, config.arima.order(), config.arima.horizon, budget)?;

    on_stage(Stage::Backtesting);
    let backtest = backtest(&series, &config.backtest, budget)?;

    let grid = PriorGrid::new(
        config.tuning.changepoint_grid.clone(),
        config.tuning.seasonality_grid.clone(),
    );
    let total = grid.size();
    on_stage(Stage::Tuning { done: 0, total });
    let done = AtomicUsize::new(0);
    let tuning = GridSearch::from_config(&config.tuning, budget).search_with_progress(
        &series,
        &grid,
        |_, total, _| {
            let done = done.fetch_add(1, Ordering::SeqCst) + 1;
            on_stage(Stage::Tuning { done, total });
        },
    )?;

    info!(
        rows = series.len(),
        projected_change = forecast.projected_change,
        min_mape = backtest.min_mape,
        best_mape = tuning.best.avg_mape,
        "pipeline complete"
    );

    Ok(DashboardReport {
        ticker: ticker.clone(),
        backend: loaded.backend.clone(),
        dataset_hash: loaded.dataset_hash.clone(),
        history: series.records().to_vec(),
        forecast,
        backtest,
        tuning,
    })
}

//! PriceCast Runner — configuration, data loading and the forecasting pipeline.
//!
//! This crate builds on `pricecast-core` to provide:
//! - TOML configuration and warehouse selection
//! - Price loading with bounded retries
//! - ARIMA point forecasts
//! - Rolling-origin cross-validation of the additive model
//! - Prior-scale grid search (parallel via rayon)
//! - The dashboard report produced by one pipeline run

pub mod config;
pub mod cross_validation;
pub mod data_loader;
pub mod forecast;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod sweep;

pub use config::{
    ArimaConfig, ConfigError, CvWindows, PricecastConfig, RetryConfig, TuningConfig,
    WarehouseConfig, DEFAULT_CONFIG_FILE,
};
pub use cross_validation::{
    average_mape, backtest, create_folds, cross_validate, cutoffs, performance_metrics,
    BacktestOutcome, FoldSpec,
};
pub use data_loader::{load_prices, open_session, LoadedPrices, RetryPolicy};
pub use forecast::{fit_and_forecast, ArimaForecast};
pub use logging::{init_logging, LogTarget, LoggingConfig, LoggingError};
pub use pipeline::{run_pipeline, run_pipeline_with_progress, Stage};
pub use report::DashboardReport;
pub use sweep::{grid_search, select_best, GridSearch, PriorGrid, TuningOutcome};

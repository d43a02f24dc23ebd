//! Forecast and evaluation value types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One future point produced by the ARIMA pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub forecasted_price: f64,
}

/// One held-out observation from rolling-origin cross-validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CvFold {
    pub cutoff: NaiveDate,
    pub date: NaiveDate,
    /// Days between `cutoff` and `date`.
    pub horizon_days: i64,
    pub actual: f64,
    pub predicted: f64,
}

/// Mean absolute percentage error at one horizon offset, as a fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetric {
    pub horizon_days: i64,
    pub mape: f64,
}

/// Cross-validated score of one prior-scale combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HyperparamResult {
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub avg_mape: f64,
}

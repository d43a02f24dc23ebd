//! ARIMA price forecast for the selected ticker.

use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use pricecast_core::domain::{ForecastPoint, HistoricalSeries};
use pricecast_core::models::{ArimaModel, ArimaOrder, FitBudget};
use pricecast_core::PipelineError;

/// Forecast table plus the figures shown next to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArimaForecast {
    pub order: ArimaOrder,
    /// One point per day after the last observed date.
    pub points: Vec<ForecastPoint>,
    pub last_price: f64,
    /// Last forecast value minus last observed value.
    pub projected_change: f64,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub sigma2: f64,
    pub iterations: usize,
}

/// Fit `order` to the series and forecast `horizon` daily steps.
///
/// Forecast dates are consecutive calendar days starting the day after the
/// last observation, regardless of gaps in the history.
pub fn fit_and_forecast(
    series: &HistoricalSeries,
    order: ArimaOrder,
    horizon: usize,
    budget: Duration,
) -> Result<ArimaForecast, PipelineError> {
    series.require_non_empty()?;
    let last_date = series.last_calendar_date()?;
    let values = series.values();
    let last_price = values[values.len() - 1];

    let fitted = ArimaModel::new(order).fit(&values, &FitBudget::new(budget))?;
    let forecast = fitted.forecast(horizon)?;

    let points: Vec<ForecastPoint> = forecast
        .iter()
        .enumerate()
        .map(|(i, &price)| ForecastPoint {
            date: last_date + ChronoDuration::days(i as i64 + 1),
            forecasted_price: price,
        })
        .collect();
    let projected_change = points
        .last()
        .map(|p| p.forecasted_price - last_price)
        .unwrap_or(0.0);

    info!(
        ticker = %series.ticker(),
        %order,
        horizon,
        iterations = fitted.iterations(),
        projected_change,
        "arima forecast complete"
    );

    Ok(ArimaForecast {
        order,
        points,
        last_price,
        projected_change,
        ar: fitted.ar().to_vec(),
        ma: fitted.ma().to_vec(),
        sigma2: fitted.sigma2(),
        iterations: fitted.iterations(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pricecast_core::domain::{CalendarDate, PriceRecord, Ticker};
    use pricecast_core::ErrorKind;

    fn series(values: &[f64]) -> HistoricalSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let ticker = Ticker::new("AAPL").unwrap();
        let records = values
            .iter()
            .enumerate()
            .map(|(i, &v)| PriceRecord {
                ticker: ticker.clone(),
                date: CalendarDate::from_naive(start + ChronoDuration::days(i as i64)),
                average_last_price: v,
            })
            .collect();
        HistoricalSeries::new(ticker, records)
    }

    fn budget() -> Duration {
        Duration::from_secs(30)
    }

    #[test]
    fn constant_series_forecasts_flat() {
        let f = fit_and_forecast(&series(&[100.0; 40]), ArimaOrder::default(), 30, budget())
            .unwrap();
        assert_eq!(f.points.len(), 30);
        for p in &f.points {
            assert!((p.forecasted_price - 100.0).abs() < 1e-6, "{}", p.forecasted_price);
        }
        assert!(f.projected_change.abs() < 1e-6);
    }

    #[test]
    fn dates_follow_last_observation() {
        let values: Vec<f64> = (0..40).map(|i| 50.0 + i as f64 * 0.5).collect();
        let f = fit_and_forecast(&series(&values), ArimaOrder::default(), 30, budget()).unwrap();
        let last = NaiveDate::from_ymd_opt(2024, 2, 9).unwrap();
        assert_eq!(f.points[0].date, last + ChronoDuration::days(1));
        assert_eq!(f.points[29].date, last + ChronoDuration::days(30));
        assert!(f.points.windows(2).all(|w| w[1].date - w[0].date == ChronoDuration::days(1)));
        assert_eq!(f.last_price, 69.5);
    }

    #[test]
    fn empty_series_is_insufficient() {
        let err = fit_and_forecast(&series(&[]), ArimaOrder::default(), 30, budget()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn short_series_is_insufficient() {
        let err =
            fit_and_forecast(&series(&[1.0, 2.0, 3.0]), ArimaOrder::default(), 30, budget())
                .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn invalid_last_date_is_reported() {
        let mut s = series(&[100.0; 40]).records().to_vec();
        s[39].date = CalendarDate::new(2024, 2, 30);
        let s = HistoricalSeries::new(Ticker::new("AAPL").unwrap(), s);
        let err = fit_and_forecast(&s, ArimaOrder::default(), 30, budget()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDateEncoding);
    }
}

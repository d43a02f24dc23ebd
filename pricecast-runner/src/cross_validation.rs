//! Rolling-origin cross-validation of the additive model.
//!
//! Cutoffs start `initial` after the first observation and advance by
//! `period` while `cutoff + horizon` still lies within the history. For each
//! cutoff the model is fitted on rows dated `<= cutoff` and scored on rows in
//! `(cutoff, cutoff + horizon]`. MAPE is then aggregated per horizon offset.

use chrono::{Duration as ChronoDuration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use pricecast_core::domain::{CvFold, ErrorMetric, HistoricalSeries};
use pricecast_core::models::{AdditiveModel, AdditiveParams, AdditiveSummary, FitBudget};
use pricecast_core::PipelineError;

use crate::config::CvWindows;

/// Actuals closer to zero than this are left out of MAPE.
const MIN_ABS_ACTUAL: f64 = 1e-8;

// ─── Fold creation ───────────────────────────────────────────────────

/// One cutoff with its train and test row ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSpec {
    pub cutoff: NaiveDate,
    /// Train rows are `0..train_end`.
    pub train_end: usize,
    /// Test rows are `train_end..test_end`.
    pub test_end: usize,
}

impl FoldSpec {
    pub fn test_len(&self) -> usize {
        self.test_end - self.train_end
    }
}

fn days(n: i64) -> ChronoDuration {
    ChronoDuration::days(n)
}

/// Cutoff dates for a history spanning `start..=end`.
pub fn cutoffs(
    start: NaiveDate,
    end: NaiveDate,
    windows: &CvWindows,
) -> Result<Vec<NaiveDate>, PipelineError> {
    let initial = days(windows.initial.num_days());
    let period = days(windows.period.num_days());
    let horizon = days(windows.horizon.num_days());

    if end - start < initial + horizon {
        return Err(PipelineError::InsufficientData(format!(
            "history spans {} days, cross-validation needs {} initial + {} horizon",
            (end - start).num_days(),
            windows.initial.num_days(),
            windows.horizon.num_days()
        )));
    }

    let mut out = Vec::new();
    let mut cutoff = start + initial;
    while cutoff + horizon <= end {
        out.push(cutoff);
        cutoff += period;
    }
    Ok(out)
}

/// Split date-sorted rows into folds.
pub fn create_folds(
    dates: &[NaiveDate],
    windows: &CvWindows,
) -> Result<Vec<FoldSpec>, PipelineError> {
    let (Some(&start), Some(&end)) = (dates.first(), dates.last()) else {
        return Err(PipelineError::InsufficientData(
            "no observations to cross-validate".into(),
        ));
    };
    let horizon = days(windows.horizon.num_days());

    Ok(cutoffs(start, end, windows)?
        .into_iter()
        .map(|cutoff| FoldSpec {
            cutoff,
            train_end: dates.partition_point(|d| *d <= cutoff),
            test_end: dates.partition_point(|d| *d <= cutoff + horizon),
        })
        .collect())
}

// ─── Evaluation ──────────────────────────────────────────────────────

/// Fit one model per fold and collect every held-out prediction.
///
/// Each fit gets its own `budget`.
pub fn cross_validate(
    dates: &[NaiveDate],
    values: &[f64],
    params: &AdditiveParams,
    windows: &CvWindows,
    budget: Duration,
) -> Result<Vec<CvFold>, PipelineError> {
    let folds = create_folds(dates, windows)?;
    let model = AdditiveModel::new(*params);
    let mut out = Vec::new();

    for fold in &folds {
        if fold.test_len() == 0 {
            debug!(cutoff = %fold.cutoff, "no observations in fold horizon, skipping");
            continue;
        }
        let fitted = model.fit(
            &dates[..fold.train_end],
            &values[..fold.train_end],
            &FitBudget::new(budget),
        )?;
        let test_dates = &dates[fold.train_end..fold.test_end];
        let predicted = fitted.predict(test_dates);
        for ((&date, &actual), predicted) in test_dates
            .iter()
            .zip(&values[fold.train_end..fold.test_end])
            .zip(predicted)
        {
            if !predicted.is_finite() {
                return Err(PipelineError::ModelFitFailure(format!(
                    "non-finite prediction for {date} at cutoff {}",
                    fold.cutoff
                )));
            }
            out.push(CvFold {
                cutoff: fold.cutoff,
                date,
                horizon_days: (date - fold.cutoff).num_days(),
                actual,
                predicted,
            });
        }
    }

    if out.is_empty() {
        return Err(PipelineError::InsufficientData(
            "no observations fall inside any cross-validation horizon".into(),
        ));
    }
    debug!(cutoffs = folds.len(), rows = out.len(), "cross-validation complete");
    Ok(out)
}

/// Mean absolute percentage error per horizon offset, ascending by horizon.
///
/// Rows whose actual value is (near) zero are skipped; a horizon with no
/// usable rows is omitted.
pub fn performance_metrics(folds: &[CvFold]) -> Vec<ErrorMetric> {
    let mut acc: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for f in folds {
        if f.actual.abs() < MIN_ABS_ACTUAL {
            continue;
        }
        let e = acc.entry(f.horizon_days).or_insert((0.0, 0));
        e.0 += ((f.actual - f.predicted) / f.actual).abs();
        e.1 += 1;
    }
    acc.into_iter()
        .map(|(horizon_days, (sum, n))| ErrorMetric {
            horizon_days,
            mape: sum / n as f64,
        })
        .collect()
}

/// Mean of per-horizon MAPE values. NaN for an empty slice.
pub fn average_mape(metrics: &[ErrorMetric]) -> f64 {
    if metrics.is_empty() {
        return f64::NAN;
    }
    metrics.iter().map(|m| m.mape).sum::<f64>() / metrics.len() as f64
}

fn min_mape(metrics: &[ErrorMetric]) -> f64 {
    metrics.iter().map(|m| m.mape).fold(f64::NAN, f64::min)
}

// ─── Backtest panel ──────────────────────────────────────────────────

/// Everything the backtest panel shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutcome {
    /// Default-prior fit on the full history.
    pub full_fit: AdditiveSummary,
    /// MAPE of the full fit on its own training rows.
    pub in_sample_mape: f64,
    pub windows: CvWindows,
    pub cutoffs: usize,
    pub evaluated_rows: usize,
    pub metrics: Vec<ErrorMetric>,
    /// Lowest per-horizon MAPE, NaN if no horizon could be scored.
    pub min_mape: f64,
}

/// Fit the default additive model, then cross-validate it.
pub fn backtest(
    series: &HistoricalSeries,
    windows: &CvWindows,
    budget: Duration,
) -> Result<BacktestOutcome, PipelineError> {
    series.require_non_empty()?;
    let dates = series.calendar_dates()?;
    let values = series.values();
    let params = AdditiveParams::default();

    let fitted = AdditiveModel::new(params).fit(&dates, &values, &FitBudget::new(budget))?;
    let in_sample: Vec<CvFold> = dates
        .iter()
        .zip(&values)
        .zip(fitted.predict(&dates))
        .map(|((&date, &actual), predicted)| CvFold {
            cutoff: date,
            date,
            horizon_days: 0,
            actual,
            predicted,
        })
        .collect();
    let in_sample_mape = average_mape(&performance_metrics(&in_sample));

    let cutoffs = create_folds(&dates, windows)?.len();
    let folds = cross_validate(&dates, &values, &params, windows, budget)?;
    let metrics = performance_metrics(&folds);
    let min_mape = min_mape(&metrics);

    info!(
        ticker = %series.ticker(),
        cutoffs,
        rows = folds.len(),
        horizons = metrics.len(),
        min_mape,
        "backtest complete"
    );

    Ok(BacktestOutcome {
        full_fit: fitted.summary(),
        in_sample_mape,
        windows: *windows,
        cutoffs,
        evaluated_rows: folds.len(),
        metrics,
        min_mape,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricecast_core::domain::Window;
    use pricecast_core::ErrorKind;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn daily(n: usize) -> Vec<NaiveDate> {
        (0..n as i64).map(|i| d(2024, 1, 1) + days(i)).collect()
    }

    fn w(initial: i64, period: i64, horizon: i64) -> CvWindows {
        CvWindows::new(Window::days(initial), Window::days(period), Window::days(horizon))
    }

    #[test]
    fn cutoffs_step_by_period_until_horizon_fits() {
        // 100-day span, 30/20/9: cutoffs at +30, +50, +70, +90.
        let c = cutoffs(d(2024, 1, 1), d(2024, 1, 1) + days(100), &w(30, 20, 9)).unwrap();
        let offsets: Vec<i64> = c.iter().map(|x| (*x - d(2024, 1, 1)).num_days()).collect();
        assert_eq!(offsets, vec![30, 50, 70, 90]);
    }

    #[test]
    fn exact_span_yields_one_cutoff() {
        let c = cutoffs(d(2024, 1, 1), d(2024, 1, 1) + days(39), &w(30, 20, 9)).unwrap();
        assert_eq!(c, vec![d(2024, 1, 31)]);
    }

    #[test]
    fn short_span_is_insufficient() {
        let err = cutoffs(d(2024, 1, 1), d(2024, 1, 1) + days(38), &w(30, 20, 9)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn folds_split_at_cutoff() {
        let dates = daily(50);
        let folds = create_folds(&dates, &w(30, 20, 9)).unwrap();
        assert_eq!(folds.len(), 1);
        let f = folds[0];
        assert_eq!(f.cutoff, d(2024, 1, 31));
        assert_eq!(f.train_end, 31);
        assert_eq!(f.test_len(), 9);
        assert!(dates[..f.train_end].iter().all(|x| *x <= f.cutoff));
        assert!(dates[f.train_end..f.test_end].iter().all(|x| *x > f.cutoff));
    }

    #[test]
    fn metrics_group_by_horizon() {
        let cutoff = d(2024, 1, 1);
        let row = |h: i64, actual: f64, predicted: f64| CvFold {
            cutoff,
            date: cutoff + days(h),
            horizon_days: h,
            actual,
            predicted,
        };
        let folds = vec![
            row(2, 100.0, 110.0),
            row(1, 100.0, 90.0),
            row(1, 200.0, 200.0),
            row(3, 0.0, 5.0),
        ];
        let m = performance_metrics(&folds);
        assert_eq!(m.len(), 2);
        assert_eq!(m[0].horizon_days, 1);
        assert!((m[0].mape - 0.05).abs() < 1e-12);
        assert_eq!(m[1].horizon_days, 2);
        assert!((m[1].mape - 0.10).abs() < 1e-12);
        assert!((average_mape(&m) - 0.075).abs() < 1e-12);
        assert!((min_mape(&m) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn average_of_nothing_is_nan() {
        assert!(average_mape(&[]).is_nan());
    }

    #[test]
    fn linear_history_cross_validates_accurately() {
        let dates = daily(60);
        let values: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let folds = cross_validate(
            &dates,
            &values,
            &AdditiveParams::default(),
            &w(30, 10, 5),
            Duration::from_secs(30),
        )
        .unwrap();
        assert!(!folds.is_empty());
        assert!(folds.iter().all(|f| (1..=5).contains(&f.horizon_days)));
        let m = performance_metrics(&folds);
        assert!(average_mape(&m) < 0.05, "{m:?}");
    }

    #[test]
    fn horizon_gap_is_skipped() {
        // Observations stop after the first cutoff for 9 days, then resume.
        let mut dates = daily(31);
        dates.extend((41..50).map(|i| d(2024, 1, 1) + days(i)));
        let values: Vec<f64> = (0..dates.len()).map(|i| 50.0 + i as f64 * 0.1).collect();
        let err = cross_validate(
            &dates,
            &values,
            &AdditiveParams::default(),
            &w(30, 20, 9),
            Duration::from_secs(30),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }
}

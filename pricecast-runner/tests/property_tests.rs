//! Property tests for cross-validation and grid-search invariants.
//!
//! Uses proptest to verify:
//! 1. Cutoffs stay inside the history and step by `period`
//! 2. Per-horizon metrics are sorted and bounded by their rows
//! 3. Grid-search selection returns a literal cell with the lowest score
//! 4. ARIMA forecast dates run day by day from the day after the last observation

use chrono::{Duration, NaiveDate};
use pricecast_core::domain::{
    CalendarDate, CvFold, HistoricalSeries, HyperparamResult, PriceRecord, Ticker, Window,
};
use pricecast_core::models::ArimaOrder;
use pricecast_runner::{
    average_mape, cutoffs, fit_and_forecast, performance_metrics, select_best, CvWindows,
    PriorGrid,
};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_windows() -> impl Strategy<Value = CvWindows> {
    (1i64..60, 1i64..40, 1i64..20).prop_map(|(i, p, h)| {
        CvWindows::new(Window::days(i), Window::days(p), Window::days(h))
    })
}

fn arb_fold() -> impl Strategy<Value = CvFold> {
    (1i64..15, 1.0..500.0_f64, -0.5..0.5_f64).prop_map(|(h, actual, err)| {
        let cutoff = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        CvFold {
            cutoff,
            date: cutoff + Duration::days(h),
            horizon_days: h,
            actual,
            predicted: actual * (1.0 + err),
        }
    })
}

fn arb_grid() -> impl Strategy<Value = PriorGrid> {
    (
        prop::collection::vec(0.001..1.0_f64, 1..5),
        prop::collection::vec(0.01..10.0_f64, 1..5),
    )
        .prop_map(|(cp, s)| PriorGrid::new(cp, s))
}

/// Last observation dates, biased toward month, year and leap-day edges.
fn arb_last_date() -> impl Strategy<Value = NaiveDate> {
    let edges = prop::sample::select(vec![
        NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
        NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        NaiveDate::from_ymd_opt(2023, 2, 28).unwrap(),
        NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
    ]);
    let anywhere = (0i64..1500).prop_map(|d| NaiveDate::from_ymd_opt(2021, 1, 1).unwrap() + Duration::days(d));
    prop_oneof![edges, anywhere]
}

fn arb_series() -> impl Strategy<Value = HistoricalSeries> {
    (
        arb_last_date(),
        10.0..500.0_f64,
        prop::collection::vec(-0.03..0.03_f64, 6..80),
    )
        .prop_map(|(last, start, returns)| {
            let n = returns.len() as i64;
            let ticker = Ticker::new("AAPL").unwrap();
            let mut price = start;
            let records = returns
                .into_iter()
                .enumerate()
                .map(|(i, r)| {
                    price *= 1.0 + r;
                    PriceRecord {
                        ticker: ticker.clone(),
                        date: CalendarDate::from_naive(last - Duration::days(n - 1 - i as i64)),
                        average_last_price: price,
                    }
                })
                .collect();
            HistoricalSeries::new(ticker, records)
        })
}

// ── 1. Cutoffs ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn cutoffs_fit_inside_history(span in 0i64..400, windows in arb_windows()) {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let end = start + Duration::days(span);
        let initial = windows.initial.num_days();
        let period = windows.period.num_days();
        let horizon = windows.horizon.num_days();

        match cutoffs(start, end, &windows) {
            Ok(c) => {
                prop_assert!(span >= initial + horizon);
                prop_assert!(!c.is_empty());
                prop_assert_eq!(c[0], start + Duration::days(initial));
                for pair in c.windows(2) {
                    prop_assert_eq!((pair[1] - pair[0]).num_days(), period);
                }
                for cutoff in &c {
                    prop_assert!(*cutoff + Duration::days(horizon) <= end);
                }
                let next = c[c.len() - 1] + Duration::days(period);
                prop_assert!(next + Duration::days(horizon) > end);
            }
            Err(_) => prop_assert!(span < initial + horizon),
        }
    }
}

// ── 2. Metrics ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn metrics_sorted_by_horizon(folds in prop::collection::vec(arb_fold(), 1..60)) {
        let m = performance_metrics(&folds);
        prop_assert!(m.windows(2).all(|w| w[0].horizon_days < w[1].horizon_days));
        for metric in &m {
            prop_assert!(metric.mape >= 0.0 && metric.mape <= 0.5 + 1e-9);
            prop_assert!(folds.iter().any(|f| f.horizon_days == metric.horizon_days));
        }
        let avg = average_mape(&m);
        let lo = m.iter().map(|x| x.mape).fold(f64::INFINITY, f64::min);
        let hi = m.iter().map(|x| x.mape).fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(avg >= lo - 1e-12 && avg <= hi + 1e-12);
    }
}

// ── 3. Grid selection ────────────────────────────────────────────────

proptest! {
    #[test]
    fn best_cell_is_a_grid_value_with_lowest_mape(
        grid in arb_grid(),
        scores in prop::collection::vec(0.0..1.0_f64, 16),
    ) {
        let evaluated: Vec<HyperparamResult> = grid
            .combinations()
            .into_iter()
            .zip(scores.iter().cycle())
            .map(|((cp, s), &avg_mape)| HyperparamResult {
                changepoint_prior_scale: cp,
                seasonality_prior_scale: s,
                avg_mape,
            })
            .collect();
        prop_assert_eq!(evaluated.len(), grid.size());

        let best = select_best(&evaluated).unwrap();
        prop_assert!(grid.changepoint_prior_scales.contains(&best.changepoint_prior_scale));
        prop_assert!(grid.seasonality_prior_scales.contains(&best.seasonality_prior_scale));
        prop_assert!(evaluated.iter().all(|r| best.avg_mape <= r.avg_mape));

        let first = evaluated.iter().position(|r| r.avg_mape == best.avg_mape).unwrap();
        prop_assert_eq!(evaluated[first], best);
    }
}

// ── 4. ARIMA forecast dates ──────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn forecast_dates_step_one_day_past_history(series in arb_series(), horizon in 1usize..40) {
        let last = series.last_calendar_date().unwrap();
        let fc = fit_and_forecast(
            &series,
            ArimaOrder::default(),
            horizon,
            std::time::Duration::from_secs(60),
        )
        .unwrap();

        prop_assert_eq!(fc.points.len(), horizon);
        for (i, point) in fc.points.iter().enumerate() {
            prop_assert_eq!(point.date, last + Duration::days(i as i64 + 1));
            prop_assert!(point.forecasted_price.is_finite());
        }
    }
}

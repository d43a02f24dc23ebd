//! Dashboard report: the fully computed result of one pipeline run.
//!
//! A report only exists when every stage succeeded, so a renderer never has
//! to deal with partially filled sections.

use serde::{Deserialize, Serialize};

use pricecast_core::domain::{PriceRecord, Ticker};

use crate::cross_validation::BacktestOutcome;
use crate::forecast::ArimaForecast;
use crate::sweep::TuningOutcome;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub ticker: Ticker,
    /// Warehouse backend the rows came from.
    pub backend: String,
    pub dataset_hash: String,
    pub history: Vec<PriceRecord>,
    pub forecast: ArimaForecast,
    pub backtest: BacktestOutcome,
    pub tuning: TuningOutcome,
}

impl DashboardReport {
    pub fn projected_change(&self) -> f64 {
        self.forecast.projected_change
    }

    /// One-line summary, e.g. `"Projected change over 30 days: +1.25"`.
    pub fn projected_change_line(&self) -> String {
        format!(
            "Projected change over {} days: {:+.2}",
            self.forecast.points.len(),
            self.forecast.projected_change
        )
    }

    pub fn min_mape_line(&self) -> String {
        format!("Minimum MAPE: {:.2}%", self.backtest.min_mape * 100.0)
    }

    pub fn best_params_line(&self) -> String {
        let b = &self.tuning.best;
        format!(
            "Best hyperparameters: changepoint_prior_scale={}, seasonality_prior_scale={} (avg MAPE {:.2}%)",
            b.changepoint_prior_scale,
            b.seasonality_prior_scale,
            b.avg_mape * 100.0
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Markdown rendering. Only the last `history_rows` history rows are listed.
    pub fn to_markdown(&self, history_rows: usize) -> String {
        let mut out = format!(
            "# {} Price Forecast\n\n\
Backend: `{}`  \n\
Dataset: `{}`\n",
            self.ticker,
            self.backend,
            &self.dataset_hash[..self.dataset_hash.len().min(16)]
        );

        out.push_str(&format!(
            "\n## Historical Prices\n\n{} rows",
            self.history.len()
        ));
        let skip = self.history.len().saturating_sub(history_rows);
        if skip > 0 {
            out.push_str(&format!(" (last {history_rows} shown)"));
        }
        out.push_str("\n\n| Date | Average Last Price |\n|------|-------------------:|\n");
        for r in &self.history[skip..] {
            out.push_str(&format!("| {} | {:.2} |\n", r.date, r.average_last_price));
        }

        out.push_str(&format!("\n## {} Forecast\n\n", self.forecast.order));
        out.push_str("| Date | Forecasted Price |\n|------|-----------------:|\n");
        for p in &self.forecast.points {
            out.push_str(&format!("| {} | {:.2} |\n", p.date, p.forecasted_price));
        }
        out.push_str(&format!("\n{}\n", self.projected_change_line()));

        let bt = &self.backtest;
        out.push_str(&format!(
            "\n## Backtest\n\n\
Windows: initial {}, period {}, horizon {}  \n\
Cutoffs: {}, evaluated rows: {}  \n\
Full fit: {} changepoints, weekly {}, yearly {}, in-sample MAPE {:.2}%\n\n",
            bt.windows.initial,
            bt.windows.period,
            bt.windows.horizon,
            bt.cutoffs,
            bt.evaluated_rows,
            bt.full_fit.changepoints,
            yes_no(bt.full_fit.weekly),
            yes_no(bt.full_fit.yearly),
            bt.in_sample_mape * 100.0
        ));
        out.push_str("| Horizon (days) | MAPE |\n|---------------:|-----:|\n");
        for m in &bt.metrics {
            out.push_str(&format!("| {} | {:.2}% |\n", m.horizon_days, m.mape * 100.0));
        }
        out.push_str(&format!("\n{}\n", self.min_mape_line()));

        out.push_str("\n## Hyperparameter Tuning\n\n");
        out.push_str(&format!("{}\n", self.best_params_line()));

        out
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

//! Panel 4 — Backtest: MAPE by horizon from rolling-origin cross-validation.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, Paragraph};
use ratatui::Frame;

use pricecast_core::domain::ErrorMetric;
use pricecast_runner::DashboardReport;

use crate::theme;

/// `(horizon_days, mape %)` points.
pub fn mape_points(metrics: &[ErrorMetric]) -> Vec<(f64, f64)> {
    metrics
        .iter()
        .filter(|m| m.mape.is_finite())
        .map(|m| (m.horizon_days as f64, m.mape * 100.0))
        .collect()
}

pub fn render(f: &mut Frame, area: Rect, report: &DashboardReport) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(5)])
        .split(area);

    let bt = &report.backtest;
    let fit = &bt.full_fit;
    let lines = vec![
        Line::from(vec![
            Span::styled(report.min_mape_line(), theme::mape_style(bt.min_mape)),
            Span::styled(
                format!(
                    "   {} cutoffs, {} held-out rows",
                    bt.cutoffs, bt.evaluated_rows
                ),
                theme::muted(),
            ),
        ]),
        Line::from(Span::styled(
            format!(
                "Windows: initial {}, period {}, horizon {}",
                bt.windows.initial, bt.windows.period, bt.windows.horizon
            ),
            theme::muted(),
        )),
        Line::from(Span::styled(
            format!(
                "Full fit: {} obs, {} changepoints, weekly {}, yearly {}, slope {:+.3}/day, noise sd {:.3}",
                fit.observations,
                fit.changepoints,
                on_off(fit.weekly),
                on_off(fit.yearly),
                fit.base_slope_per_day,
                fit.noise_sd
            ),
            theme::secondary(),
        )),
        Line::from(Span::styled(
            format!("In-sample MAPE: {:.2}%", bt.in_sample_mape * 100.0),
            theme::mape_style(bt.in_sample_mape),
        )),
    ];
    f.render_widget(Paragraph::new(lines), chunks[0]);

    let points = mape_points(&bt.metrics);
    let x_max = points.last().map_or(1.0, |p| p.0.max(1.0));
    let y_max = points.iter().map(|p| p.1).fold(0.0_f64, f64::max).max(0.1) * 1.1;

    let dataset = Dataset::default()
        .name("MAPE %")
        .marker(symbols::Marker::Braille)
        .style(Style::default().fg(theme::ACCENT))
        .graph_type(GraphType::Line)
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .x_axis(
            Axis::default()
                .title(Span::styled("Horizon (days)", theme::muted()))
                .style(theme::muted())
                .bounds([0.0, x_max])
                .labels(vec![
                    Span::styled("0", theme::muted()),
                    Span::styled(format!("{x_max:.0}"), theme::muted()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title(Span::styled("MAPE %", theme::muted()))
                .style(theme::muted())
                .bounds([0.0, y_max])
                .labels(vec![
                    Span::styled("0", theme::muted()),
                    Span::styled(format!("{y_max:.1}"), theme::muted()),
                ]),
        );
    f.render_widget(chart, chunks[1]);
}

fn on_off(b: bool) -> &'static str {
    if b {
        "on"
    } else {
        "off"
    }
}

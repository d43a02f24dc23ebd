//! Panel 3 — Forecast: history/forecast overlay chart, forecast table and
//! projected change.

use chrono::NaiveDate;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Row, Table};
use ratatui::Frame;

use pricecast_core::domain::{ForecastPoint, PriceRecord};
use pricecast_runner::DashboardReport;

use crate::theme;
use crate::ui::clamp_scroll;

/// Chart coordinates: x is days since the first historical date.
pub struct OverlaySeries {
    pub origin: Option<NaiveDate>,
    pub history: Vec<(f64, f64)>,
    pub forecast: Vec<(f64, f64)>,
}

impl OverlaySeries {
    pub fn from_report(report: &DashboardReport) -> Self {
        Self::new(&report.history, &report.forecast.points)
    }

    /// Impossible historical dates are skipped rather than plotted.
    pub fn new(history: &[PriceRecord], forecast: &[ForecastPoint]) -> Self {
        let origin = history.iter().find_map(|r| r.date.to_naive());
        let x = |d: NaiveDate| origin.map_or(0.0, |o| (d - o).num_days() as f64);

        let history = history
            .iter()
            .filter_map(|r| r.date.to_naive().map(|d| (x(d), r.average_last_price)))
            .collect();
        let forecast = forecast
            .iter()
            .map(|p| (x(p.date), p.forecasted_price))
            .collect();
        Self {
            origin,
            history,
            forecast,
        }
    }

    /// `(x_min, x_max, y_min, y_max)` with 5% vertical padding.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let all = self.history.iter().chain(&self.forecast);
        let (mut x0, mut x1, mut y0, mut y1) =
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y) in all {
            x0 = x0.min(x);
            x1 = x1.max(x);
            y0 = y0.min(y);
            y1 = y1.max(y);
        }
        if !x0.is_finite() {
            return (0.0, 1.0, 0.0, 1.0);
        }
        let pad = ((y1 - y0).abs() * 0.05).max(0.5);
        (x0, x1.max(x0 + 1.0), y0 - pad, y1 + pad)
    }

    fn date_label(&self, x: f64) -> String {
        self.origin
            .map(|o| (o + chrono::Duration::days(x.round() as i64)).to_string())
            .unwrap_or_default()
    }
}

pub fn render(f: &mut Frame, area: Rect, report: &DashboardReport, scroll: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Length(2),
            Constraint::Min(3),
        ])
        .split(area);

    render_chart(f, chunks[0], report);

    let change = report.projected_change();
    let summary = Paragraph::new(vec![Line::from(vec![
        Span::styled(format!("{} ", report.forecast.order), theme::accent_bold()),
        Span::styled(report.projected_change_line(), theme::change_style(change)),
        Span::styled(
            format!("  (last price {:.2})", report.forecast.last_price),
            theme::muted(),
        ),
    ])]);
    f.render_widget(summary, chunks[1]);

    render_table(f, chunks[2], report, scroll);
}

fn render_chart(f: &mut Frame, area: Rect, report: &DashboardReport) {
    let series = OverlaySeries::from_report(report);
    let (x0, x1, y0, y1) = series.bounds();

    let datasets = vec![
        Dataset::default()
            .name("history")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(theme::ACCENT))
            .graph_type(GraphType::Line)
            .data(&series.history),
        Dataset::default()
            .name("forecast")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(theme::WARNING))
            .graph_type(GraphType::Line)
            .data(&series.forecast),
    ];

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .style(theme::muted())
                .bounds([x0, x1])
                .labels(vec![
                    Span::styled(series.date_label(x0), theme::muted()),
                    Span::styled(series.date_label(x1), theme::muted()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title(Span::styled("Price", theme::muted()))
                .style(theme::muted())
                .bounds([y0, y1])
                .labels(vec![
                    Span::styled(format!("{y0:.0}"), theme::muted()),
                    Span::styled(format!("{y1:.0}"), theme::muted()),
                ]),
        );
    f.render_widget(chart, area);
}

fn render_table(f: &mut Frame, area: Rect, report: &DashboardReport, scroll: usize) {
    let points = &report.forecast.points;
    let visible = area.height.saturating_sub(2) as usize;
    let start = clamp_scroll(scroll, points.len(), visible);
    let end = (start + visible).min(points.len());
    let last = report.forecast.last_price;

    let rows: Vec<Row> = points[start..end]
        .iter()
        .map(|p| {
            let delta = p.forecasted_price - last;
            Row::new(vec![
                Span::styled(p.date.to_string(), theme::secondary()),
                Span::styled(format!("{:>12.2}", p.forecasted_price), theme::warning()),
                Span::styled(format!("{delta:>+10.2}"), theme::change_style(delta)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(14),
            Constraint::Length(12),
        ],
    )
    .header(
        Row::new(vec!["Date", "Forecast", "vs Last"])
            .style(theme::accent_bold())
            .bottom_margin(1),
    );
    f.render_widget(table, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricecast_core::domain::{CalendarDate, Ticker};

    fn records() -> Vec<PriceRecord> {
        let ticker = Ticker::new("AAPL").unwrap();
        [(2024, 1, 1, 10.0), (2024, 1, 2, 12.0), (2024, 2, 30, 11.0)]
            .iter()
            .map(|&(y, m, d, p)| PriceRecord {
                ticker: ticker.clone(),
                date: CalendarDate::new(y, m, d),
                average_last_price: p,
            })
            .collect()
    }

    #[test]
    fn forecast_continues_after_history() {
        let forecast = vec![ForecastPoint {
            date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            forecasted_price: 13.0,
        }];
        let s = OverlaySeries::new(&records(), &forecast);
        assert_eq!(s.history, vec![(0.0, 10.0), (1.0, 12.0)]);
        assert_eq!(s.forecast, vec![(2.0, 13.0)]);
        let (x0, x1, y0, y1) = s.bounds();
        assert_eq!((x0, x1), (0.0, 2.0));
        assert!(y0 < 10.0 && y1 > 13.0);
        assert_eq!(s.date_label(2.0), "2024-01-03");
    }

    #[test]
    fn empty_bounds_are_unit() {
        let s = OverlaySeries::new(&[], &[]);
        assert_eq!(s.bounds(), (0.0, 1.0, 0.0, 1.0));
    }
}

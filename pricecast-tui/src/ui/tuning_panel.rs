//! Panel 5 — Tuning: best prior scales and the full grid.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Row, Table};
use ratatui::Frame;

use pricecast_runner::DashboardReport;

use crate::theme;
use crate::ui::clamp_scroll;

pub fn render(f: &mut Frame, area: Rect, report: &DashboardReport, scroll: usize) {
    let tuning = &report.tuning;
    let best = tuning.best;

    let header = Paragraph::new(vec![
        Line::from(Span::styled(report.best_params_line(), theme::accent_bold())),
        Line::from(Span::styled(
            format!(
                "{} combinations, windows: initial {}, period {}, horizon {}",
                tuning.evaluated.len(),
                tuning.windows.initial,
                tuning.windows.period,
                tuning.windows.horizon
            ),
            theme::muted(),
        )),
    ]);
    f.render_widget(header, Rect { height: area.height.min(2), ..area });

    let table_area = Rect {
        y: area.y + 3,
        height: area.height.saturating_sub(3),
        ..area
    };
    let visible = table_area.height.saturating_sub(2) as usize;
    let start = clamp_scroll(scroll, tuning.evaluated.len(), visible);
    let end = (start + visible).min(tuning.evaluated.len());

    let rows: Vec<Row> = tuning.evaluated[start..end]
        .iter()
        .map(|r| {
            let is_best = r == &best;
            let style = if is_best {
                theme::positive().add_modifier(Modifier::BOLD)
            } else {
                theme::secondary()
            };
            Row::new(vec![
                Span::styled(if is_best { "★" } else { " " }, style),
                Span::styled(format!("{:>10}", r.changepoint_prior_scale), style),
                Span::styled(format!("{:>10}", r.seasonality_prior_scale), style),
                Span::styled(
                    format!("{:>9.2}%", r.avg_mape * 100.0),
                    if is_best { style } else { theme::mape_style(r.avg_mape) },
                ),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(11),
        ],
    )
    .header(
        Row::new(vec!["", "changepoint", "seasonality", "avg MAPE"])
            .style(theme::accent_bold())
            .bottom_margin(1),
    );
    f.render_widget(table, table_area);
}

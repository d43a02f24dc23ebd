//! Panel 2 — History: the filtered price series as a table.

use ratatui::layout::{Constraint, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Row, Table};
use ratatui::Frame;

use pricecast_runner::DashboardReport;

use crate::theme;
use crate::ui::clamp_scroll;

pub fn render(f: &mut Frame, area: Rect, report: &DashboardReport, scroll: usize) {
    let rows = &report.history;
    let header_height = 3;
    let visible = area.height.saturating_sub(header_height) as usize;
    let start = clamp_scroll(scroll, rows.len(), visible);
    let end = (start + visible).min(rows.len());

    let summary = Paragraph::new(Line::from(vec![
        Span::styled(format!("{} ", report.ticker), theme::accent_bold()),
        Span::styled(
            format!(
                "{} rows from {} ({})  showing {}-{}  [j/k] scroll",
                rows.len(),
                report.backend,
                &report.dataset_hash[..report.dataset_hash.len().min(12)],
                start + 1,
                end
            ),
            theme::muted(),
        ),
    ]));
    f.render_widget(summary, Rect { height: area.height.min(1), ..area });

    let body: Vec<Row> = rows[start..end]
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let prev = (start + i)
                .checked_sub(1)
                .map(|j| rows[j].average_last_price);
            let change = prev.map(|p| r.average_last_price - p);
            Row::new(vec![
                Span::styled(r.date.to_string(), theme::secondary()),
                Span::styled(format!("{:>12.2}", r.average_last_price), theme::accent()),
                match change {
                    Some(c) => Span::styled(format!("{c:>+10.2}"), theme::change_style(c)),
                    None => Span::styled(format!("{:>10}", "-"), theme::muted()),
                },
            ])
        })
        .collect();

    let table = Table::new(
        body,
        [
            Constraint::Length(12),
            Constraint::Length(14),
            Constraint::Length(12),
        ],
    )
    .header(
        Row::new(vec!["Date", "Avg Last Price", "Change"])
            .style(theme::accent_bold())
            .bottom_margin(1),
    );

    let table_area = Rect {
        y: area.y + 1,
        height: area.height.saturating_sub(1),
        ..area
    };
    f.render_widget(table, table_area);
}

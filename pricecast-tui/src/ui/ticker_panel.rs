//! Panel 1 — Tickers: the fixed selector list.

use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::{AppState, View};
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            "[j/k] move  [Enter] run pipeline  [r] rerun",
            theme::muted(),
        )),
        Line::from(""),
    ];

    for (i, ticker) in app.tickers.iter().enumerate() {
        let is_cursor = i == app.cursor;
        let is_selected = app.selected.as_ref() == Some(ticker);

        let marker = if is_selected { "●" } else { " " };
        let style = if is_cursor {
            theme::accent().add_modifier(Modifier::REVERSED)
        } else if is_selected {
            theme::accent_bold()
        } else {
            theme::secondary()
        };

        let mut spans = vec![
            Span::styled(format!(" {marker} "), theme::accent()),
            Span::styled(format!("{:<8}", ticker.as_str()), style),
        ];
        if let Some(note) = status_note(app, ticker) {
            spans.push(note);
        }
        lines.push(Line::from(spans));
    }

    if let Some(queued) = &app.queued {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("{queued} will run when the current pipeline finishes"),
            theme::warning(),
        )));
    }

    f.render_widget(Paragraph::new(lines), area);
}

fn status_note<'a>(app: &AppState, ticker: &pricecast_core::domain::Ticker) -> Option<Span<'a>> {
    match &app.view {
        View::Loading { ticker: t, stage, .. } if t == ticker => Some(Span::styled(
            format!("  {} {stage}", super::spinner(app.tick)),
            theme::warning(),
        )),
        View::Ready(report) if &report.ticker == ticker => Some(Span::styled(
            format!("  {:+.2}", report.projected_change()),
            theme::change_style(report.projected_change()),
        )),
        View::Failed { ticker: t, error } if t == ticker => Some(Span::styled(
            format!("  {}", error.tag()),
            theme::error_style(error.kind()),
        )),
        _ => None,
    }
}

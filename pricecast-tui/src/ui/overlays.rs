//! Overlay widgets — welcome and error history.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::app::AppState;
use crate::theme;
use crate::ui::centered_rect;

/// First-run welcome overlay.
pub fn render_welcome(f: &mut Frame, area: Rect) {
    let popup = centered_rect(60, 40, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::accent())
        .title(" Welcome to PriceCast ")
        .title_style(theme::accent_bold());

    let text = vec![
        Line::from(""),
        Line::from(Span::styled("Getting started:", theme::accent_bold())),
        Line::from(""),
        Line::from(Span::styled(
            "  1. Pick a ticker in panel 1 with j/k and Enter",
            theme::muted(),
        )),
        Line::from(Span::styled(
            "  2. Press 3 for the 30-day ARIMA forecast",
            theme::muted(),
        )),
        Line::from(Span::styled(
            "  3. Press 4 and 5 for backtest error and tuned priors",
            theme::muted(),
        )),
        Line::from(""),
        Line::from(Span::styled("Press any key to dismiss...", theme::neutral())),
    ];

    let para = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(para, popup);
}

/// Error history overlay, newest first.
pub fn render_error_history(f: &mut Frame, area: Rect, app: &AppState) {
    let popup = centered_rect(80, 70, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::negative())
        .title(format!(
            " Error History ({}) [Esc]close [j/k]scroll ",
            app.error_history.len()
        ))
        .title_style(theme::negative());

    let inner = block.inner(popup);
    f.render_widget(block, popup);

    if app.error_history.is_empty() {
        let text = Paragraph::new(Span::styled("No errors recorded.", theme::muted()));
        f.render_widget(text, inner);
        return;
    }

    let visible_height = inner.height as usize;
    let start = app.error_scroll.min(app.error_history.len() - 1);

    let lines: Vec<Line> = app
        .error_history
        .iter()
        .enumerate()
        .skip(start)
        .take(visible_height)
        .map(|(i, rec)| {
            let style = if i == app.error_scroll {
                theme::error_style(rec.kind()).add_modifier(Modifier::BOLD)
            } else {
                theme::muted()
            };
            Line::from(vec![
                Span::styled(
                    format!("[{}] ", rec.timestamp.format("%H:%M:%S")),
                    theme::muted(),
                ),
                Span::styled(format!("[{}] ", rec.kind().tag()), theme::error_style(rec.kind())),
                Span::styled(format!("{:<6} ", rec.ticker), theme::accent()),
                Span::styled(rec.error.detail().to_string(), style),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines), inner);
}

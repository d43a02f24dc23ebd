//! Top-level UI layout — header, one active panel, status bar, overlays.

pub mod backtest_panel;
pub mod forecast_panel;
pub mod help_panel;
pub mod history_panel;
pub mod overlays;
pub mod status_bar;
pub mod ticker_panel;
pub mod tuning_panel;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use pricecast_runner::DashboardReport;

use crate::app::{AppState, Overlay, Panel, View};
use crate::theme;

const SPINNER: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

/// Draw the entire UI.
pub fn draw(f: &mut Frame, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, chunks[0], app);
    draw_panel(f, chunks[1], app);
    status_bar::render(f, chunks[2], app);

    match app.overlay {
        Overlay::Welcome => overlays::render_welcome(f, chunks[1]),
        Overlay::ErrorHistory => overlays::render_error_history(f, chunks[1], app),
        Overlay::None => {}
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &AppState) {
    let mut spans = vec![Span::styled(" PriceCast ", theme::accent_bold())];
    for panel in Panel::ALL {
        let style = if panel == app.active_panel {
            theme::accent_bold()
        } else {
            theme::muted()
        };
        spans.push(Span::styled(
            format!(" {}:{} ", panel.index() + 1, panel.label()),
            style,
        ));
    }
    if let Some(ticker) = &app.selected {
        spans.push(Span::styled(format!("│ {ticker} "), theme::accent()));
    }
    if let View::Loading { stage, .. } = &app.view {
        spans.push(Span::styled(
            format!("{} {stage}", spinner(app.tick)),
            theme::warning(),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Draw the active panel with its border.
fn draw_panel(f: &mut Frame, area: Rect, app: &AppState) {
    let panel = app.active_panel;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::panel_border(true))
        .title(format!(" {} [{}] ", panel.label(), panel.index() + 1))
        .title_style(theme::panel_title(true));

    let inner = block.inner(area);
    f.render_widget(block, area);

    match panel {
        Panel::Tickers => ticker_panel::render(f, inner, app),
        Panel::History => with_report(f, inner, app, |f, area, r| {
            history_panel::render(f, area, r, app.history_scroll)
        }),
        Panel::Forecast => with_report(f, inner, app, |f, area, r| {
            forecast_panel::render(f, area, r, app.forecast_scroll)
        }),
        Panel::Backtest => with_report(f, inner, app, backtest_panel::render),
        Panel::Tuning => with_report(f, inner, app, |f, area, r| {
            tuning_panel::render(f, area, r, app.tuning_scroll)
        }),
        Panel::Help => help_panel::render(f, inner),
    }
}

/// Render `body` only for a finished report; otherwise show the loading,
/// error or empty state in its place.
pub fn with_report<F>(f: &mut Frame, area: Rect, app: &AppState, body: F)
where
    F: FnOnce(&mut Frame, Rect, &DashboardReport),
{
    match &app.view {
        View::Ready(report) => body(f, area, report),
        View::Loading {
            ticker,
            stage,
            started,
        } => {
            let lines = vec![
                Line::from(""),
                Line::from(Span::styled(
                    format!("{} {stage} for {ticker}…", spinner(app.tick)),
                    theme::warning(),
                )),
                Line::from(Span::styled(
                    format!("{:.1}s elapsed", started.elapsed().as_secs_f64()),
                    theme::muted(),
                )),
            ];
            f.render_widget(Paragraph::new(lines), area);
        }
        View::Failed { error, .. } => {
            let lines = vec![
                Line::from(""),
                Line::from(Span::styled(error.to_string(), theme::error_style(error.kind()))),
                Line::from(""),
                Line::from(Span::styled(
                    "[r] retry  [e] error history  [1] pick another ticker",
                    theme::muted(),
                )),
            ];
            f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
        }
        View::Empty => {
            let lines = vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Pick a ticker in panel 1 and press Enter.",
                    theme::muted(),
                )),
            ];
            f.render_widget(Paragraph::new(lines), area);
        }
    }
}

pub fn spinner(tick: u64) -> &'static str {
    SPINNER[(tick as usize) % SPINNER.len()]
}

/// Clamp a scroll offset so the last page stays full.
pub fn clamp_scroll(offset: usize, rows: usize, visible: usize) -> usize {
    offset.min(rows.saturating_sub(visible))
}

/// Compute a centered rect for overlays.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

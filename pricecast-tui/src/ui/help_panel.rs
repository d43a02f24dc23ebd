//! Panel 6 — Help: keyboard shortcuts.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::theme;

pub fn render(f: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    section(&mut lines, "Global Navigation");
    key(&mut lines, "1-6", "Switch to panel by number");
    key(&mut lines, "Tab / Shift+Tab", "Cycle panels forward / back");
    key(&mut lines, "r", "Re-run the pipeline for the selected ticker");
    key(&mut lines, "e", "Open error history overlay");
    key(&mut lines, "q / Ctrl+C", "Quit");
    lines.push(Line::from(""));

    section(&mut lines, "Panel 1 — Tickers");
    key(&mut lines, "j / k", "Move cursor down / up");
    key(&mut lines, "Enter / Space", "Select ticker and run the pipeline");
    lines.push(Line::from(""));

    section(&mut lines, "Panels 2, 3, 5 — History, Forecast, Tuning");
    key(&mut lines, "j / k", "Scroll tables");
    lines.push(Line::from(""));

    section(&mut lines, "Pipeline");
    key(&mut lines, "History", "avg_last_price rows for the selected ticker");
    key(&mut lines, "Forecast", "ARIMA(2,1,2), 30 days past the last observation");
    key(&mut lines, "Backtest", "Additive model, rolling-origin MAPE by horizon");
    key(&mut lines, "Tuning", "4×4 changepoint/seasonality prior-scale grid");

    f.render_widget(Paragraph::new(lines), area);
}

fn section<'a>(lines: &mut Vec<Line<'a>>, title: &str) {
    lines.push(Line::from(Span::styled(title.to_string(), theme::accent_bold())));
}

fn key<'a>(lines: &mut Vec<Line<'a>>, keys: &str, desc: &str) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {:>20}  ", keys), theme::accent()),
        Span::styled(desc.to_string(), theme::muted()),
    ]));
}

//! Keyboard input dispatch — overlays → global keys → panel-specific handlers.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{AppState, Overlay, Panel};

pub fn handle_key(app: &mut AppState, key: KeyEvent) {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return;
    }

    // 1. Overlays consume input first.
    match app.overlay {
        Overlay::Welcome => {
            app.overlay = Overlay::None;
            return;
        }
        Overlay::ErrorHistory => {
            handle_error_overlay(app, key);
            return;
        }
        Overlay::None => {}
    }

    // 2. Global keys.
    match key.code {
        KeyCode::Char('q') => {
            app.running = false;
            return;
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.running = false;
            return;
        }
        KeyCode::Char(c @ '1'..='6') => {
            if let Some(panel) = c.to_digit(10).and_then(|d| Panel::from_index(d as usize - 1)) {
                app.active_panel = panel;
            }
            return;
        }
        KeyCode::Tab => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.active_panel = app.active_panel.prev();
            } else {
                app.active_panel = app.active_panel.next();
            }
            return;
        }
        KeyCode::BackTab => {
            app.active_panel = app.active_panel.prev();
            return;
        }
        KeyCode::Char('e') => {
            app.overlay = Overlay::ErrorHistory;
            app.error_scroll = 0;
            return;
        }
        KeyCode::Char('r') => {
            if let Some(ticker) = app.selected.clone() {
                app.select(ticker);
            }
            return;
        }
        _ => {}
    }

    // 3. Panel-specific keys.
    match app.active_panel {
        Panel::Tickers => handle_ticker_key(app, key),
        Panel::History => scroll(&mut app.history_scroll, key),
        Panel::Forecast => scroll(&mut app.forecast_scroll, key),
        Panel::Tuning => scroll(&mut app.tuning_scroll, key),
        Panel::Backtest | Panel::Help => {}
    }
}

fn handle_error_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('e') => {
            app.overlay = Overlay::None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.error_scroll + 1 < app.error_history.len() {
                app.error_scroll += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.error_scroll = app.error_scroll.saturating_sub(1);
        }
        _ => {}
    }
}

fn handle_ticker_key(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if app.cursor + 1 < app.tickers.len() {
                app.cursor += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            if let Some(ticker) = app.cursor_ticker().cloned() {
                app.select(ticker);
            }
        }
        _ => {}
    }
}

/// Row offsets are clamped when rendering, so only the lower bound matters here.
fn scroll(offset: &mut usize, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => *offset += 1,
        KeyCode::Char('k') | KeyCode::Up => *offset = offset.saturating_sub(1),
        KeyCode::PageDown => *offset += 10,
        KeyCode::PageUp => *offset = offset.saturating_sub(10),
        KeyCode::Char('g') | KeyCode::Home => *offset = 0,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{t, test_app};
    use crate::worker::WorkerCommand;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn number_keys_switch_panels() {
        let (mut app, _rx, _resp) = test_app();
        handle_key(&mut app, press(KeyCode::Char('3')));
        assert_eq!(app.active_panel, Panel::Forecast);
        handle_key(&mut app, press(KeyCode::Char('6')));
        assert_eq!(app.active_panel, Panel::Help);
        handle_key(&mut app, press(KeyCode::Tab));
        assert_eq!(app.active_panel, Panel::Tickers);
    }

    #[test]
    fn enter_selects_ticker_under_cursor() {
        let (mut app, rx, _resp) = test_app();
        handle_key(&mut app, press(KeyCode::Char('j')));
        handle_key(&mut app, press(KeyCode::Enter));
        assert_eq!(app.selected, Some(t("MSFT")));
        assert!(matches!(rx.try_recv(), Ok(WorkerCommand::Run { ticker }) if ticker == t("MSFT")));
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let (mut app, _rx, _resp) = test_app();
        for _ in 0..10 {
            handle_key(&mut app, press(KeyCode::Down));
        }
        assert_eq!(app.cursor, 2);
        for _ in 0..10 {
            handle_key(&mut app, press(KeyCode::Up));
        }
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn welcome_overlay_swallows_first_key() {
        let (mut app, _rx, _resp) = test_app();
        app.overlay = Overlay::Welcome;
        handle_key(&mut app, press(KeyCode::Char('q')));
        assert!(app.running);
        assert_eq!(app.overlay, Overlay::None);
        handle_key(&mut app, press(KeyCode::Char('q')));
        assert!(!app.running);
    }

    #[test]
    fn history_scrolls() {
        let (mut app, _rx, _resp) = test_app();
        app.active_panel = Panel::History;
        handle_key(&mut app, press(KeyCode::PageDown));
        handle_key(&mut app, press(KeyCode::Char('k')));
        assert_eq!(app.history_scroll, 9);
        handle_key(&mut app, press(KeyCode::Char('g')));
        assert_eq!(app.history_scroll, 0);
    }
}

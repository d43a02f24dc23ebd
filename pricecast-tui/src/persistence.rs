//! Dashboard state persistence — JSON save/load across restarts.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app::{AppState, Overlay, Panel};

/// Serializable subset of app state that persists across restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub last_ticker: Option<String>,
    pub active_panel: Panel,
    pub welcome_dismissed: bool,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            last_ticker: None,
            active_panel: Panel::Tickers,
            welcome_dismissed: false,
        }
    }
}

/// Load persisted state from disk. Returns defaults if file is missing or corrupt.
pub fn load(path: &Path) -> PersistedState {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
        Err(_) => PersistedState::default(),
    }
}

/// Save persisted state to disk. Creates parent directories if needed.
pub fn save(path: &Path, state: &PersistedState) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn extract(app: &AppState) -> PersistedState {
    PersistedState {
        last_ticker: app.selected.as_ref().map(|t| t.to_string()),
        active_panel: app.active_panel,
        welcome_dismissed: app.overlay != Overlay::Welcome,
    }
}

/// Apply persisted state. A remembered ticker that is no longer in the
/// selector is ignored.
pub fn apply(app: &mut AppState, state: PersistedState) {
    app.active_panel = state.active_panel;
    if !state.welcome_dismissed {
        app.overlay = Overlay::Welcome;
    }
    if let Some(ticker) = state.last_ticker.and_then(|s| s.parse().ok()) {
        app.focus_ticker(&ticker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{t, test_app};

    #[test]
    fn roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let state = PersistedState {
            last_ticker: Some("MSFT".into()),
            active_panel: Panel::Forecast,
            welcome_dismissed: true,
        };
        save(&path, &state).unwrap();
        assert_eq!(load(&path), state);
    }

    #[test]
    fn missing_file_returns_defaults() {
        let loaded = load(Path::new("/nonexistent/path/state.json"));
        assert_eq!(loaded, PersistedState::default());
    }

    #[test]
    fn corrupt_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not valid json {{{").unwrap();
        assert_eq!(load(&path), PersistedState::default());
    }

    #[test]
    fn apply_restores_cursor_and_panel() {
        let (mut app, _rx, _resp) = test_app();
        apply(
            &mut app,
            PersistedState {
                last_ticker: Some("TSLA".into()),
                active_panel: Panel::Backtest,
                welcome_dismissed: true,
            },
        );
        assert_eq!(app.cursor_ticker(), Some(&t("TSLA")));
        assert_eq!(app.active_panel, Panel::Backtest);
        assert_eq!(app.overlay, Overlay::None);
    }

    #[test]
    fn unknown_ticker_is_ignored() {
        let (mut app, _rx, _resp) = test_app();
        apply(
            &mut app,
            PersistedState {
                last_ticker: Some("ZZZZ".into()),
                ..PersistedState::default()
            },
        );
        assert_eq!(app.cursor, 0);
        assert_eq!(app.overlay, Overlay::Welcome);
    }

    #[test]
    fn extract_remembers_selection() {
        let (mut app, _rx, _resp) = test_app();
        app.select(t("MSFT"));
        let state = extract(&app);
        assert_eq!(state.last_ticker.as_deref(), Some("MSFT"));
    }
}
